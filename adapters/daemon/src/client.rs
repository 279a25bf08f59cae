use crate::{DaemonApiConfig, Error};
use async_trait::async_trait;
use pinion_core::ContentId;
use pinion_core::daemon::{PinRemoval, RepoGcResult, RepoStat, StorageNode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

/// Marker the daemon puts in pin-removal error bodies when the identifier
/// has no pin.
const NOT_PINNED_MARKER: &str = "not pinned";

/// Client for the storage daemon's `/api/v0` control plane.
///
/// Every operation is one bounded request; callers own all retry policy.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    version_url: String,
    pin_add_url: String,
    pin_rm_url: String,
    pin_ls_url: String,
    object_stat_url: String,
    repo_stat_url: String,
    repo_gc_url: String,
    http: reqwest::Client,
}

impl DaemonClient {
    pub fn create(config: DaemonApiConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let api = config.api_url.trim_end_matches('/').to_owned();
        Ok(Self {
            version_url: format!("{api}/api/v0/version"),
            pin_add_url: format!("{api}/api/v0/pin/add"),
            pin_rm_url: format!("{api}/api/v0/pin/rm"),
            pin_ls_url: format!("{api}/api/v0/pin/ls"),
            object_stat_url: format!("{api}/api/v0/object/stat"),
            repo_stat_url: format!("{api}/api/v0/repo/stat"),
            repo_gc_url: format!("{api}/api/v0/repo/gc"),
            http,
        })
    }

    async fn post(&self, url: String) -> Result<(u16, String), Error> {
        let res = self.http.post(&url).send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        Ok((status, body))
    }

    async fn post_ok(&self, url: String) -> Result<String, Error> {
        let (status, body) = self.post(url).await?;
        if !(200..300).contains(&status) {
            return Err(Error::HttpFailWithBody(status, body));
        }
        Ok(body)
    }
}

#[async_trait]
impl StorageNode for DaemonClient {
    async fn is_running(&self) -> anyhow::Result<bool> {
        match self.post(self.version_url.clone()).await {
            Ok((status, _)) => Ok((200..300).contains(&status)),
            Err(err) => {
                log::debug!("storage daemon unreachable: {err}");
                Ok(false)
            }
        }
    }

    async fn pin_add(&self, id: &ContentId) -> anyhow::Result<()> {
        self.post_ok(format!("{}?arg={}", self.pin_add_url, id))
            .await?;
        Ok(())
    }

    async fn pin_remove(&self, id: &ContentId) -> anyhow::Result<PinRemoval> {
        let (status, body) = self.post(format!("{}?arg={}", self.pin_rm_url, id)).await?;
        if (200..300).contains(&status) {
            return Ok(PinRemoval::Removed);
        }
        if body.contains(NOT_PINNED_MARKER) {
            return Ok(PinRemoval::NotPinned);
        }
        Err(Error::HttpFailWithBody(status, body).into())
    }

    async fn list_pins(&self) -> anyhow::Result<Vec<ContentId>> {
        let body = self
            .post_ok(format!("{}?type=recursive", self.pin_ls_url))
            .await?;
        let response: PinLsResponse = serde_json::from_str(&body).map_err(Error::SerdeJson)?;
        let mut ids = Vec::with_capacity(response.keys.len());
        for key in response.keys.into_keys() {
            ids.push(ContentId::from_str(&key).map_err(Error::InvalidId)?);
        }
        Ok(ids)
    }

    async fn stat_object_size(&self, id: &ContentId) -> anyhow::Result<u64> {
        let body = self
            .post_ok(format!("{}?arg={}", self.object_stat_url, id))
            .await?;
        let stat: ObjectStatResponse = serde_json::from_str(&body).map_err(Error::SerdeJson)?;
        Ok(stat.cumulative_size)
    }

    async fn repo_stat(&self) -> anyhow::Result<RepoStat> {
        let body = self.post_ok(self.repo_stat_url.clone()).await?;
        let stat: RepoStatResponse = serde_json::from_str(&body).map_err(Error::SerdeJson)?;
        Ok(RepoStat {
            used_bytes: stat.repo_size,
            capacity_bytes: stat.storage_max,
        })
    }

    async fn repo_gc(&self) -> anyhow::Result<RepoGcResult> {
        let body = self.post_ok(self.repo_gc_url.clone()).await?;
        Ok(parse_gc_output(&body))
    }
}

/// The GC endpoint streams one JSON object per line: removed keys plus
/// per-object errors. Undecodable lines and per-object errors are logged
/// and skipped; they never fail the sweep.
fn parse_gc_output(body: &str) -> RepoGcResult {
    let mut removed_objects = 0u64;
    for line in body.lines().filter(|line| !line.trim().is_empty()) {
        match serde_json::from_str::<GcLine>(line) {
            Ok(GcLine { key: Some(_), .. }) => removed_objects += 1,
            Ok(GcLine {
                error: Some(error), ..
            }) => log::warn!("repo gc skipped an object: {error}"),
            Ok(_) => {}
            Err(err) => log::warn!("unreadable repo gc output line: {err}"),
        }
    }
    RepoGcResult { removed_objects }
}

// Models

#[derive(Deserialize)]
struct PinLsResponse {
    #[serde(rename = "Keys", default)]
    keys: BTreeMap<String, PinLsEntry>,
}

#[derive(Deserialize)]
struct PinLsEntry {
    #[serde(rename = "Type")]
    #[allow(dead_code)]
    pin_type: Option<String>,
}

#[derive(Deserialize)]
struct ObjectStatResponse {
    #[serde(rename = "CumulativeSize")]
    cumulative_size: u64,
}

#[derive(Deserialize)]
struct RepoStatResponse {
    #[serde(rename = "RepoSize")]
    repo_size: u64,
    #[serde(rename = "StorageMax")]
    storage_max: u64,
}

#[derive(Deserialize)]
struct GcLine {
    #[serde(rename = "Key")]
    key: Option<GcKey>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

#[derive(Deserialize)]
struct GcKey {
    #[serde(rename = "/")]
    #[allow(dead_code)]
    cid: String,
}
