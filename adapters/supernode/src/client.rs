use crate::{Error, PinLookup, SupernodeApiConfig, SupernodeTimeouts, pin_timeout};
use async_trait::async_trait;
use pinion_core::ContentId;
use pinion_core::supernode::ReplicationTarget;
use std::time::Duration;

/// Client for the replication target's control API.
#[derive(Debug, Clone)]
pub struct SupernodeClient {
    pin_add_url: String,
    pin_ls_url: String,
    timeouts: SupernodeTimeouts,
    http: reqwest::Client,
}

impl SupernodeClient {
    pub fn create(config: SupernodeApiConfig) -> Result<Self, Error> {
        // No client-wide timeout: pin calls get a per-request, size-scaled
        // one and verify calls use the base timeout.
        let http = reqwest::Client::builder().build()?;
        let api = config.api_url.trim_end_matches('/').to_owned();
        Ok(Self {
            pin_add_url: format!("{api}/api/v0/pin/add"),
            pin_ls_url: format!("{api}/api/v0/pin/ls"),
            timeouts: config.timeouts,
            http,
        })
    }
}

#[async_trait]
impl ReplicationTarget for SupernodeClient {
    async fn pin(&self, id: &ContentId, size_hint_bytes: Option<u64>) -> anyhow::Result<()> {
        let timeout = pin_timeout(size_hint_bytes, &self.timeouts);
        let res = self
            .http
            .post(format!("{}?arg={}", self.pin_add_url, id))
            .timeout(timeout)
            .send()
            .await
            .map_err(Error::Http)?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(Error::HttpFailWithBody(status, body).into());
        }
        Ok(())
    }

    async fn verify(&self, id: &ContentId) -> anyhow::Result<bool> {
        let timeout = Duration::from_secs(self.timeouts.base_secs);
        let res = match self
            .http
            .post(format!("{}?arg={}", self.pin_ls_url, id))
            .timeout(timeout)
            .send()
            .await
        {
            Ok(res) => res,
            Err(err) => {
                // Unreachable target: presence cannot be confirmed, so the
                // pin counts as absent and migration will try again.
                log::warn!("pin lookup for {id} failed: {err}");
                return Ok(false);
            }
        };
        let status = res.status().as_u16();
        let body = match res.text().await {
            Ok(body) => body,
            Err(err) => {
                log::warn!("pin lookup for {id}: unreadable body: {err}");
                return Ok(false);
            }
        };
        Ok(PinLookup::classify(status, &body).is_pinned(id))
    }
}
