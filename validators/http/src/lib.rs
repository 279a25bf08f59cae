//! Delegated remote validation.
//!
//! Nodes without direct access to the authorization database post their
//! pending identifiers to a validation endpoint, which answers with one
//! verdict per identifier. The response order is not trusted: verdicts are
//! re-aligned to the request order by identifier, and identifiers the
//! endpoint omits count as invalid.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use pinion_core::{ContentId, Validator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Batch validator delegating to a remote endpoint.
#[derive(Debug, Clone)]
pub struct HttpValidator {
    endpoint: String,
    timeout: Duration,
}

impl HttpValidator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Validator for HttpValidator {
    async fn validate_batch(&self, ids: &[ContentId]) -> Result<Vec<bool>> {
        // A fresh client per batch keeps connection lifetime scoped to the
        // run, mirroring the direct-database validator.
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("building validation client")?;

        let request = ValidateRequest {
            identifiers: ids.iter().map(ContentId::as_str).collect(),
        };
        let res = client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("validation request failed")?;
        if !res.status().is_success() {
            bail!("validation endpoint returned HTTP {}", res.status().as_u16());
        }
        let verdicts: Vec<Verdict> = res
            .json()
            .await
            .context("unreadable validation response")?;

        let by_id: HashMap<&str, bool> = verdicts
            .iter()
            .map(|v| (v.identifier.as_str(), v.valid))
            .collect();
        Ok(ids
            .iter()
            .map(|id| by_id.get(id.as_str()).copied().unwrap_or(false))
            .collect())
    }
}

#[derive(Serialize)]
struct ValidateRequest<'a> {
    identifiers: Vec<&'a str>,
}

#[derive(Deserialize)]
struct Verdict {
    identifier: String,
    valid: bool,
}
