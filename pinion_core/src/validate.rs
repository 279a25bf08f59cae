//! The batch authorization seam.

use crate::ContentId;
use anyhow::Result;
use async_trait::async_trait;

/// Authorization source deciding which pins are legitimate.
///
/// Both the direct-database and the delegated-HTTP implementations satisfy
/// the same contract: one verdict per identifier, in input order, total
/// over the batch. Connection setup and teardown are scoped to a single
/// `validate_batch` call.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate_batch(&self, ids: &[ContentId]) -> Result<Vec<bool>>;
}
