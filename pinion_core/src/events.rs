//! Append-only audit events.
//!
//! Every worker writes one event on completion or failure. Events are
//! purely observational: orchestration logic never reads them back.

use anyhow::Result;
use async_trait::async_trait;
use minicbor::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[n(0)]
    Info,
    #[n(1)]
    Warning,
    #[n(2)]
    Error,
}

/// One immutable audit log row.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Event {
    #[n(0)]
    pub event_type: String,
    #[n(1)]
    pub severity: Severity,
    #[n(2)]
    pub message: String,
    #[n(3)]
    pub metadata: BTreeMap<String, String>,
    /// Unix seconds at which the event was produced.
    #[n(4)]
    pub at: u64,
}

impl Event {
    pub fn new(
        event_type: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        at: u64,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            severity,
            message: message.into(),
            metadata: BTreeMap::new(),
            at,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

/// Append-only event sink.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn append(&self, event: Event) -> Result<()>;
}

/// Appends best-effort: a failing sink is logged and otherwise ignored, so
/// audit plumbing can never fail a worker run.
pub async fn emit(sink: &dyn EventSink, event: Event) {
    let event_type = event.event_type.clone();
    if let Err(err) = sink.append(event).await {
        tracing::warn!("dropping audit event '{event_type}': {err}");
    }
}
