//! Transitions pending pins to accepted or rejected.

use super::record_error;
use anyhow::{Result, bail};
use pinion_core::events::emit;
use pinion_core::{
    Event, EventSink, PinQuery, PinRegistry, PinStatus, Severity, Validator, unix_now,
};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ValidationWorker {
    registry: Arc<dyn PinRegistry>,
    validator: Arc<dyn Validator>,
    events: Arc<dyn EventSink>,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub checked: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Registry write failures; the affected pins stay pending for the
    /// next run.
    pub failed: usize,
    pub errors: Vec<String>,
}

impl ValidationWorker {
    pub fn new(
        registry: Arc<dyn PinRegistry>,
        validator: Arc<dyn Validator>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry,
            validator,
            events,
        }
    }

    /// Pulls every pending pin, asks the validation source for one verdict
    /// per identifier, and applies each verdict. Validation is total over
    /// the batch: there is no "still pending" outcome for a processed
    /// entry, and a verdict count mismatch aborts the run before any pin
    /// is written.
    pub async fn run(&self) -> Result<ValidationReport> {
        let pending = self
            .registry
            .select(&PinQuery::default().with_status(PinStatus::Pending))
            .await?;
        let mut report = ValidationReport::default();
        if pending.is_empty() {
            // No connection to the validation source on an empty batch.
            self.emit_run_event(&report).await;
            return Ok(report);
        }

        let ids: Vec<_> = pending.iter().map(|pin| pin.id.clone()).collect();
        let verdicts = self.validator.validate_batch(&ids).await?;
        if verdicts.len() != ids.len() {
            bail!(
                "validation source returned {} verdicts for {} identifiers",
                verdicts.len(),
                ids.len()
            );
        }

        for (mut pin, valid) in pending.into_iter().zip(verdicts) {
            report.checked += 1;
            if valid {
                pin.mark_accepted("validated against authorization source");
            } else {
                pin.mark_rejected("not present in authorization source");
            }
            let id = pin.id.clone();
            match self.registry.update(pin).await {
                Ok(()) => {
                    if valid {
                        report.accepted += 1;
                    } else {
                        report.rejected += 1;
                    }
                }
                Err(err) => {
                    report.failed += 1;
                    warn!("validation write failed for {id}: {err}");
                    record_error(&mut report.errors, format!("{id}: {err}"));
                }
            }
        }

        debug!(
            checked = report.checked,
            accepted = report.accepted,
            rejected = report.rejected,
            "validation run finished"
        );
        self.emit_run_event(&report).await;
        Ok(report)
    }

    async fn emit_run_event(&self, report: &ValidationReport) {
        emit(
            self.events.as_ref(),
            Event::new(
                "validation.run",
                Severity::Info,
                "validation run finished",
                unix_now(),
            )
            .with("checked", report.checked)
            .with("accepted", report.accepted)
            .with("rejected", report.rejected)
            .with("failed", report.failed),
        )
        .await;
    }
}
