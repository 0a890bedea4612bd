// stockaudit-core/src/infrastructure/logging.rs

use tracing::{debug, error, info, warn};

use crate::domain::integrity::{IntegrityStatus, RepairStatus};
use crate::ports::logger::{ValidationEvent, ValidationLogger};

/// Default logger adapter: every event becomes a structured `tracing` event.
/// Per-issue and per-attempt events go to DEBUG, summaries to INFO.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ValidationLogger for TracingLogger {
    fn log(&self, event: ValidationEvent) {
        match event {
            ValidationEvent::ValidationStarted => info!("Integrity validation started"),
            ValidationEvent::DetectorStarted { category } => {
                debug!(category = %category, "Detector started")
            }
            ValidationEvent::IssueDetected {
                category,
                severity,
                entity,
                entity_id,
                details,
            } => debug!(
                category = %category,
                severity = %severity,
                entity = %entity,
                entity_id = %entity_id,
                "{}",
                details
            ),
            ValidationEvent::DetectorFinished {
                category,
                issues,
                elapsed,
            } => info!(
                category = %category,
                issues,
                elapsed_ms = elapsed.as_millis() as u64,
                "Detector finished"
            ),
            ValidationEvent::ValidationFinished {
                status,
                total_issues,
                elapsed,
            } => {
                let elapsed_ms = elapsed.as_millis() as u64;
                match status {
                    IntegrityStatus::Critical => error!(
                        status = %status,
                        total_issues,
                        elapsed_ms,
                        "Integrity validation finished"
                    ),
                    IntegrityStatus::Warning => warn!(
                        status = %status,
                        total_issues,
                        elapsed_ms,
                        "Integrity validation finished"
                    ),
                    IntegrityStatus::Good => info!(
                        status = %status,
                        total_issues,
                        elapsed_ms,
                        "Integrity validation finished"
                    ),
                }
            }
            ValidationEvent::RepairPlanned {
                dry_run,
                actions,
                unrepairable,
            } => info!(dry_run, actions, unrepairable, "Repair planned"),
            ValidationEvent::RepairAttempt {
                action,
                rating_id,
                attempt,
            } => debug!(action, rating_id = %rating_id, attempt, "Repair attempt"),
            ValidationEvent::RepairSucceeded {
                action,
                rating_id,
                retries,
            } => debug!(action, rating_id = %rating_id, retries, "Repair succeeded"),
            ValidationEvent::RepairFailed {
                action,
                rating_id,
                retries,
                error,
            } => warn!(
                action,
                rating_id = %rating_id,
                retries,
                error = %error,
                "Repair failed"
            ),
            ValidationEvent::RepairFinished {
                status,
                total_repairs,
                unrepairable,
                dry_run,
            } => {
                if status == RepairStatus::Partial {
                    warn!(?status, total_repairs, unrepairable, dry_run, "Repair finished");
                } else {
                    info!(?status, total_repairs, unrepairable, dry_run, "Repair finished");
                }
            }
        }
    }
}
