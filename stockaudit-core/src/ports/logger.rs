// stockaudit-core/src/ports/logger.rs

// Structured sink for validation lifecycle events. The engine emits,
// adapters decide storage and formatting (see infrastructure::logging).

use std::time::Duration;
use uuid::Uuid;

use crate::domain::integrity::{IntegrityStatus, IssueCategory, RepairStatus, Severity};
use crate::domain::market::EntityKind;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationEvent {
    ValidationStarted,
    DetectorStarted {
        category: IssueCategory,
    },
    IssueDetected {
        category: IssueCategory,
        severity: Severity,
        entity: EntityKind,
        entity_id: Uuid,
        details: String,
    },
    DetectorFinished {
        category: IssueCategory,
        issues: usize,
        elapsed: Duration,
    },
    ValidationFinished {
        status: IntegrityStatus,
        total_issues: usize,
        elapsed: Duration,
    },
    RepairPlanned {
        dry_run: bool,
        actions: usize,
        unrepairable: usize,
    },
    RepairAttempt {
        action: &'static str,
        rating_id: Uuid,
        attempt: u32,
    },
    RepairSucceeded {
        action: &'static str,
        rating_id: Uuid,
        retries: u32,
    },
    RepairFailed {
        action: &'static str,
        rating_id: Uuid,
        retries: u32,
        error: String,
    },
    RepairFinished {
        status: RepairStatus,
        total_repairs: usize,
        unrepairable: usize,
        dry_run: bool,
    },
}

pub trait ValidationLogger: Send + Sync {
    fn log(&self, event: ValidationEvent);
}
