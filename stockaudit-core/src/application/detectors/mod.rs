// stockaudit-core/src/application/detectors/mod.rs
//
// The four read-only detectors. Each one owns its report; the suite runs
// them concurrently and only hands the results over once all have finished.

pub mod business;
pub mod consistency;
pub mod duplicate;
pub mod orphan;

pub use business::BusinessRuleValidator;
pub use consistency::ConsistencyChecker;
pub use duplicate::DuplicateDetector;
pub use orphan::OrphanDetector;

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::repositories::Repositories;
use crate::domain::integrity::{
    BusinessReport, ConsistencyReport, DuplicateReport, IssueCategory, OrphanReport, Severity,
    ValidationConfig,
};
use crate::domain::market::EntityKind;
use crate::error::AuditError;
use crate::ports::logger::{ValidationEvent, ValidationLogger};

/// Raw output of one detection pass, before aggregation.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub orphan: OrphanReport,
    pub consistency: ConsistencyReport,
    pub duplicate: DuplicateReport,
    pub business: BusinessReport,
}

pub struct DetectorSuite {
    orphan: OrphanDetector,
    consistency: ConsistencyChecker,
    duplicate: DuplicateDetector,
    business: BusinessRuleValidator,
    timeout: Duration,
}

impl DetectorSuite {
    pub fn new(
        repos: Repositories,
        config: Arc<ValidationConfig>,
        logger: Arc<dyn ValidationLogger>,
    ) -> Self {
        Self {
            orphan: OrphanDetector::new(repos.clone(), config.clone(), logger.clone()),
            consistency: ConsistencyChecker::new(repos.clone(), config.clone(), logger.clone()),
            duplicate: DuplicateDetector::new(repos.clone(), config.clone(), logger.clone()),
            business: BusinessRuleValidator::new(repos, config.clone(), logger),
            timeout: Duration::from_secs(config.execution.timeout_secs),
        }
    }

    /// Runs the four detectors concurrently. All-or-nothing: the first
    /// storage error, a cancellation or the timeout aborts the whole pass.
    #[instrument(skip_all)]
    pub async fn run_all(&self, ctx: &CancellationToken) -> Result<DetectionOutcome, AuditError> {
        ensure_active(ctx)?;

        let joined = async {
            tokio::try_join!(
                self.orphan.detect_orphans(ctx),
                self.consistency.detect_inconsistencies(ctx),
                self.duplicate.detect_duplicates(ctx),
                self.business.detect_violations(ctx),
            )
        };

        let (orphan, consistency, duplicate, business) = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(AuditError::Cancelled),
            res = tokio::time::timeout(self.timeout, joined) => match res {
                Ok(reports) => reports?,
                Err(_) => return Err(AuditError::Timeout(self.timeout)),
            },
        };

        debug!(
            orphans = orphan.total_orphans,
            inconsistencies = consistency.total_inconsistencies,
            duplicates = duplicate.total_duplicates,
            violations = business.total_violations,
            "Detection pass complete"
        );

        Ok(DetectionOutcome {
            orphan,
            consistency,
            duplicate,
            business,
        })
    }
}

pub(crate) fn ensure_active(ctx: &CancellationToken) -> Result<(), AuditError> {
    if ctx.is_cancelled() {
        Err(AuditError::Cancelled)
    } else {
        Ok(())
    }
}

/// Start/finish bookkeeping shared by every detector.
pub(crate) struct DetectorRun<'a> {
    logger: &'a dyn ValidationLogger,
    category: IssueCategory,
    started: Instant,
}

impl<'a> DetectorRun<'a> {
    pub(crate) fn start(logger: &'a dyn ValidationLogger, category: IssueCategory) -> Self {
        logger.log(ValidationEvent::DetectorStarted { category });
        Self {
            logger,
            category,
            started: Instant::now(),
        }
    }

    pub(crate) fn issue(&self, issue: IssueEvent) {
        self.logger.log(ValidationEvent::IssueDetected {
            category: self.category,
            severity: issue.severity,
            entity: issue.entity,
            entity_id: issue.entity_id,
            details: issue.details,
        });
    }

    pub(crate) fn finish(self, issues: usize) {
        self.logger.log(ValidationEvent::DetectorFinished {
            category: self.category,
            issues,
            elapsed: self.started.elapsed(),
        });
    }
}

pub(crate) struct IssueEvent {
    pub severity: Severity,
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub details: String,
}
