// stockaudit-core/src/application/service.rs

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::detectors::DetectorSuite;
use super::repair::RepairEngine;
use super::repositories::Repositories;
use crate::domain::integrity::{IntegrityReport, RepairReport, ReportAggregator, ValidationConfig};
use crate::error::AuditError;
use crate::ports::logger::{ValidationEvent, ValidationLogger};

/// Entry point of the engine. Holds its collaborators and nothing mutable:
/// every call reads the repositories afresh.
pub struct IntegrityValidationService {
    config: Arc<ValidationConfig>,
    logger: Arc<dyn ValidationLogger>,
    suite: DetectorSuite,
    repair: RepairEngine,
}

impl IntegrityValidationService {
    /// Fails if `config` does not pass validation.
    pub fn new(
        repos: Repositories,
        logger: Arc<dyn ValidationLogger>,
        config: ValidationConfig,
    ) -> Result<Self, AuditError> {
        let config = Arc::new(config.validated()?);
        Ok(Self {
            suite: DetectorSuite::new(repos.clone(), config.clone(), logger.clone()),
            repair: RepairEngine::new(repos, config.clone(), logger.clone()),
            config,
            logger,
        })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Runs the four detectors concurrently and merges their reports.
    /// All-or-nothing: on error, cancellation or timeout no report is returned.
    #[instrument(skip_all)]
    pub async fn validate_full_integrity(
        &self,
        ctx: &CancellationToken,
    ) -> Result<IntegrityReport, AuditError> {
        let started = Instant::now();
        self.logger.log(ValidationEvent::ValidationStarted);

        let outcome = self.suite.run_all(ctx).await?;
        let report = ReportAggregator::aggregate(
            outcome.orphan,
            outcome.consistency,
            outcome.duplicate,
            outcome.business,
            &self.config,
            started.elapsed(),
        );

        self.logger.log(ValidationEvent::ValidationFinished {
            status: report.overall_status,
            total_issues: report.total_issues,
            elapsed: report.duration,
        });
        info!(
            status = %report.overall_status,
            total = report.total_issues,
            critical = report.critical_issues,
            "Integrity validation complete"
        );
        Ok(report)
    }

    /// Delegates to the repair engine. Re-validation afterwards is up to the caller.
    pub async fn repair_minor_issues(
        &self,
        ctx: &CancellationToken,
        dry_run: bool,
    ) -> Result<RepairReport, AuditError> {
        self.repair.repair_minor_issues(ctx, dry_run).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::domain::integrity::{IntegrityStatus, RepairStatus, Severity};
    use crate::domain::market::{Company, StockRating};
    use crate::infrastructure::adapters::memory::InMemoryStore;
    use crate::test_support::{RecordingLogger, seeded_store};
    use chrono::{Duration as ChronoDuration, Utc};
    use uuid::Uuid;

    fn service(store: Arc<InMemoryStore>, config: ValidationConfig) -> IntegrityValidationService {
        IntegrityValidationService::new(
            Repositories::from_store(store),
            Arc::new(RecordingLogger::default()),
            config,
        )
        .unwrap()
    }

    fn rating(company: Uuid, brokerage: Uuid) -> StockRating {
        StockRating::new(
            company,
            brokerage,
            "upgraded by",
            "Hold",
            "Buy",
            Utc::now() - ChronoDuration::hours(3),
        )
    }

    #[tokio::test]
    async fn test_clean_store_is_good() -> anyhow::Result<()> {
        let (store, company, brokerage) = seeded_store();
        store.insert_rating(rating(company.id, brokerage.id));

        let report = service(store, ValidationConfig::default())
            .validate_full_integrity(&CancellationToken::new())
            .await?;
        assert_eq!(report.total_issues, 0);
        assert_eq!(report.overall_status, IntegrityStatus::Good);
        Ok(())
    }

    #[tokio::test]
    async fn test_report_totals_add_up() -> anyhow::Result<()> {
        let (store, company, brokerage) = seeded_store();
        store.insert_rating(rating(Uuid::new_v4(), brokerage.id));
        store.insert_company(Company::new("aapl", ""));
        let mut future = rating(company.id, brokerage.id);
        future.time = Utc::now() + ChronoDuration::days(3);
        store.insert_rating(future);

        let report = service(store, ValidationConfig::default())
            .validate_full_integrity(&CancellationToken::new())
            .await?;

        assert_eq!(
            report.total_issues,
            report.critical_issues + report.warning_issues
        );
        assert_eq!(report.total_issues, report.category_totals().iter().sum::<usize>());
        assert!(report.total_issues > 0);
        assert_ne!(report.overall_status, IntegrityStatus::Good);
        assert!(!report.recommendations().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_validation_is_idempotent() -> anyhow::Result<()> {
        let (store, _, brokerage) = seeded_store();
        store.insert_rating(rating(Uuid::new_v4(), brokerage.id));
        store.insert_company(Company::new("aapl", "Apple again"));
        let svc = service(store, ValidationConfig::default());

        let first = svc.validate_full_integrity(&CancellationToken::new()).await?;
        let second = svc.validate_full_integrity(&CancellationToken::new()).await?;
        assert_eq!(first.category_totals(), second.category_totals());
        assert_eq!(first.overall_status, second.overall_status);
        Ok(())
    }

    #[tokio::test]
    async fn test_dry_run_leaves_validation_unchanged() -> anyhow::Result<()> {
        let (store, company, brokerage) = seeded_store();
        store.insert_rating(rating(Uuid::new_v4(), brokerage.id));
        let mut sloppy = rating(company.id, brokerage.id);
        sloppy.rating_to = "buy".into();
        store.insert_rating(sloppy);
        let svc = service(store, ValidationConfig::default());
        let ctx = CancellationToken::new();

        let before = svc.validate_full_integrity(&ctx).await?;
        let repair = svc.repair_minor_issues(&ctx, true).await?;
        let after = svc.validate_full_integrity(&ctx).await?;

        assert!(repair.total_repairs > 0);
        assert_eq!(before.category_totals(), after.category_totals());
        Ok(())
    }

    #[tokio::test]
    async fn test_orphan_repair_converges() -> anyhow::Result<()> {
        let (store, _, brokerage) = seeded_store();
        let orphan = rating(Uuid::new_v4(), brokerage.id);
        let orphan_id = orphan.id;
        store.insert_rating(orphan);
        let svc = service(store.clone(), ValidationConfig::default());
        let ctx = CancellationToken::new();

        let before = svc.validate_full_integrity(&ctx).await?;
        assert!(before.orphan_report.contains_rating(orphan_id));

        let repair = svc.repair_minor_issues(&ctx, false).await?;
        assert_eq!(repair.repaired_orphans, 1);
        assert_eq!(repair.status, RepairStatus::Success);
        assert!(store.rating(orphan_id).is_none());

        let after = svc.validate_full_integrity(&ctx).await?;
        assert!(!after.orphan_report.contains_rating(orphan_id));
        assert_eq!(after.overall_status, IntegrityStatus::Good);
        Ok(())
    }

    #[tokio::test]
    async fn test_single_violation_critical_when_threshold_is_one() -> anyhow::Result<()> {
        let (store, _, _) = seeded_store();
        store.insert_company(Company::new("MSFT", ""));
        let config = ValidationConfig::builder()
            .company_violations_for_critical(1)
            .build()?;

        let report = service(store, config)
            .validate_full_integrity(&CancellationToken::new())
            .await?;
        assert_eq!(report.business_report.total_violations, 1);
        assert_eq!(report.business_report.violations[0].severity, Severity::Critical);
        assert_eq!(report.overall_status, IntegrityStatus::Critical);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_name_stays_unrepairable() -> anyhow::Result<()> {
        let (store, _, _) = seeded_store();
        store.insert_company(Company::new("MSFT", ""));
        let svc = service(store, ValidationConfig::default());
        let ctx = CancellationToken::new();

        let repair = svc.repair_minor_issues(&ctx, false).await?;
        assert_eq!(repair.unrepairable_of_type("business_rule").count(), 1);

        // never auto-fixed: a second validation still sees it
        let after = svc.validate_full_integrity(&ctx).await?;
        assert_eq!(after.business_report.total_violations, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_validation_returns_no_report() {
        let (store, _, _) = seeded_store();
        let ctx = CancellationToken::new();
        ctx.cancel();

        let res = service(store, ValidationConfig::default())
            .validate_full_integrity(&ctx)
            .await;
        assert!(matches!(res, Err(AuditError::Cancelled)));
    }

    #[tokio::test]
    async fn test_logger_sees_start_and_finish() -> anyhow::Result<()> {
        let (store, _, _) = seeded_store();
        let logger = Arc::new(RecordingLogger::default());
        let svc = IntegrityValidationService::new(
            Repositories::from_store(store),
            logger.clone(),
            ValidationConfig::default(),
        )?;
        svc.validate_full_integrity(&CancellationToken::new()).await?;

        let events = logger.events();
        assert_eq!(events.first(), Some(&ValidationEvent::ValidationStarted));
        assert!(matches!(
            events.last(),
            Some(ValidationEvent::ValidationFinished {
                status: IntegrityStatus::Good,
                total_issues: 0,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let (store, _, _) = seeded_store();
        let mut config = ValidationConfig::default();
        config.duplicates.bucket_hours = 0;

        let res = IntegrityValidationService::new(
            Repositories::from_store(store),
            Arc::new(RecordingLogger::default()),
            config,
        );
        assert!(matches!(
            res,
            Err(AuditError::Domain(DomainError::InvalidConfig(_)))
        ));
    }
}
