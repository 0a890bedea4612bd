// stockaudit-core/src/application/repair.rs
//
// Repairs only what is mechanically safe: orphaned ratings, exact rating
// duplicates and normalizable rating fields. Everything else is reported
// back as unrepairable. Company and brokerage rows are never written.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::detectors::{DetectionOutcome, DetectorSuite, ensure_active};
use super::repositories::Repositories;
use crate::domain::integrity::{
    DuplicateGroup, FieldFix, RepairReport, RepairStatus, UnrepairableIssue, ValidationConfig,
};
use crate::domain::market::{EntityKind, StockRating};
use crate::error::AuditError;
use crate::ports::logger::{ValidationEvent, ValidationLogger};
use crate::ports::repository::RepositoryError;

// Unrepairable issue types
pub const BUSINESS_RULE: &str = "business_rule";
pub const AMBIGUOUS_DUPLICATE: &str = "ambiguous_duplicate";
pub const ENTITY_DUPLICATE: &str = "entity_duplicate";
pub const INCONSISTENCY: &str = "inconsistency";
pub const REPAIR_FAILED: &str = "repair_failed";

#[derive(Debug, Clone, PartialEq)]
enum RepairAction {
    DeleteOrphan(Uuid),
    DeleteDuplicate(Uuid),
    /// Full replacement row with every fix applied, and how many fixes that is.
    Normalize { rating: StockRating, fixes: usize },
}

impl RepairAction {
    fn label(&self) -> &'static str {
        match self {
            Self::DeleteOrphan(_) => "delete_orphan",
            Self::DeleteDuplicate(_) => "delete_duplicate",
            Self::Normalize { .. } => "normalize",
        }
    }

    fn rating_id(&self) -> Uuid {
        match self {
            Self::DeleteOrphan(id) | Self::DeleteDuplicate(id) => *id,
            Self::Normalize { rating, .. } => rating.id,
        }
    }
}

#[derive(Debug, Default)]
struct RepairPlan {
    actions: Vec<RepairAction>,
    unrepairable: Vec<UnrepairableIssue>,
}

impl RepairPlan {
    fn build(outcome: &DetectionOutcome, ratings: &BTreeMap<Uuid, StockRating>) -> Self {
        let mut plan = Self::default();
        let mut doomed: BTreeSet<Uuid> = BTreeSet::new();

        // 1. Orphans
        for id in outcome.orphan.orphan_rating_ids() {
            doomed.insert(id);
            plan.actions.push(RepairAction::DeleteOrphan(id));
        }

        // 2. Duplicates
        for group in &outcome.duplicate.groups {
            match group.entity {
                EntityKind::StockRating if group.exact => {
                    for id in surplus_members(group, ratings) {
                        if doomed.insert(id) {
                            plan.actions.push(RepairAction::DeleteDuplicate(id));
                        }
                    }
                }
                EntityKind::StockRating => plan.unrepairable.push(UnrepairableIssue {
                    issue_type: AMBIGUOUS_DUPLICATE.to_string(),
                    description: format!(
                        "{} stock ratings share key '{}' with differing payloads: {}",
                        group.count,
                        group.key,
                        join_ids(&group.member_ids)
                    ),
                }),
                entity => plan.unrepairable.push(UnrepairableIssue {
                    issue_type: ENTITY_DUPLICATE.to_string(),
                    description: format!(
                        "{} {} records share business key '{}', merge them manually: {}",
                        group.count,
                        entity,
                        group.key,
                        join_ids(&group.member_ids)
                    ),
                }),
            }
        }

        // 3. Inconsistencies: one update per surviving rating
        let mut fixes: BTreeMap<Uuid, Vec<&FieldFix>> = BTreeMap::new();
        for issue in &outcome.consistency.inconsistencies {
            if issue.entity == EntityKind::StockRating && doomed.contains(&issue.entity_id) {
                continue;
            }
            match (&issue.fix, issue.is_normalizable()) {
                (Some(fix), true) => fixes.entry(issue.entity_id).or_default().push(fix),
                _ => plan.unrepairable.push(UnrepairableIssue {
                    issue_type: INCONSISTENCY.to_string(),
                    description: format!(
                        "{} {} field '{}': expected {}, found '{}'",
                        issue.entity, issue.entity_id, issue.field, issue.expected, issue.actual
                    ),
                }),
            }
        }
        for (id, rating_fixes) in fixes {
            // gone since detection: nothing left to normalize
            let Some(original) = ratings.get(&id) else {
                continue;
            };
            let mut rating = original.clone();
            for fix in &rating_fixes {
                fix.apply(&mut rating);
            }
            plan.actions.push(RepairAction::Normalize {
                rating,
                fixes: rating_fixes.len(),
            });
        }

        // 4. Business rules are never repaired
        for v in &outcome.business.violations {
            if v.entity == EntityKind::StockRating && doomed.contains(&v.entity_id) {
                continue;
            }
            plan.unrepairable.push(UnrepairableIssue {
                issue_type: BUSINESS_RULE.to_string(),
                description: format!(
                    "{} {} violates {}: {}",
                    v.entity, v.entity_id, v.rule, v.details
                ),
            });
        }

        plan
    }
}

/// Members of an exact group to delete: all but the earliest created
/// (ties broken by the smallest id).
fn surplus_members(group: &DuplicateGroup, ratings: &BTreeMap<Uuid, StockRating>) -> Vec<Uuid> {
    let mut present: Vec<&StockRating> = group
        .member_ids
        .iter()
        .filter_map(|id| ratings.get(id))
        .collect();
    present.sort_by_key(|r| (r.created_at, r.id));
    present.iter().skip(1).map(|r| r.id).collect()
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

enum AttemptOutcome {
    Done { retries: u32 },
    Failed { error: RepositoryError, retries: u32 },
}

pub struct RepairEngine {
    repos: Repositories,
    config: Arc<ValidationConfig>,
    logger: Arc<dyn ValidationLogger>,
    suite: DetectorSuite,
}

impl RepairEngine {
    pub fn new(
        repos: Repositories,
        config: Arc<ValidationConfig>,
        logger: Arc<dyn ValidationLogger>,
    ) -> Self {
        let suite = DetectorSuite::new(repos.clone(), config.clone(), logger.clone());
        Self {
            repos,
            config,
            logger,
            suite,
        }
    }

    /// Detects, plans and applies (or, with `dry_run`, only counts) the safe
    /// repairs. Repairs run one at a time; a failed repair is recorded as
    /// unrepairable and the batch goes on.
    #[instrument(skip(self, ctx))]
    pub async fn repair_minor_issues(
        &self,
        ctx: &CancellationToken,
        dry_run: bool,
    ) -> Result<RepairReport, AuditError> {
        let started = Instant::now();

        // 1. Detecting
        let outcome = self.suite.run_all(ctx).await?;
        let ratings: BTreeMap<Uuid, StockRating> = self
            .repos
            .ratings
            .list()
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        let plan = RepairPlan::build(&outcome, &ratings);
        self.logger.log(ValidationEvent::RepairPlanned {
            dry_run,
            actions: plan.actions.len(),
            unrepairable: plan.unrepairable.len(),
        });

        let mut report = RepairReport {
            dry_run,
            unrepairable_issues: plan.unrepairable,
            ..RepairReport::default()
        };

        if plan.actions.is_empty() && report.unrepairable_issues.is_empty() {
            info!(dry_run, "Nothing to repair");
            report.status = RepairStatus::NothingToRepair;
            report.duration = started.elapsed();
            self.finish(&report);
            return Ok(report);
        }

        // 2. Repairing
        for action in &plan.actions {
            ensure_active(ctx)?;

            let attempt = if dry_run {
                AttemptOutcome::Done { retries: 0 }
            } else {
                self.apply_with_retry(ctx, action).await?
            };

            match attempt {
                AttemptOutcome::Done { .. } => match action {
                    RepairAction::DeleteOrphan(_) => report.repaired_orphans += 1,
                    RepairAction::DeleteDuplicate(_) => report.removed_duplicates += 1,
                    RepairAction::Normalize { fixes, .. } => {
                        report.fixed_inconsistencies += fixes
                    }
                },
                AttemptOutcome::Failed { error, retries } => {
                    report.unrepairable_issues.push(UnrepairableIssue {
                        issue_type: REPAIR_FAILED.to_string(),
                        description: format!(
                            "{} on stock rating {} failed after {} retries: {}",
                            action.label(),
                            action.rating_id(),
                            retries,
                            error
                        ),
                    });
                }
            }
        }

        // 3. Done
        report.total_repairs =
            report.repaired_orphans + report.removed_duplicates + report.fixed_inconsistencies;
        report.status = if report.unrepairable_issues.is_empty() {
            RepairStatus::Success
        } else {
            RepairStatus::Partial
        };
        report.duration = started.elapsed();
        self.finish(&report);
        Ok(report)
    }

    fn finish(&self, report: &RepairReport) {
        self.logger.log(ValidationEvent::RepairFinished {
            status: report.status,
            total_repairs: report.total_repairs,
            unrepairable: report.unrepairable_issues.len(),
            dry_run: report.dry_run,
        });
    }

    /// Transient conflicts are retried with a linear backoff; anything else
    /// fails the action at once. A row already gone counts as deleted.
    async fn apply_with_retry(
        &self,
        ctx: &CancellationToken,
        action: &RepairAction,
    ) -> Result<AttemptOutcome, AuditError> {
        let max_retries = self.config.execution.max_retries;
        let backoff = Duration::from_millis(self.config.execution.retry_backoff_ms);
        let rating_id = action.rating_id();
        let mut retries = 0u32;

        loop {
            self.logger.log(ValidationEvent::RepairAttempt {
                action: action.label(),
                rating_id,
                attempt: retries + 1,
            });

            let res = match action {
                RepairAction::DeleteOrphan(id) | RepairAction::DeleteDuplicate(id) => {
                    match self.repos.ratings.delete(*id).await {
                        Err(RepositoryError::NotFound { .. }) => Ok(()),
                        other => other,
                    }
                }
                RepairAction::Normalize { rating, .. } => self.repos.ratings.update(rating).await,
            };

            match res {
                Ok(()) => {
                    self.logger.log(ValidationEvent::RepairSucceeded {
                        action: action.label(),
                        rating_id,
                        retries,
                    });
                    return Ok(AttemptOutcome::Done { retries });
                }
                Err(e) if e.is_transient() && retries < max_retries => {
                    retries += 1;
                    warn!(
                        action = action.label(),
                        %rating_id,
                        retries,
                        error = %e,
                        "Transient repair failure, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = ctx.cancelled() => return Err(AuditError::Cancelled),
                        _ = tokio::time::sleep(backoff * retries) => {}
                    }
                }
                Err(e) => {
                    self.logger.log(ValidationEvent::RepairFailed {
                        action: action.label(),
                        rating_id,
                        retries,
                        error: e.to_string(),
                    });
                    return Ok(AttemptOutcome::Failed { error: e, retries });
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::market::Company;
    use crate::infrastructure::adapters::memory::InMemoryStore;
    use crate::test_support::{FlakyRatings, RecordingLogger, seeded_store};
    use chrono::{Duration as ChronoDuration, Utc};

    fn engine(repos: Repositories, config: ValidationConfig) -> RepairEngine {
        RepairEngine::new(
            repos,
            Arc::new(config),
            Arc::new(RecordingLogger::default()),
        )
    }

    fn fast_retries() -> ValidationConfig {
        ValidationConfig::builder().retry_policy(3, 1).build().unwrap()
    }

    fn valid_rating(company: Uuid, brokerage: Uuid) -> StockRating {
        StockRating::new(
            company,
            brokerage,
            "upgraded by",
            "Hold",
            "Buy",
            Utc::now() - ChronoDuration::hours(1),
        )
    }

    /// One orphan, one exact duplicate pair, one normalizable rating.
    fn messy_store() -> (Arc<InMemoryStore>, Uuid, Uuid, Uuid, Uuid) {
        let (store, company, brokerage) = seeded_store();

        let orphan = valid_rating(Uuid::new_v4(), brokerage.id);
        let mut keep = valid_rating(company.id, brokerage.id);
        keep.created_at = Utc::now() - ChronoDuration::days(2);
        let mut extra = keep.clone();
        extra.id = Uuid::new_v4();
        extra.created_at = Utc::now();
        let mut sloppy = valid_rating(company.id, brokerage.id);
        sloppy.action = "reiterated by".into();
        sloppy.rating_from = "buy".into();
        sloppy.rating_to = "Buy ".into();

        let ids = (orphan.id, keep.id, extra.id, sloppy.id);
        for r in [orphan, keep, extra, sloppy] {
            store.insert_rating(r);
        }
        (store, ids.0, ids.1, ids.2, ids.3)
    }

    #[tokio::test]
    async fn test_nothing_to_repair_on_clean_data() -> anyhow::Result<()> {
        let (store, company, brokerage) = seeded_store();
        store.insert_rating(valid_rating(company.id, brokerage.id));

        let report = engine(Repositories::from_store(store), ValidationConfig::default())
            .repair_minor_issues(&CancellationToken::new(), false)
            .await?;
        assert_eq!(report.status, RepairStatus::NothingToRepair);
        assert_eq!(report.total_repairs, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_writing() -> anyhow::Result<()> {
        let (store, ..) = messy_store();
        let before = store.rating_count();

        let report = engine(Repositories::from_store(store.clone()), ValidationConfig::default())
            .repair_minor_issues(&CancellationToken::new(), true)
            .await?;

        assert!(report.dry_run);
        assert_eq!(report.repaired_orphans, 1);
        assert_eq!(report.removed_duplicates, 1);
        assert_eq!(report.fixed_inconsistencies, 2);
        assert_eq!(report.total_repairs, 4);
        assert_eq!(store.rating_count(), before);
        Ok(())
    }

    #[tokio::test]
    async fn test_live_repair_applies_every_safe_fix() -> anyhow::Result<()> {
        let (store, orphan, keep, extra, sloppy) = messy_store();

        let report = engine(Repositories::from_store(store.clone()), ValidationConfig::default())
            .repair_minor_issues(&CancellationToken::new(), false)
            .await?;

        assert_eq!(report.status, RepairStatus::Success);
        assert_eq!(report.total_repairs, 4);
        assert!(store.rating(orphan).is_none());
        assert!(store.rating(keep).is_some());
        assert!(store.rating(extra).is_none());
        let fixed = store.rating(sloppy).unwrap();
        assert_eq!(fixed.rating_from, "Buy");
        assert_eq!(fixed.rating_to, "Buy");
        Ok(())
    }

    #[tokio::test]
    async fn test_dry_run_matches_live_counts() -> anyhow::Result<()> {
        let (store, ..) = messy_store();
        let repos = Repositories::from_store(store);
        let preview = engine(repos.clone(), ValidationConfig::default())
            .repair_minor_issues(&CancellationToken::new(), true)
            .await?;
        let live = engine(repos, ValidationConfig::default())
            .repair_minor_issues(&CancellationToken::new(), false)
            .await?;

        assert_eq!(preview.total_repairs, live.total_repairs);
        assert_eq!(preview.repaired_orphans, live.repaired_orphans);
        assert_eq!(preview.removed_duplicates, live.removed_duplicates);
        assert_eq!(preview.fixed_inconsistencies, live.fixed_inconsistencies);
        Ok(())
    }

    #[tokio::test]
    async fn test_orphan_is_deleted_not_normalized() -> anyhow::Result<()> {
        let (store, _, brokerage) = seeded_store();
        let mut orphan = valid_rating(Uuid::new_v4(), brokerage.id);
        orphan.rating_to = "buy".into();
        let orphan_id = orphan.id;
        store.insert_rating(orphan);

        let report = engine(Repositories::from_store(store.clone()), ValidationConfig::default())
            .repair_minor_issues(&CancellationToken::new(), false)
            .await?;
        assert_eq!(report.repaired_orphans, 1);
        assert_eq!(report.fixed_inconsistencies, 0);
        assert!(store.rating(orphan_id).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_ambiguous_duplicates_left_alone() -> anyhow::Result<()> {
        let (store, company, brokerage) = seeded_store();
        let a = valid_rating(company.id, brokerage.id).with_targets(Some(100.0), Some(110.0));
        let mut b = a.clone();
        b.id = Uuid::new_v4();
        b.target_to = Some(130.0);
        store.insert_rating(a);
        store.insert_rating(b);

        let report = engine(Repositories::from_store(store.clone()), ValidationConfig::default())
            .repair_minor_issues(&CancellationToken::new(), false)
            .await?;
        assert_eq!(report.removed_duplicates, 0);
        assert_eq!(report.unrepairable_of_type(AMBIGUOUS_DUPLICATE).count(), 1);
        assert_eq!(report.status, RepairStatus::Partial);
        assert_eq!(store.rating_count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_business_violation_is_unrepairable() -> anyhow::Result<()> {
        let (store, _, _) = seeded_store();
        store.insert_company(Company::new("MSFT", ""));

        let report = engine(Repositories::from_store(store), ValidationConfig::default())
            .repair_minor_issues(&CancellationToken::new(), false)
            .await?;
        assert_eq!(report.total_repairs, 0);
        let issues: Vec<_> = report.unrepairable_of_type(BUSINESS_RULE).collect();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].description.contains("required_field"));
        assert_eq!(report.status, RepairStatus::Partial);
        Ok(())
    }

    #[tokio::test]
    async fn test_company_duplicate_is_unrepairable() -> anyhow::Result<()> {
        let (store, _, _) = seeded_store();
        store.insert_company(Company::new("aapl", "Apple (dup)"));

        let report = engine(Repositories::from_store(store), ValidationConfig::default())
            .repair_minor_issues(&CancellationToken::new(), false)
            .await?;
        assert_eq!(report.unrepairable_of_type(ENTITY_DUPLICATE).count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_transient_conflicts_are_retried() -> anyhow::Result<()> {
        let (store, _, brokerage) = seeded_store();
        let orphan = valid_rating(Uuid::new_v4(), brokerage.id);
        let orphan_id = orphan.id;
        store.insert_rating(orphan);

        let flaky = Arc::new(FlakyRatings::conflicting(store.clone(), 2));
        let logger = Arc::new(RecordingLogger::default());
        let engine = RepairEngine::new(
            Repositories::new(store.clone(), store.clone(), flaky.clone()),
            Arc::new(fast_retries()),
            logger.clone(),
        );

        let report = engine
            .repair_minor_issues(&CancellationToken::new(), false)
            .await?;
        assert_eq!(report.repaired_orphans, 1);
        assert_eq!(report.status, RepairStatus::Success);
        assert_eq!(flaky.writes(), 3);
        assert!(store.rating(orphan_id).is_none());
        assert!(logger.events().iter().any(|e| matches!(
            e,
            ValidationEvent::RepairSucceeded { retries: 2, .. }
        )));
        Ok(())
    }

    #[tokio::test]
    async fn test_retries_are_bounded() -> anyhow::Result<()> {
        let (store, _, brokerage) = seeded_store();
        store.insert_rating(valid_rating(Uuid::new_v4(), brokerage.id));

        let flaky = Arc::new(FlakyRatings::conflicting(store.clone(), 10));
        let report = engine(
            Repositories::new(store.clone(), store.clone(), flaky.clone()),
            fast_retries(),
        )
        .repair_minor_issues(&CancellationToken::new(), false)
        .await?;

        // first try + 3 retries
        assert_eq!(flaky.writes(), 4);
        assert_eq!(report.repaired_orphans, 0);
        assert_eq!(report.unrepairable_of_type(REPAIR_FAILED).count(), 1);
        assert_eq!(report.status, RepairStatus::Partial);
        Ok(())
    }

    #[tokio::test]
    async fn test_permanent_failure_does_not_abort_batch() -> anyhow::Result<()> {
        let (store, _, brokerage) = seeded_store();
        store.insert_rating(valid_rating(Uuid::new_v4(), brokerage.id));
        store.insert_rating(valid_rating(Uuid::new_v4(), brokerage.id));

        let flaky = Arc::new(FlakyRatings::broken(store.clone()));
        let report = engine(
            Repositories::new(store.clone(), store.clone(), flaky.clone()),
            fast_retries(),
        )
        .repair_minor_issues(&CancellationToken::new(), false)
        .await?;

        // no retry on a permanent error, and both actions were attempted
        assert_eq!(flaky.writes(), 2);
        assert_eq!(report.unrepairable_of_type(REPAIR_FAILED).count(), 2);
        assert_eq!(store.rating_count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (store, ..) = messy_store();
        let ctx = CancellationToken::new();
        ctx.cancel();

        let res = engine(Repositories::from_store(store.clone()), ValidationConfig::default())
            .repair_minor_issues(&ctx, false)
            .await;
        assert!(matches!(res, Err(AuditError::Cancelled)));
        assert_eq!(store.rating_count(), 4);
    }
}
