// stockaudit-core/src/application/detectors/duplicate.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use super::{DetectorRun, IssueEvent, ensure_active};
use crate::application::repositories::Repositories;
use crate::domain::integrity::{
    DuplicateGroup, DuplicateReport, IntegrityStatus, IssueCategory, Severity, ValidationConfig,
};
use crate::domain::market::{EntityKind, StockRating};
use crate::error::AuditError;
use crate::ports::logger::ValidationLogger;

/// Identity collisions on business keys.
pub struct DuplicateDetector {
    repos: Repositories,
    config: Arc<ValidationConfig>,
    logger: Arc<dyn ValidationLogger>,
}

impl DuplicateDetector {
    pub fn new(
        repos: Repositories,
        config: Arc<ValidationConfig>,
        logger: Arc<dyn ValidationLogger>,
    ) -> Self {
        Self {
            repos,
            config,
            logger,
        }
    }

    #[instrument(skip_all)]
    pub async fn detect_duplicates(
        &self,
        ctx: &CancellationToken,
    ) -> Result<DuplicateReport, AuditError> {
        ensure_active(ctx)?;
        let run = DetectorRun::start(self.logger.as_ref(), IssueCategory::Duplicates);

        let companies = self.repos.companies.list().await?;
        let brokerages = self.repos.brokerages.list().await?;
        let ratings = self.repos.ratings.list().await?;
        ensure_active(ctx)?;

        let mut groups = Vec::new();

        let mut by_ticker: BTreeMap<String, Vec<Uuid>> = BTreeMap::new();
        for company in &companies {
            by_ticker
                .entry(company.normalized_ticker())
                .or_default()
                .push(company.id);
        }
        collect_groups(&mut groups, EntityKind::Company, by_ticker, Severity::Critical);

        let mut by_name: BTreeMap<String, Vec<Uuid>> = BTreeMap::new();
        for brokerage in &brokerages {
            by_name
                .entry(brokerage.normalized_name())
                .or_default()
                .push(brokerage.id);
        }
        collect_groups(&mut groups, EntityKind::Brokerage, by_name, Severity::Critical);

        let bucket_secs = i64::from(self.config.duplicates.bucket_hours) * 3600;
        let mut by_event: BTreeMap<RatingKey, Vec<&StockRating>> = BTreeMap::new();
        for rating in &ratings {
            by_event
                .entry(RatingKey::of(rating, bucket_secs))
                .or_default()
                .push(rating);
        }
        for (key, members) in by_event {
            if members.len() < 2 {
                continue;
            }
            // a blank action is a business violation; never auto-delete on it
            let first = members[0].payload();
            let exact =
                !key.action.is_empty() && members.iter().all(|r| r.payload() == first);
            let mut member_ids: Vec<Uuid> = members.iter().map(|r| r.id).collect();
            member_ids.sort();
            groups.push(DuplicateGroup {
                entity: EntityKind::StockRating,
                key: key.to_string(),
                count: member_ids.len(),
                member_ids,
                severity: Severity::Warning,
                exact,
            });
        }

        for group in &groups {
            // the group is reported once, against its lowest id
            run.issue(IssueEvent {
                severity: group.severity,
                entity: group.entity,
                entity_id: group.member_ids[0],
                details: format!(
                    "{} records share key '{}'{}",
                    group.count,
                    group.key,
                    if group.exact { " (exact)" } else { "" }
                ),
            });
        }

        let critical = groups.iter().filter(|g| g.severity.is_critical()).count();
        let report = DuplicateReport {
            total_duplicates: groups.len(),
            status: IntegrityStatus::classify(
                critical,
                groups.len(),
                self.config.thresholds.duplicates_critical_limit,
            ),
            groups,
        };
        run.finish(report.total_duplicates);
        Ok(report)
    }
}

fn collect_groups(
    out: &mut Vec<DuplicateGroup>,
    entity: EntityKind,
    keyed: BTreeMap<String, Vec<Uuid>>,
    severity: Severity,
) {
    for (key, mut ids) in keyed {
        // blank keys are a business-rule violation, not a collision
        if key.is_empty() || ids.len() < 2 {
            continue;
        }
        ids.sort();
        out.push(DuplicateGroup {
            entity,
            key,
            count: ids.len(),
            member_ids: ids,
            severity,
            exact: false,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RatingKey {
    company_id: Uuid,
    brokerage_id: Uuid,
    bucket: i64,
    action: String,
}

impl RatingKey {
    fn of(rating: &StockRating, bucket_secs: i64) -> Self {
        Self {
            company_id: rating.company_id,
            brokerage_id: rating.brokerage_id,
            bucket: rating.time.timestamp().div_euclid(bucket_secs.max(1)),
            action: rating.normalized_action(),
        }
    }
}

impl std::fmt::Display for RatingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.company_id, self.brokerage_id, self.bucket, self.action
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::market::{Brokerage, Company};
    use crate::test_support::{RecordingLogger, seeded_store};
    use chrono::{TimeZone, Utc};

    async fn detect(
        store: Arc<crate::infrastructure::adapters::memory::InMemoryStore>,
        config: ValidationConfig,
    ) -> anyhow::Result<DuplicateReport> {
        let detector = DuplicateDetector::new(
            Repositories::from_store(store),
            Arc::new(config),
            Arc::new(RecordingLogger::default()),
        );
        Ok(detector.detect_duplicates(&CancellationToken::new()).await?)
    }

    #[tokio::test]
    async fn test_ticker_collision_is_case_insensitive() -> anyhow::Result<()> {
        let (store, company, _) = seeded_store();
        let twin = Company::new(" aapl", "Apple again");
        let twin_id = twin.id;
        store.insert_company(twin);

        let report = detect(store, ValidationConfig::default()).await?;
        assert_eq!(report.total_duplicates, 1);
        let group = &report.groups[0];
        assert_eq!(group.entity, EntityKind::Company);
        assert_eq!(group.count, 2);
        assert_eq!(group.severity, Severity::Critical);
        let mut expected = vec![company.id, twin_id];
        expected.sort();
        assert_eq!(group.member_ids, expected);
        assert_eq!(report.status, IntegrityStatus::Critical);
        Ok(())
    }

    #[tokio::test]
    async fn test_brokerage_name_whitespace_collision() -> anyhow::Result<()> {
        let (store, _, _) = seeded_store();
        store.insert_brokerage(Brokerage::new("goldman   sachs"));

        let report = detect(store, ValidationConfig::default()).await?;
        assert_eq!(report.for_entity(EntityKind::Brokerage).count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_same_day_rating_pair_exact() -> anyhow::Result<()> {
        let (store, company, brokerage) = seeded_store();
        let morning = Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2025, 3, 4, 18, 30, 0).unwrap();
        store.insert_rating(StockRating::new(
            company.id, brokerage.id, "upgraded by", "Hold", "Buy", morning,
        ));
        store.insert_rating(StockRating::new(
            company.id, brokerage.id, "Upgraded by", "hold", "Buy", evening,
        ));

        let report = detect(store, ValidationConfig::default()).await?;
        assert_eq!(report.total_duplicates, 1);
        let group = &report.groups[0];
        assert!(group.exact);
        assert_eq!(group.severity, Severity::Warning);
        assert_eq!(report.status, IntegrityStatus::Warning);
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_action_pair_is_grouped_but_not_exact() -> anyhow::Result<()> {
        let (store, company, brokerage) = seeded_store();
        let t = Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap();
        store.insert_rating(StockRating::new(company.id, brokerage.id, "", "Hold", "Buy", t));
        store.insert_rating(StockRating::new(company.id, brokerage.id, "  ", "Hold", "Buy", t));

        let report = detect(store, ValidationConfig::default()).await?;
        assert_eq!(report.total_duplicates, 1);
        let group = &report.groups[0];
        assert_eq!(group.entity, EntityKind::StockRating);
        assert_eq!(group.count, 2);
        assert!(!group.exact);
        assert_eq!(group.severity, Severity::Warning);
        Ok(())
    }

    #[tokio::test]
    async fn test_differing_targets_are_ambiguous() -> anyhow::Result<()> {
        let (store, company, brokerage) = seeded_store();
        let t = Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap();
        store.insert_rating(
            StockRating::new(company.id, brokerage.id, "upgraded by", "Hold", "Buy", t)
                .with_targets(Some(100.0), Some(110.0)),
        );
        store.insert_rating(
            StockRating::new(company.id, brokerage.id, "upgraded by", "Hold", "Buy", t)
                .with_targets(Some(100.0), Some(125.0)),
        );

        let report = detect(store, ValidationConfig::default()).await?;
        assert_eq!(report.total_duplicates, 1);
        assert!(!report.groups[0].exact);
        Ok(())
    }

    #[tokio::test]
    async fn test_different_action_or_day_not_duplicate() -> anyhow::Result<()> {
        let (store, company, brokerage) = seeded_store();
        let t = Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap();
        store.insert_rating(StockRating::new(
            company.id, brokerage.id, "upgraded by", "Hold", "Buy", t,
        ));
        store.insert_rating(StockRating::new(
            company.id, brokerage.id, "reiterated by", "Buy", "Buy", t,
        ));
        store.insert_rating(StockRating::new(
            company.id, brokerage.id, "upgraded by", "Hold", "Buy", next_day,
        ));

        let report = detect(store, ValidationConfig::default()).await?;
        assert_eq!(report.total_duplicates, 0);
        assert_eq!(report.status, IntegrityStatus::Good);
        Ok(())
    }

    #[tokio::test]
    async fn test_wider_bucket_merges_days() -> anyhow::Result<()> {
        let (store, company, brokerage) = seeded_store();
        // 2025-03-03 is a Monday; a 7-day bucket starting at the epoch (a Thursday)
        // covers Thursday 2025-02-27 through Wednesday 2025-03-05.
        let monday = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap();
        for t in [monday, tuesday] {
            store.insert_rating(StockRating::new(
                company.id, brokerage.id, "upgraded by", "Hold", "Buy", t,
            ));
        }
        let config = ValidationConfig::builder()
            .duplicate_bucket_hours(24 * 7)
            .build()?;

        let report = detect(store, config).await?;
        assert_eq!(report.total_duplicates, 1);
        Ok(())
    }
}
