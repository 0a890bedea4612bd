// stockaudit-core/src/application/detectors/orphan.rs
//
// Referential integrity: every stock rating must point at an existing
// company and an existing brokerage.

use futures::StreamExt;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use super::{DetectorRun, IssueEvent, ensure_active};
use crate::application::repositories::Repositories;
use crate::domain::integrity::{
    IntegrityStatus, IssueCategory, OrphanEntry, OrphanReport, Severity, ValidationConfig,
};
use crate::domain::market::EntityKind;
use crate::error::AuditError;
use crate::ports::logger::ValidationLogger;
use crate::ports::repository::RepositoryError;

pub struct OrphanDetector {
    repos: Repositories,
    config: Arc<ValidationConfig>,
    logger: Arc<dyn ValidationLogger>,
}

impl OrphanDetector {
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
    pub async fn detect_orphans(&self, ctx: &CancellationToken) -> Result<OrphanReport, AuditError> {
        ensure_active(ctx)?;
        let run = DetectorRun::start(self.logger.as_ref(), IssueCategory::Orphans);

        let mut ratings = self.repos.ratings.list().await?;
        ratings.sort_by_key(|r| r.id);
        ensure_active(ctx)?;

        let concurrency = self.config.execution.lookup_concurrency;

        // 1. Resolve every distinct reference once
        let company_ids: BTreeSet<Uuid> = ratings.iter().map(|r| r.company_id).collect();
        let companies = self.repos.companies.clone();
        let missing_companies = find_missing(company_ids, concurrency, |id| {
            let repo = companies.clone();
            async move { Ok::<bool, RepositoryError>(repo.get_by_id(id).await?.is_some()) }
        })
        .await?;
        ensure_active(ctx)?;

        let brokerage_ids: BTreeSet<Uuid> = ratings.iter().map(|r| r.brokerage_id).collect();
        let brokerages = self.repos.brokerages.clone();
        let missing_brokerages = find_missing(brokerage_ids, concurrency, |id| {
            let repo = brokerages.clone();
            async move { Ok::<bool, RepositoryError>(repo.get_by_id(id).await?.is_some()) }
        })
        .await?;
        ensure_active(ctx)?;

        // 2. Severity per reference kind, from the orphan count of that kind
        let ceiling = self.config.thresholds.orphans_critical_ceiling;
        let company_orphans = ratings
            .iter()
            .filter(|r| missing_companies.contains(&r.company_id))
            .count();
        let brokerage_orphans = ratings
            .iter()
            .filter(|r| missing_brokerages.contains(&r.brokerage_id))
            .count();
        let severity_for = |count: usize| {
            if count > ceiling {
                Severity::Critical
            } else {
                Severity::Warning
            }
        };
        let company_severity = severity_for(company_orphans);
        let brokerage_severity = severity_for(brokerage_orphans);

        // 3. One entry per dangling reference
        let mut entries = Vec::new();
        for rating in &ratings {
            if missing_companies.contains(&rating.company_id) {
                entries.push(OrphanEntry {
                    rating_id: rating.id,
                    missing: EntityKind::Company,
                    missing_id: rating.company_id,
                    severity: company_severity,
                });
            }
            if missing_brokerages.contains(&rating.brokerage_id) {
                entries.push(OrphanEntry {
                    rating_id: rating.id,
                    missing: EntityKind::Brokerage,
                    missing_id: rating.brokerage_id,
                    severity: brokerage_severity,
                });
            }
        }

        for entry in &entries {
            run.issue(IssueEvent {
                severity: entry.severity,
                entity: EntityKind::StockRating,
                entity_id: entry.rating_id,
                details: format!("references missing {} {}", entry.missing, entry.missing_id),
            });
        }

        let critical = entries.iter().filter(|e| e.severity.is_critical()).count();
        let report = OrphanReport {
            total_orphans: entries.len(),
            status: IntegrityStatus::from_counts(critical, entries.len()),
            entries,
        };
        run.finish(report.total_orphans);
        Ok(report)
    }
}

/// Looks up each id with bounded concurrency and returns those that do not exist.
async fn find_missing<F, Fut>(
    ids: BTreeSet<Uuid>,
    concurrency: usize,
    exists: F,
) -> Result<BTreeSet<Uuid>, RepositoryError>
where
    F: Fn(Uuid) -> Fut,
    Fut: Future<Output = Result<bool, RepositoryError>>,
{
    let lookups = ids.into_iter().map(|id| {
        let fut = exists(id);
        async move { fut.await.map(|found| (id, found)) }
    });

    let results: Vec<_> = futures::stream::iter(lookups)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut missing = BTreeSet::new();
    for res in results {
        let (id, found) = res?;
        if !found {
            missing.insert(id);
        }
    }
    Ok(missing)
}
