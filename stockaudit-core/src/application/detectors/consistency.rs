// stockaudit-core/src/application/detectors/consistency.rs
//
// Cross-field and derived-value checks. Stock ratings get the bulk of them;
// companies and brokerages are only checked for padded business keys.

use chrono::{DateTime, Duration as ChronoDuration, Months, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use super::{DetectorRun, IssueEvent, ensure_active};
use crate::application::repositories::Repositories;
use crate::domain::integrity::{
    ConsistencyReport, FieldFix, FixableField, Inconsistency, IntegrityStatus, IssueCategory,
    Severity, StockRatingRules, ValidationConfig,
};
use crate::domain::market::{ActionDirection, EntityKind, StockRating, has_surrounding_whitespace};
use crate::error::AuditError;
use crate::ports::logger::ValidationLogger;

pub struct ConsistencyChecker {
    repos: Repositories,
    config: Arc<ValidationConfig>,
    logger: Arc<dyn ValidationLogger>,
    reference_time: Option<DateTime<Utc>>,
}

impl ConsistencyChecker {
    pub fn new(
        repos: Repositories,
        config: Arc<ValidationConfig>,
        logger: Arc<dyn ValidationLogger>,
    ) -> Self {
        Self {
            repos,
            config,
            logger,
            reference_time: None,
        }
    }

    /// Pins "now" for the age/future checks instead of the wall clock.
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    #[instrument(skip_all)]
    pub async fn detect_inconsistencies(
        &self,
        ctx: &CancellationToken,
    ) -> Result<ConsistencyReport, AuditError> {
        ensure_active(ctx)?;
        let run = DetectorRun::start(self.logger.as_ref(), IssueCategory::Consistency);
        let now = self.reference_time.unwrap_or_else(Utc::now);

        let mut companies = self.repos.companies.list().await?;
        companies.sort_by_key(|c| c.id);
        let mut brokerages = self.repos.brokerages.list().await?;
        brokerages.sort_by_key(|b| b.id);
        let mut ratings = self.repos.ratings.list().await?;
        ratings.sort_by_key(|r| r.id);
        ensure_active(ctx)?;

        let mut found = Vec::new();

        for company in &companies {
            padded_key(&mut found, EntityKind::Company, company.id, "name", &company.name);
            padded_key(&mut found, EntityKind::Company, company.id, "ticker", &company.ticker);
        }
        for brokerage in &brokerages {
            padded_key(&mut found, EntityKind::Brokerage, brokerage.id, "name", &brokerage.name);
        }

        let rules = &self.config.rules.stock_rating;
        let window = TimeWindow::new(now, rules);
        for rating in &ratings {
            check_time(&mut found, rating, &window);
            check_rating_value(&mut found, rating, rules, FixableField::RatingFrom);
            check_rating_value(&mut found, rating, rules, FixableField::RatingTo);
            check_targets(&mut found, rating);
            if has_surrounding_whitespace(&rating.action) {
                found.push(Inconsistency {
                    entity: EntityKind::StockRating,
                    entity_id: rating.id,
                    field: "action".to_string(),
                    expected: rating.action.trim().to_string(),
                    actual: rating.action.clone(),
                    severity: Severity::Warning,
                    fix: Some(FieldFix {
                        field: FixableField::Action,
                        value: rating.action.trim().to_string(),
                    }),
                });
            }
        }

        for issue in &found {
            run.issue(IssueEvent {
                severity: issue.severity,
                entity: issue.entity,
                entity_id: issue.entity_id,
                details: format!(
                    "{}: expected {}, found '{}'",
                    issue.field, issue.expected, issue.actual
                ),
            });
        }

        let critical = found.iter().filter(|i| i.severity.is_critical()).count();
        let report = ConsistencyReport {
            total_inconsistencies: found.len(),
            status: IntegrityStatus::classify(
                critical,
                found.len(),
                self.config.thresholds.inconsistencies_critical_limit,
            ),
            inconsistencies: found,
        };
        run.finish(report.total_inconsistencies);
        Ok(report)
    }
}

struct TimeWindow {
    oldest: DateTime<Utc>,
    latest: DateTime<Utc>,
}

impl TimeWindow {
    fn new(now: DateTime<Utc>, rules: &StockRatingRules) -> Self {
        let oldest = now
            .checked_sub_months(Months::new(rules.max_age_years_business.saturating_mul(12)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let latest = now + ChronoDuration::minutes(i64::from(rules.future_tolerance_minutes));
        Self { oldest, latest }
    }
}

fn padded_key(out: &mut Vec<Inconsistency>, entity: EntityKind, id: Uuid, field: &str, value: &str) {
    if has_surrounding_whitespace(value) {
        // companies and brokerages are never rewritten automatically: no fix
        out.push(Inconsistency {
            entity,
            entity_id: id,
            field: field.to_string(),
            expected: value.trim().to_string(),
            actual: value.to_string(),
            severity: Severity::Warning,
            fix: None,
        });
    }
}

fn check_time(out: &mut Vec<Inconsistency>, rating: &StockRating, window: &TimeWindow) {
    if rating.time > window.latest {
        out.push(Inconsistency {
            entity: EntityKind::StockRating,
            entity_id: rating.id,
            field: "time".to_string(),
            expected: format!("<= {}", window.latest.to_rfc3339()),
            actual: rating.time.to_rfc3339(),
            severity: Severity::Critical,
            fix: None,
        });
    } else if rating.time < window.oldest {
        out.push(Inconsistency {
            entity: EntityKind::StockRating,
            entity_id: rating.id,
            field: "time".to_string(),
            expected: format!(">= {}", window.oldest.to_rfc3339()),
            actual: rating.time.to_rfc3339(),
            severity: Severity::Warning,
            fix: None,
        });
    }
}

fn check_rating_value(
    out: &mut Vec<Inconsistency>,
    rating: &StockRating,
    rules: &StockRatingRules,
    field: FixableField,
) {
    let raw = match field {
        FixableField::RatingFrom => &rating.rating_from,
        FixableField::RatingTo => &rating.rating_to,
        FixableField::Action => return,
    };
    // emptiness is a business-rule concern
    if raw.trim().is_empty() {
        return;
    }

    match rules.canonical_rating(raw) {
        Some(canonical) if canonical == raw.as_str() => {}
        Some(canonical) => out.push(Inconsistency {
            entity: EntityKind::StockRating,
            entity_id: rating.id,
            field: field.as_str().to_string(),
            expected: canonical.to_string(),
            actual: raw.clone(),
            severity: Severity::Warning,
            fix: Some(FieldFix {
                field,
                value: canonical.to_string(),
            }),
        }),
        None => out.push(Inconsistency {
            entity: EntityKind::StockRating,
            entity_id: rating.id,
            field: field.as_str().to_string(),
            expected: "one of the allowed ratings".to_string(),
            actual: raw.clone(),
            severity: Severity::Warning,
            fix: None,
        }),
    }
}

fn check_targets(out: &mut Vec<Inconsistency>, rating: &StockRating) {
    let mut invalid = false;
    for (field, value) in [("target_from", rating.target_from), ("target_to", rating.target_to)] {
        // NaN compares false against everything, so it needs its own test
        if let Some(v) = value
            && (!v.is_finite() || v < 0.0)
        {
            invalid = true;
            out.push(Inconsistency {
                entity: EntityKind::StockRating,
                entity_id: rating.id,
                field: field.to_string(),
                expected: "finite, >= 0".to_string(),
                actual: v.to_string(),
                severity: Severity::Critical,
                fix: None,
            });
        }
    }
    if invalid {
        return;
    }

    // Source data can legitimately report targets against the action's
    // direction, so a mismatch is only a warning.
    if let (Some(from), Some(to), Some(direction)) =
        (rating.target_from, rating.target_to, rating.expected_direction())
    {
        let (mismatch, expected) = match direction {
            ActionDirection::Up => (to < from, format!(">= {}", from)),
            ActionDirection::Down => (to > from, format!("<= {}", from)),
        };
        if mismatch {
            out.push(Inconsistency {
                entity: EntityKind::StockRating,
                entity_id: rating.id,
                field: "target_to".to_string(),
                expected,
                actual: to.to_string(),
                severity: Severity::Warning,
                fix: None,
            });
        }
    }
}
