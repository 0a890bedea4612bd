// stockaudit-core/src/application/detectors/business.rs
//
// Static per-record invariants. Violations are collected per entity first:
// an entity breaking enough rules has all of its violations escalated.

use regex::Regex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use super::{DetectorRun, IssueEvent, ensure_active};
use crate::application::repositories::Repositories;
use crate::domain::integrity::{
    BrokerageRules, BusinessReport, BusinessViolation, CompanyRules, IntegrityStatus,
    IssueCategory, Severity, StockRatingRules, ValidationConfig,
};
use crate::domain::market::{Brokerage, Company, EntityKind, StockRating, normalize_key};
use crate::error::AuditError;
use crate::ports::logger::ValidationLogger;

pub const RULE_REQUIRED_FIELD: &str = "required_field";
pub const RULE_NAME_LENGTH: &str = "name_length";
pub const RULE_TICKER_FORMAT: &str = "ticker_format";
pub const RULE_FIELD_LENGTH: &str = "field_length";
pub const RULE_RATING_TRANSITION: &str = "rating_transition";

pub struct BusinessRuleValidator {
    repos: Repositories,
    config: Arc<ValidationConfig>,
    logger: Arc<dyn ValidationLogger>,
}

impl BusinessRuleValidator {
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
    pub async fn detect_violations(
        &self,
        ctx: &CancellationToken,
    ) -> Result<BusinessReport, AuditError> {
        ensure_active(ctx)?;
        let run = DetectorRun::start(self.logger.as_ref(), IssueCategory::BusinessRules);
        let rules = &self.config.rules;
        let ticker_re = self.config.ticker_regex()?;

        let mut companies = self.repos.companies.list().await?;
        companies.sort_by_key(|c| c.id);
        let mut brokerages = self.repos.brokerages.list().await?;
        brokerages.sort_by_key(|b| b.id);
        let mut ratings = self.repos.ratings.list().await?;
        ratings.sort_by_key(|r| r.id);
        ensure_active(ctx)?;

        let mut violations = Vec::new();
        for company in &companies {
            let found = company_violations(company, &rules.company, &ticker_re);
            escalate(
                &mut violations,
                EntityKind::Company,
                company.id,
                found,
                rules.company.violations_for_critical,
            );
        }
        for brokerage in &brokerages {
            let found = brokerage_violations(brokerage, &rules.brokerage);
            escalate(
                &mut violations,
                EntityKind::Brokerage,
                brokerage.id,
                found,
                rules.brokerage.violations_for_critical,
            );
        }
        for rating in &ratings {
            let found = rating_violations(rating, &rules.stock_rating);
            escalate(
                &mut violations,
                EntityKind::StockRating,
                rating.id,
                found,
                rules.stock_rating.violations_for_critical,
            );
        }

        for v in &violations {
            run.issue(IssueEvent {
                severity: v.severity,
                entity: v.entity,
                entity_id: v.entity_id,
                details: format!("{}: {}", v.rule, v.details),
            });
        }

        let critical = violations.iter().filter(|v| v.severity.is_critical()).count();
        let report = BusinessReport {
            total_violations: violations.len(),
            status: IntegrityStatus::classify(
                critical,
                violations.len(),
                self.config.thresholds.business_rules_warning_limit,
            ),
            violations,
        };
        run.finish(report.total_violations);
        Ok(report)
    }
}

/// (rule, details) pairs for a single entity, before severity is known.
type Found = Vec<(&'static str, String)>;

fn escalate(
    out: &mut Vec<BusinessViolation>,
    entity: EntityKind,
    entity_id: Uuid,
    found: Found,
    violations_for_critical: usize,
) {
    let severity = if found.len() >= violations_for_critical {
        Severity::Critical
    } else {
        Severity::Warning
    };
    out.extend(found.into_iter().map(|(rule, details)| BusinessViolation {
        rule: rule.to_string(),
        entity,
        entity_id,
        details,
        severity,
    }));
}

fn check_name(found: &mut Found, name: &str, min: usize, max: usize) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        found.push((RULE_REQUIRED_FIELD, "name is empty".to_string()));
        return;
    }
    let len = trimmed.chars().count();
    if len < min || len > max {
        found.push((
            RULE_NAME_LENGTH,
            format!("name length {} outside [{}, {}]", len, min, max),
        ));
    }
}

fn check_optional_length(found: &mut Found, field: &str, value: Option<&str>, max: usize) {
    if let Some(v) = value {
        let len = v.chars().count();
        if len > max {
            found.push((
                RULE_FIELD_LENGTH,
                format!("{} length {} exceeds {}", field, len, max),
            ));
        }
    }
}

fn company_violations(company: &Company, rules: &CompanyRules, ticker_re: &Regex) -> Found {
    let mut found = Found::new();
    check_name(&mut found, &company.name, rules.name_min_length, rules.name_max_length);

    let ticker = company.ticker.trim();
    if ticker.is_empty() {
        found.push((RULE_REQUIRED_FIELD, "ticker is empty".to_string()));
    } else if ticker.chars().count() > rules.ticker_max_length || !ticker_re.is_match(ticker) {
        found.push((
            RULE_TICKER_FORMAT,
            format!(
                "ticker '{}' does not match {} (max {} chars)",
                ticker, rules.ticker_pattern, rules.ticker_max_length
            ),
        ));
    }

    check_optional_length(&mut found, "sector", company.sector.as_deref(), rules.sector_max_length);
    check_optional_length(
        &mut found,
        "exchange",
        company.exchange.as_deref(),
        rules.exchange_max_length,
    );
    found
}

fn brokerage_violations(brokerage: &Brokerage, rules: &BrokerageRules) -> Found {
    let mut found = Found::new();
    check_name(&mut found, &brokerage.name, rules.name_min_length, rules.name_max_length);
    found
}

fn rating_violations(rating: &StockRating, rules: &StockRatingRules) -> Found {
    let mut found = Found::new();

    let action = rating.normalized_action();
    if action.is_empty() {
        found.push((RULE_REQUIRED_FIELD, "action is empty".to_string()));
    } else {
        check_optional_length(&mut found, "action", Some(&rating.action), rules.action_max_length);
    }

    if rating.rating_to.trim().is_empty() {
        found.push((RULE_REQUIRED_FIELD, "rating_to is empty".to_string()));
    } else if !rating.rating_from.trim().is_empty()
        && normalize_key(&rating.rating_from) == normalize_key(&rating.rating_to)
        && !rules.allows_same_rating(&action)
    {
        found.push((
            RULE_RATING_TRANSITION,
            format!(
                "'{}' keeps rating '{}' unchanged",
                rating.action.trim(),
                rating.rating_to.trim()
            ),
        ));
    }
    found
}
