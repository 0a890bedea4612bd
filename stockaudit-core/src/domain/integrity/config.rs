// stockaudit-core/src/domain/integrity/config.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::error::DomainError;
use crate::domain::market::normalize_key;

// --- CONFIGURATION STRUCTS ---
// Every section is `#[serde(default)]`: a YAML file only carries overrides.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct ValidationConfig {
    #[validate(nested)]
    pub rules: ValidationRules,
    #[validate(nested)]
    pub thresholds: ValidationThresholds,
    #[validate(nested)]
    pub duplicates: DuplicateSettings,
    #[validate(nested)]
    pub execution: ExecutionSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct ValidationRules {
    #[validate(nested)]
    pub company: CompanyRules,
    #[validate(nested)]
    pub brokerage: BrokerageRules,
    #[validate(nested)]
    pub stock_rating: StockRatingRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_company_lengths"))]
pub struct CompanyRules {
    pub name_min_length: usize,
    #[validate(range(min = 1))]
    pub name_max_length: usize,
    #[validate(range(min = 1, max = 32))]
    pub ticker_max_length: usize,
    #[validate(length(min = 1, message = "Ticker pattern cannot be empty"))]
    pub ticker_pattern: String,
    pub sector_max_length: usize,
    pub exchange_max_length: usize,
    /// An entity with at least this many violations is flagged critical.
    #[validate(range(min = 1))]
    pub violations_for_critical: usize,
}

impl Default for CompanyRules {
    fn default() -> Self {
        Self {
            name_min_length: 1,
            name_max_length: 255,
            ticker_max_length: 10,
            ticker_pattern: r"^[A-Za-z0-9]+([.-][A-Za-z0-9]+)?$".to_string(),
            sector_max_length: 100,
            exchange_max_length: 50,
            violations_for_critical: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_brokerage_lengths"))]
pub struct BrokerageRules {
    pub name_min_length: usize,
    #[validate(range(min = 1))]
    pub name_max_length: usize,
    #[validate(range(min = 1))]
    pub violations_for_critical: usize,
}

impl Default for BrokerageRules {
    fn default() -> Self {
        Self {
            name_min_length: 1,
            name_max_length: 255,
            violations_for_critical: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StockRatingRules {
    #[validate(range(min = 1, max = 100))]
    pub max_age_years_business: u32,
    pub future_tolerance_minutes: u32,
    #[validate(length(min = 1, message = "At least one rating value must be allowed"))]
    pub allowed_ratings: Vec<String>,
    /// Actions for which `rating_from == rating_to` is a legitimate transition.
    pub same_rating_actions: Vec<String>,
    #[validate(range(min = 1))]
    pub action_max_length: usize,
    #[validate(range(min = 1))]
    pub violations_for_critical: usize,
}

impl Default for StockRatingRules {
    fn default() -> Self {
        Self {
            max_age_years_business: 10,
            future_tolerance_minutes: 5,
            allowed_ratings: DEFAULT_RATINGS.iter().map(|r| r.to_string()).collect(),
            same_rating_actions: vec!["reiterated by".to_string()],
            action_max_length: 100,
            violations_for_critical: 2,
        }
    }
}

const DEFAULT_RATINGS: &[&str] = &[
    "Strong-Buy",
    "Buy",
    "Speculative Buy",
    "Moderate Buy",
    "Outperform",
    "Market Outperform",
    "Sector Outperform",
    "Overweight",
    "Positive",
    "Accumulate",
    "Hold",
    "Neutral",
    "Equal Weight",
    "Market Perform",
    "Sector Perform",
    "Sector Weight",
    "Peer Perform",
    "In-Line",
    "Underperform",
    "Sector Underperform",
    "Underweight",
    "Negative",
    "Reduce",
    "Sell",
    "Strong Sell",
];

impl StockRatingRules {
    /// Canonical spelling of an allowed rating, matched case-insensitively
    /// after whitespace normalization.
    pub fn canonical_rating(&self, raw: &str) -> Option<&str> {
        let wanted = normalize_key(raw);
        self.allowed_ratings
            .iter()
            .find(|r| normalize_key(r) == wanted)
            .map(String::as_str)
    }

    pub fn allows_same_rating(&self, normalized_action: &str) -> bool {
        self.same_rating_actions
            .iter()
            .any(|a| normalize_key(a) == normalized_action)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ValidationThresholds {
    /// Orphans of one reference kind beyond this count are critical.
    pub orphans_critical_ceiling: usize,
    pub inconsistencies_critical_limit: usize,
    pub duplicates_critical_limit: usize,
    /// Total business-rule violations beyond this escalate the report to critical.
    pub business_rules_warning_limit: usize,
    #[validate(range(min = 1, max = 100))]
    pub max_recommendations: usize,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            orphans_critical_ceiling: 10,
            inconsistencies_critical_limit: 100,
            duplicates_critical_limit: 50,
            business_rules_warning_limit: 100,
            max_recommendations: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DuplicateSettings {
    /// Width of the event-time bucket used as part of the rating duplicate key.
    /// 24 = calendar day (UTC).
    #[validate(range(min = 1, max = 744))]
    pub bucket_hours: u32,
}

impl Default for DuplicateSettings {
    fn default() -> Self {
        Self { bucket_hours: 24 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ExecutionSettings {
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
    #[validate(range(max = 10))]
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    #[validate(range(min = 1, max = 64))]
    pub lookup_concurrency: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_retries: 3,
            retry_backoff_ms: 50,
            lookup_concurrency: 8,
        }
    }
}

fn validate_company_lengths(rules: &CompanyRules) -> Result<(), ValidationError> {
    if rules.name_min_length > rules.name_max_length {
        return Err(ValidationError::new("company_name_min_exceeds_max"));
    }
    Ok(())
}

fn validate_brokerage_lengths(rules: &BrokerageRules) -> Result<(), ValidationError> {
    if rules.name_min_length > rules.name_max_length {
        return Err(ValidationError::new("brokerage_name_min_exceeds_max"));
    }
    Ok(())
}

impl ValidationConfig {
    pub fn builder() -> ValidationConfigBuilder {
        ValidationConfigBuilder::default()
    }

    /// Runs the declarative checks and makes sure the ticker pattern compiles.
    pub fn validated(self) -> Result<Self, DomainError> {
        self.validate()?;
        self.ticker_regex()?;
        Ok(self)
    }

    pub fn ticker_regex(&self) -> Result<Regex, DomainError> {
        let pattern = &self.rules.company.ticker_pattern;
        Regex::new(pattern).map_err(|e| DomainError::InvalidTickerPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })
    }
}

// --- BUILDER ---

/// Defaults-plus-override construction of an immutable [`ValidationConfig`].
#[derive(Debug, Clone, Default)]
pub struct ValidationConfigBuilder {
    config: ValidationConfig,
}

impl ValidationConfigBuilder {
    pub fn from_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn company_rules(mut self, rules: CompanyRules) -> Self {
        self.config.rules.company = rules;
        self
    }

    pub fn brokerage_rules(mut self, rules: BrokerageRules) -> Self {
        self.config.rules.brokerage = rules;
        self
    }

    pub fn stock_rating_rules(mut self, rules: StockRatingRules) -> Self {
        self.config.rules.stock_rating = rules;
        self
    }

    pub fn company_violations_for_critical(mut self, n: usize) -> Self {
        self.config.rules.company.violations_for_critical = n;
        self
    }

    pub fn brokerage_violations_for_critical(mut self, n: usize) -> Self {
        self.config.rules.brokerage.violations_for_critical = n;
        self
    }

    pub fn stock_rating_violations_for_critical(mut self, n: usize) -> Self {
        self.config.rules.stock_rating.violations_for_critical = n;
        self
    }

    pub fn max_age_years_business(mut self, years: u32) -> Self {
        self.config.rules.stock_rating.max_age_years_business = years;
        self
    }

    pub fn thresholds(mut self, thresholds: ValidationThresholds) -> Self {
        self.config.thresholds = thresholds;
        self
    }

    pub fn orphans_critical_ceiling(mut self, n: usize) -> Self {
        self.config.thresholds.orphans_critical_ceiling = n;
        self
    }

    pub fn business_rules_warning_limit(mut self, n: usize) -> Self {
        self.config.thresholds.business_rules_warning_limit = n;
        self
    }

    pub fn max_recommendations(mut self, n: usize) -> Self {
        self.config.thresholds.max_recommendations = n;
        self
    }

    pub fn duplicate_bucket_hours(mut self, hours: u32) -> Self {
        self.config.duplicates.bucket_hours = hours;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.execution.timeout_secs = secs;
        self
    }

    pub fn retry_policy(mut self, max_retries: u32, backoff_ms: u64) -> Self {
        self.config.execution.max_retries = max_retries;
        self.config.execution.retry_backoff_ms = backoff_ms;
        self
    }

    pub fn build(self) -> Result<ValidationConfig, DomainError> {
        self.config.validated()
    }
}
