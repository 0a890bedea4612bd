// stockaudit-core/src/infrastructure/config/validation.rs

use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, instrument};

use crate::domain::integrity::ValidationConfig;
use crate::infrastructure::error::InfrastructureError;

pub const ENV_MAX_AGE_YEARS: &str = "STOCKAUDIT_MAX_AGE_YEARS";
pub const ENV_BUCKET_HOURS: &str = "STOCKAUDIT_BUCKET_HOURS";
pub const ENV_MAX_RETRIES: &str = "STOCKAUDIT_MAX_RETRIES";

// --- LOADER ---

/// Defaults, then the YAML file (if any), then environment overrides, then
/// validation. The returned config is ready to hand to the service.
#[instrument]
pub fn load_validation_config(
    path: Option<&Path>,
) -> Result<ValidationConfig, InfrastructureError> {
    load_with_env(path, |key| std::env::var(key).ok())
}

fn load_with_env<F>(
    path: Option<&Path>,
    lookup: F,
) -> Result<ValidationConfig, InfrastructureError>
where
    F: Fn(&str) -> Option<String>,
{
    // 1. Base: YAML overrides on top of defaults
    let mut config = match path {
        Some(p) => read_yaml(p)?,
        None => ValidationConfig::default(),
    };

    // 2. Override via Variables d'Environnement (Pattern 'Layering')
    apply_env_overrides(&mut config, lookup)?;

    // 3. Fail-fast
    Ok(config.validated()?)
}

fn read_yaml(path: &Path) -> Result<ValidationConfig, InfrastructureError> {
    if !path.exists() {
        return Err(InfrastructureError::ConfigNotFound(
            path.display().to_string(),
        ));
    }
    info!(path = ?path, "Loading validation config");
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(ValidationConfig::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}

fn apply_env_overrides<F>(
    config: &mut ValidationConfig,
    lookup: F,
) -> Result<(), InfrastructureError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(years) = parse_env(&lookup, ENV_MAX_AGE_YEARS)? {
        info!(
            old = config.rules.stock_rating.max_age_years_business,
            new = years,
            "Overriding max age via ENV"
        );
        config.rules.stock_rating.max_age_years_business = years;
    }
    if let Some(hours) = parse_env(&lookup, ENV_BUCKET_HOURS)? {
        info!(
            old = config.duplicates.bucket_hours,
            new = hours,
            "Overriding duplicate bucket via ENV"
        );
        config.duplicates.bucket_hours = hours;
    }
    if let Some(retries) = parse_env(&lookup, ENV_MAX_RETRIES)? {
        info!(
            old = config.execution.max_retries,
            new = retries,
            "Overriding max retries via ENV"
        );
        config.execution.max_retries = retries;
    }
    Ok(())
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Result<Option<T>, InfrastructureError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            InfrastructureError::ConfigError(format!("{}='{}': {}", key, raw, e))
        }),
    }
}
