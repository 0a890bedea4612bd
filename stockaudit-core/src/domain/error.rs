// stockaudit-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Invalid validation configuration: {0}")]
    #[diagnostic(
        code(stockaudit::domain::config),
        help("Start from ValidationConfig::default() and only override the fields you need.")
    )]
    InvalidConfig(String),

    #[error("Invalid ticker pattern '{pattern}': {reason}")]
    #[diagnostic(code(stockaudit::domain::ticker_pattern))]
    InvalidTickerPattern { pattern: String, reason: String },
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::InvalidConfig(errors.to_string())
    }
}
