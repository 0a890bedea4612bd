// stockaudit-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::repository::RepositoryError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    // --- ERREURS DU DOMAINE (Configuration invalide, règles) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- ERREURS D'INFRASTRUCTURE (IO, Parsing, DuckDB) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- ERREURS DE STOCKAGE (Port repository) ---
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // --- ANNULATION ---
    #[error("Validation cancelled before completion")]
    Cancelled,

    #[error("Validation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        AuditError::Infrastructure(InfrastructureError::Io(err))
    }
}
