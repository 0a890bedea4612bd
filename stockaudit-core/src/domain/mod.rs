// stockaudit-core/src/domain/mod.rs

pub mod error;
pub mod integrity;
pub mod market;

// Re-exports pratiques pour simplifier les imports ailleurs
pub use error::DomainError;
pub use integrity::{
    IntegrityReport, IntegrityStatus, RepairReport, Severity, ValidationConfig,
    ValidationConfigBuilder,
};
pub use market::{Brokerage, Company, EntityKind, StockRating};
