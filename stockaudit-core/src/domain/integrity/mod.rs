// stockaudit-core/src/domain/integrity/mod.rs

pub mod aggregate;
pub mod config;
pub mod report;
pub mod severity;

pub use aggregate::ReportAggregator;
pub use config::{
    BrokerageRules, CompanyRules, DuplicateSettings, ExecutionSettings, StockRatingRules,
    ValidationConfig, ValidationConfigBuilder, ValidationRules, ValidationThresholds,
};
pub use report::{
    BusinessReport, BusinessViolation, ConsistencyReport, DuplicateGroup, DuplicateReport,
    FieldFix, FixableField, Inconsistency, IntegrityReport, OrphanEntry, OrphanReport, RepairReport,
    RepairStatus, SubReport, UnrepairableIssue,
};
pub use severity::{IntegrityStatus, IssueCategory, Severity};
