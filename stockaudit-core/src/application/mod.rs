// stockaudit-core/src/application/mod.rs

pub mod detectors;
pub mod repair;
pub mod repositories;
pub mod service;

// --- RE-EXPORTS (FACADE PATTERN) ---
// `use stockaudit_core::application::{IntegrityValidationService, Repositories};`

pub use detectors::{
    BusinessRuleValidator, ConsistencyChecker, DetectionOutcome, DetectorSuite, DuplicateDetector,
    OrphanDetector,
};
pub use repair::RepairEngine;
pub use repositories::Repositories;
pub use service::IntegrityValidationService;
