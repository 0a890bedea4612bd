// stockaudit-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod report;

pub use adapters::{DuckDbStore, InMemoryStore};
pub use config::load_validation_config;
pub use logging::TracingLogger;
pub use report::{ReportDocument, save_report};
