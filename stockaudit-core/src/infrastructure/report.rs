// stockaudit-core/src/infrastructure/report.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};

use crate::domain::integrity::{IntegrityReport, RepairReport, ValidationConfig};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;

/// On-disk report: the config the run used, its findings and, when repair
/// ran, what it did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub timestamp: DateTime<Utc>,
    pub validation_config: ValidationConfig,
    pub integrity_report: IntegrityReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair_report: Option<RepairReport>,
}

impl ReportDocument {
    pub fn new(config: &ValidationConfig, integrity_report: IntegrityReport) -> Self {
        Self {
            timestamp: Utc::now(),
            validation_config: config.clone(),
            integrity_report,
            repair_report: None,
        }
    }

    pub fn with_repair(mut self, repair: RepairReport) -> Self {
        self.repair_report = Some(repair);
        self
    }
}

#[instrument(skip(document), fields(path = %path.display()))]
pub fn save_report(path: &Path, document: &ReportDocument) -> Result<(), InfrastructureError> {
    let json = serde_json::to_string_pretty(document)?;
    atomic_write(path, json)?;
    info!(
        status = %document.integrity_report.overall_status,
        "Integrity report written"
    );
    Ok(())
}
