// stockaudit-core/src/domain/integrity/report.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use uuid::Uuid;

use super::severity::{IntegrityStatus, IssueCategory, Severity};
use crate::domain::market::{EntityKind, StockRating};

/// Common view over the four detector reports, used by the aggregator.
pub trait SubReport {
    fn category(&self) -> IssueCategory;
    fn total(&self) -> usize;
    fn critical_count(&self) -> usize;
    fn status(&self) -> IntegrityStatus;

    fn warning_count(&self) -> usize {
        self.total() - self.critical_count()
    }
}

// ── Orphans ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanEntry {
    pub rating_id: Uuid,
    /// Which reference failed to resolve (company or brokerage).
    pub missing: EntityKind,
    pub missing_id: Uuid,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrphanReport {
    pub entries: Vec<OrphanEntry>,
    pub total_orphans: usize,
    pub status: IntegrityStatus,
}

impl OrphanReport {
    /// Distinct ratings with at least one dangling reference.
    pub fn orphan_rating_ids(&self) -> BTreeSet<Uuid> {
        self.entries.iter().map(|e| e.rating_id).collect()
    }

    pub fn contains_rating(&self, id: Uuid) -> bool {
        self.entries.iter().any(|e| e.rating_id == id)
    }
}

impl SubReport for OrphanReport {
    fn category(&self) -> IssueCategory {
        IssueCategory::Orphans
    }
    fn total(&self) -> usize {
        self.total_orphans
    }
    fn critical_count(&self) -> usize {
        self.entries.iter().filter(|e| e.severity.is_critical()).count()
    }
    fn status(&self) -> IntegrityStatus {
        self.status
    }
}

// ── Consistency ──────────────────────────────────────────────────────

/// StockRating fields the repair engine is allowed to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixableField {
    Action,
    RatingFrom,
    RatingTo,
}

impl FixableField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::RatingFrom => "rating_from",
            Self::RatingTo => "rating_to",
        }
    }
}

/// A mechanical, in-place normalization of one StockRating field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFix {
    pub field: FixableField,
    pub value: String,
}

impl FieldFix {
    pub fn apply(&self, rating: &mut StockRating) {
        let target = match self.field {
            FixableField::Action => &mut rating.action,
            FixableField::RatingFrom => &mut rating.rating_from,
            FixableField::RatingTo => &mut rating.rating_to,
        };
        *target = self.value.clone();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inconsistency {
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub field: String,
    pub expected: String,
    pub actual: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<FieldFix>,
}

impl Inconsistency {
    pub fn is_normalizable(&self) -> bool {
        self.entity == EntityKind::StockRating && self.fix.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConsistencyReport {
    pub inconsistencies: Vec<Inconsistency>,
    pub total_inconsistencies: usize,
    pub status: IntegrityStatus,
}

impl ConsistencyReport {
    pub fn for_entity(&self, kind: EntityKind) -> impl Iterator<Item = &Inconsistency> {
        self.inconsistencies.iter().filter(move |i| i.entity == kind)
    }
}

impl SubReport for ConsistencyReport {
    fn category(&self) -> IssueCategory {
        IssueCategory::Consistency
    }
    fn total(&self) -> usize {
        self.total_inconsistencies
    }
    fn critical_count(&self) -> usize {
        self.inconsistencies
            .iter()
            .filter(|i| i.severity.is_critical())
            .count()
    }
    fn status(&self) -> IntegrityStatus {
        self.status
    }
}

// ── Duplicates ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub entity: EntityKind,
    /// Normalized business key shared by every member.
    pub key: String,
    /// Sorted member ids.
    pub member_ids: Vec<Uuid>,
    pub count: usize,
    pub severity: Severity,
    /// All members carry an identical payload (ratings only).
    pub exact: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateGroup>,
    pub total_duplicates: usize,
    pub status: IntegrityStatus,
}

impl DuplicateReport {
    pub fn for_entity(&self, kind: EntityKind) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(move |g| g.entity == kind)
    }
}

impl SubReport for DuplicateReport {
    fn category(&self) -> IssueCategory {
        IssueCategory::Duplicates
    }
    fn total(&self) -> usize {
        self.total_duplicates
    }
    fn critical_count(&self) -> usize {
        self.groups.iter().filter(|g| g.severity.is_critical()).count()
    }
    fn status(&self) -> IntegrityStatus {
        self.status
    }
}

// ── Business rules ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessViolation {
    pub rule: String,
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub details: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BusinessReport {
    pub violations: Vec<BusinessViolation>,
    pub total_violations: usize,
    pub status: IntegrityStatus,
}

impl BusinessReport {
    pub fn for_entity(&self, kind: EntityKind) -> impl Iterator<Item = &BusinessViolation> {
        self.violations.iter().filter(move |v| v.entity == kind)
    }
}

impl SubReport for BusinessReport {
    fn category(&self) -> IssueCategory {
        IssueCategory::BusinessRules
    }
    fn total(&self) -> usize {
        self.total_violations
    }
    fn critical_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity.is_critical())
            .count()
    }
    fn status(&self) -> IntegrityStatus {
        self.status
    }
}

// ── Integrity report ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub generated_at: DateTime<Utc>,
    pub orphan_report: OrphanReport,
    pub consistency_report: ConsistencyReport,
    pub duplicate_report: DuplicateReport,
    pub business_report: BusinessReport,
    pub total_issues: usize,
    pub critical_issues: usize,
    pub warning_issues: usize,
    pub overall_status: IntegrityStatus,
    pub duration: Duration,
    /// Free-form summary; always carries a `recommendations` list.
    pub summary: BTreeMap<String, serde_json::Value>,
}

impl IntegrityReport {
    pub fn recommendations(&self) -> Vec<String> {
        self.summary
            .get("recommendations")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Totals in category order: orphans, consistency, duplicates, business rules.
    pub fn category_totals(&self) -> [usize; 4] {
        [
            self.orphan_report.total_orphans,
            self.consistency_report.total_inconsistencies,
            self.duplicate_report.total_duplicates,
            self.business_report.total_violations,
        ]
    }

    pub fn is_critical(&self) -> bool {
        self.overall_status == IntegrityStatus::Critical
    }
}

// ── Repair report ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrepairableIssue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    #[default]
    NothingToRepair,
    /// Every planned repair succeeded and nothing was left for manual review.
    Success,
    /// Some issues failed or were declined and need manual intervention.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RepairReport {
    pub total_repairs: usize,
    pub repaired_orphans: usize,
    pub removed_duplicates: usize,
    pub fixed_inconsistencies: usize,
    pub unrepairable_issues: Vec<UnrepairableIssue>,
    pub dry_run: bool,
    pub status: RepairStatus,
    pub duration: Duration,
}

impl RepairReport {
    pub fn unrepairable_of_type<'a>(
        &'a self,
        issue_type: &'a str,
    ) -> impl Iterator<Item = &'a UnrepairableIssue> + 'a {
        self.unrepairable_issues
            .iter()
            .filter(move |u| u.issue_type == issue_type)
    }
}
