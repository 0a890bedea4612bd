// stockaudit-core/src/domain/integrity/aggregate.rs
//
// Pure merge of the four detector reports into one IntegrityReport. No I/O.

use chrono::Utc;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use super::config::ValidationConfig;
use super::report::{
    BusinessReport, ConsistencyReport, DuplicateReport, IntegrityReport, OrphanReport, SubReport,
};
use super::severity::{IntegrityStatus, IssueCategory};

pub struct ReportAggregator;

impl ReportAggregator {
    pub fn aggregate(
        orphan: OrphanReport,
        consistency: ConsistencyReport,
        duplicate: DuplicateReport,
        business: BusinessReport,
        config: &ValidationConfig,
        duration: Duration,
    ) -> IntegrityReport {
        let subs: [&dyn SubReport; 4] = [&orphan, &consistency, &duplicate, &business];

        let total_issues: usize = subs.iter().map(|s| s.total()).sum();
        let critical_issues: usize = subs.iter().map(|s| s.critical_count()).sum();
        let warning_issues = total_issues - critical_issues;

        let worst_sub_status = subs
            .iter()
            .map(|s| s.status())
            .max()
            .unwrap_or_default();

        let overall_status = if worst_sub_status == IntegrityStatus::Critical || critical_issues > 0
        {
            IntegrityStatus::Critical
        } else if total_issues > 0 {
            IntegrityStatus::Warning
        } else {
            IntegrityStatus::Good
        };

        let recommendations =
            Self::recommendations(&subs, &consistency, config.thresholds.max_recommendations);

        let mut summary = BTreeMap::new();
        for sub in subs {
            summary.insert(
                sub.category().as_str().to_string(),
                json!({
                    "total": sub.total(),
                    "critical": sub.critical_count(),
                    "warning": sub.warning_count(),
                    "status": sub.status(),
                }),
            );
        }
        summary.insert("recommendations".to_string(), json!(recommendations));

        IntegrityReport {
            generated_at: Utc::now(),
            orphan_report: orphan,
            consistency_report: consistency,
            duplicate_report: duplicate,
            business_report: business,
            total_issues,
            critical_issues,
            warning_issues,
            overall_status,
            duration,
            summary,
        }
    }

    /// One line per category with issues, critical categories first,
    /// deduplicated and capped at `max`.
    fn recommendations(
        subs: &[&dyn SubReport],
        consistency: &ConsistencyReport,
        max: usize,
    ) -> Vec<String> {
        let mut ranked: Vec<&&dyn SubReport> = subs.iter().filter(|s| s.total() > 0).collect();
        // stable sort keeps category order within the same severity
        ranked.sort_by_key(|s| std::cmp::Reverse(is_critical(**s)));

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for sub in ranked {
            let line = recommendation_for(*sub, consistency);
            if seen.insert(line.clone()) {
                out.push(line);
            }
            if out.len() >= max {
                break;
            }
        }
        out
    }
}

fn is_critical(sub: &dyn SubReport) -> bool {
    sub.critical_count() > 0 || sub.status() == IntegrityStatus::Critical
}

fn recommendation_for(sub: &dyn SubReport, consistency: &ConsistencyReport) -> String {
    let tag = if is_critical(sub) { "critical" } else { "warning" };
    let n = sub.total();
    let body = match sub.category() {
        IssueCategory::Orphans => format!(
            "Run repair to delete {} orphaned stock rating reference(s), then audit the import that produced them",
            n
        ),
        IssueCategory::Consistency => {
            let fixable = consistency
                .inconsistencies
                .iter()
                .filter(|i| i.is_normalizable())
                .count();
            format!(
                "Review {} inconsistent field value(s); {} can be normalized automatically by repair",
                n, fixable
            )
        }
        IssueCategory::Duplicates => format!(
            "Resolve {} duplicate group(s); exact rating duplicates are removed by repair, company and brokerage collisions need a manual merge",
            n
        ),
        IssueCategory::BusinessRules => format!(
            "Fix {} business rule violation(s) at the source; they are never repaired automatically",
            n
        ),
    };
    format!("[{}] {}", tag, body)
}
