// stockaudit/src/render.rs
//
// Human-readable view of a report document (comfy-table).

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};

use stockaudit_core::domain::{IntegrityReport, IntegrityStatus, RepairReport};
use stockaudit_core::infrastructure::ReportDocument;

pub fn print_text(document: &ReportDocument, show_details: bool) {
    let report = &document.integrity_report;

    println!(
        "\n{} Integrity: {} ({} issues: {} critical, {} warning) in {:.2?}",
        status_icon(report.overall_status),
        report.overall_status.as_str().to_uppercase(),
        report.total_issues,
        report.critical_issues,
        report.warning_issues,
        report.duration
    );
    println!("{}", summary_table(report));

    let recommendations = report.recommendations();
    if !recommendations.is_empty() {
        println!("💡 Recommendations:");
        for r in &recommendations {
            println!("   ➜ {}", r);
        }
    }

    if show_details && report.total_issues > 0 {
        println!("\n{}", details_table(report));
    }

    if let Some(repair) = &document.repair_report {
        print_repair(repair);
    }
}

fn status_icon(status: IntegrityStatus) -> &'static str {
    match status {
        IntegrityStatus::Good => "✅",
        IntegrityStatus::Warning => "⚠️ ",
        IntegrityStatus::Critical => "💥",
    }
}

pub fn summary_table(report: &IntegrityReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Category", "Total", "Critical", "Warning", "Status"]);

    let rows = [
        ("orphans", report.orphan_report.status),
        ("consistency", report.consistency_report.status),
        ("duplicates", report.duplicate_report.status),
        ("business_rules", report.business_report.status),
    ];
    for (name, status) in rows {
        let count = |key: &str| {
            report
                .summary
                .get(name)
                .and_then(|entry| entry.get(key))
                .and_then(|v| v.as_u64())
                .unwrap_or_default()
        };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(count("total")),
            Cell::new(count("critical")),
            Cell::new(count("warning")),
            Cell::new(status.as_str()),
        ]);
    }
    table
}

pub fn details_table(report: &IntegrityReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Category", "Severity", "Entity", "Id", "Details"]);

    for e in &report.orphan_report.entries {
        table.add_row(vec![
            "orphans".to_string(),
            e.severity.to_string(),
            "stock_rating".to_string(),
            e.rating_id.to_string(),
            format!("missing {} {}", e.missing, e.missing_id),
        ]);
    }
    for i in &report.consistency_report.inconsistencies {
        table.add_row(vec![
            "consistency".to_string(),
            i.severity.to_string(),
            i.entity.to_string(),
            i.entity_id.to_string(),
            format!(
                "{}: expected {}, found '{}'{}",
                i.field,
                i.expected,
                i.actual,
                if i.is_normalizable() { " (fixable)" } else { "" }
            ),
        ]);
    }
    for g in &report.duplicate_report.groups {
        table.add_row(vec![
            "duplicates".to_string(),
            g.severity.to_string(),
            g.entity.to_string(),
            g.member_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            format!(
                "{} x '{}'{}",
                g.count,
                g.key,
                if g.exact { " (exact)" } else { "" }
            ),
        ]);
    }
    for v in &report.business_report.violations {
        table.add_row(vec![
            "business_rules".to_string(),
            v.severity.to_string(),
            v.entity.to_string(),
            v.entity_id.to_string(),
            format!("{}: {}", v.rule, v.details),
        ]);
    }
    table
}

fn print_repair(repair: &RepairReport) {
    let mode = if repair.dry_run { " (dry run)" } else { "" };
    println!("\n🔧 Repair{}: {:?}", mode, repair.status);
    println!(
        "   {} repaired: {} orphans deleted, {} duplicates removed, {} fields normalized",
        repair.total_repairs,
        repair.repaired_orphans,
        repair.removed_duplicates,
        repair.fixed_inconsistencies
    );
    if !repair.unrepairable_issues.is_empty() {
        println!(
            "   {} issue(s) need manual review:",
            repair.unrepairable_issues.len()
        );
        for u in &repair.unrepairable_issues {
            println!("   ❌ [{}] {}", u.issue_type, u.description);
        }
    }
}
