// stockaudit/src/commands/validate.rs
//
// USE CASE: validate the database, optionally repair, report.

use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use stockaudit_core::IntegrityValidationService;
use stockaudit_core::application::Repositories;
use stockaudit_core::domain::IntegrityStatus;
use stockaudit_core::infrastructure::{
    DuckDbStore, ReportDocument, TracingLogger, load_validation_config, save_report,
};

use crate::cli::{OutputFormat, ValidateArgs};
use crate::render;

/// Returns the status of the last validation run.
pub async fn execute(args: ValidateArgs) -> anyhow::Result<IntegrityStatus> {
    if !args.db_path.exists() {
        anyhow::bail!(
            "❌ Database not found at: {}\n👉 Have you run 'stockaudit init'?",
            args.db_path.display()
        );
    }

    // 1. Config (defaults < YAML < ENV)
    let config = load_validation_config(args.config.as_deref())?;

    // 2. Adapters + service (dependency injection)
    let db_path = args.db_path.to_string_lossy();
    let store = Arc::new(
        DuckDbStore::new(&db_path)
            .with_context(|| format!("Failed to open DuckDB database at {}", db_path))?,
    );
    let service = IntegrityValidationService::new(
        Repositories::from_store(store),
        Arc::new(TracingLogger),
        config,
    )?;

    // Ctrl-C cancels whatever is running; no partial report is printed
    let ctx = CancellationToken::new();
    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_ctx.cancel();
        }
    });

    // 3. Validate
    let mut report = service.validate_full_integrity(&ctx).await?;

    // 4. Repair, then re-validate if something was written
    let mut repair = None;
    if args.auto_repair {
        let repair_report = service.repair_minor_issues(&ctx, args.dry_run).await?;
        if !repair_report.dry_run && repair_report.total_repairs > 0 {
            info!(repairs = repair_report.total_repairs, "Re-validating after repair");
            report = service.validate_full_integrity(&ctx).await?;
        }
        repair = Some(repair_report);
    }

    let status = report.overall_status;
    let mut document = ReportDocument::new(service.config(), report);
    if let Some(r) = repair {
        document = document.with_repair(r);
    }

    // 5. Output
    match args.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&document)?),
        OutputFormat::Text => render::print_text(&document, args.show_details),
    }

    if args.generate_report {
        save_report(&args.report_path, &document)?;
        if args.output_format == OutputFormat::Text {
            println!("📄 Report saved to {}", args.report_path.display());
        }
    }

    Ok(status)
}
