// stockaudit/src/main.rs

mod cli;
mod commands;
mod render;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use stockaudit_core::domain::IntegrityStatus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug stockaudit validate ... pour voir chaque anomalie.
    // Logs go to stderr so `--output-format json` stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        // --- USE CASE: SCHEMA ---
        Commands::Init { db_path } => commands::init::execute(&db_path)?,

        // --- USE CASE: VALIDATE (+ REPAIR) ---
        Commands::Validate(args) => {
            let status = commands::validate::execute(args).await?;
            if status == IntegrityStatus::Critical {
                // Exit with error code for CI/CD
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
