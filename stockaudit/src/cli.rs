// stockaudit/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "stockaudit.duckdb";
pub const DEFAULT_REPORT_PATH: &str = "integrity_report.json";

#[derive(Parser)]
#[command(name = "stockaudit")]
#[command(about = "Integrity validation & repair for companies, brokerages and stock ratings", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🗄️  Creates the companies / brokerages / stock_ratings tables
    Init {
        /// Path to the DuckDB database file
        #[arg(long, env = "STOCKAUDIT_DB_PATH", default_value = DEFAULT_DB_PATH)]
        db_path: PathBuf,
    },

    /// 🔎 Validates data integrity, optionally repairing what is safe to repair
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Path to the DuckDB database file
    #[arg(long, env = "STOCKAUDIT_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// YAML file overriding the default validation config
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the JSON report document to --report-path
    #[arg(long)]
    pub generate_report: bool,

    #[arg(long, default_value = DEFAULT_REPORT_PATH)]
    pub report_path: PathBuf,

    /// Repair orphans, exact duplicates and normalizable fields, then re-validate
    #[arg(long)]
    pub auto_repair: bool,

    /// With --auto-repair: only count what would be repaired
    #[arg(long, requires = "auto_repair")]
    pub dry_run: bool,

    /// List every detected issue
    #[arg(long)]
    pub show_details: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}
