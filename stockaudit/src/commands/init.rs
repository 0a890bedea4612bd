// stockaudit/src/commands/init.rs
//
// USE CASE: create an empty audit database (or complete an existing one).

use anyhow::Context;
use std::path::Path;

use stockaudit_core::infrastructure::DuckDbStore;

pub fn execute(db_path: &Path) -> anyhow::Result<()> {
    let path = db_path.to_string_lossy();
    let store = DuckDbStore::new(&path)
        .with_context(|| format!("Failed to open DuckDB database at {}", path))?;
    store.init_schema()?;

    println!("🗄️  Schema ready in {}", path);
    println!("   Tables: companies, brokerages, stock_ratings");
    Ok(())
}
