//! Schema creation: executes every DDL script in the configured directory in
//! sorted order. Deliberately separate from the pipeline because DDL scripts
//! drop and recreate tables.

use std::path::Path;

use anyhow::{Result, bail};
use tracing::info;

use crate::cli::SchemaArgs;
use crate::commands::exec_sql;
use crate::config::load_config;
use crate::util::{discover_files, resolve_data_date};

pub fn run(args: SchemaArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let data_date = resolve_data_date(
        args.data_date.as_deref(),
        config.processing.data_date.as_deref(),
    )?;

    create_schema(&config.sql.ddl_dir, &config.database.path, &data_date)
}

/// Runs all `*.sql` files in `ddl_dir` alphabetically. Every script must
/// succeed; failures are reported after the full set has been attempted.
pub fn create_schema(ddl_dir: &Path, db_path: &Path, data_date: &str) -> Result<()> {
    let scripts = discover_files(ddl_dir, "", "sql")?;

    if scripts.is_empty() {
        bail!("no DDL scripts found in {}", ddl_dir.display());
    }

    info!(count = scripts.len(), "executing DDL scripts");

    let mut succeeded = 0;
    for script in &scripts {
        if exec_sql::execute_sql_file(script, db_path, data_date).is_success() {
            succeeded += 1;
        }
    }

    if succeeded == scripts.len() {
        info!("schema creation completed successfully");
        Ok(())
    } else {
        bail!(
            "schema creation partially completed: {succeeded} of {} scripts succeeded",
            scripts.len()
        )
    }
}
