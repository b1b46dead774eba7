//! Pipeline orchestrator.
//!
//! Strictly sequential state machine over one run:
//! ingest GSC → ingest analytics → ingest rank → transform → join → fact →
//! export. Each ingestion stage may continue on partial success; everything
//! else is fail-fast, and the first hard failure ends the run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Local;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use tracing::{info, warn};

use crate::cli::PipelineArgs;
use crate::commands::{exec_sql, ingest};
use crate::config::{Config, load_config};
use crate::model::{IngestStatus, ScriptOutcome};
use crate::util::{ensure_directory, resolve_data_date, timestamp_compact, validate_identifier};

pub fn run(args: PipelineArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let data_date = resolve_data_date(
        args.data_date.as_deref(),
        config.processing.data_date.as_deref(),
    )?;
    let db_path = args
        .db
        .clone()
        .unwrap_or_else(|| config.database.path.clone());

    run_pipeline(&config, &db_path, &data_date)
}

pub fn run_pipeline(config: &Config, db_path: &Path, data_date: &str) -> Result<()> {
    let started = Local::now();
    info!(data_date, db = %db_path.display(), "starting SEO pipeline");

    info!("step 1: processing datasets");
    let datasets = [
        (
            "1.1",
            "GSC",
            &config.input.gsc_dir,
            &config.input.gsc_prefix,
            "stg_gsc_data",
        ),
        (
            "1.2",
            "analytics",
            &config.input.analytics_dir,
            &config.input.analytics_prefix,
            "stg_analytics_data",
        ),
        (
            "1.3",
            "rank",
            &config.input.rank_dir,
            &config.input.rank_prefix,
            "stg_rank_data",
        ),
    ];

    let mut any_partial = false;
    for (step, dataset, subdir, prefix, table) in datasets {
        info!(step, dataset, "processing dataset");
        let directory = config.input.data_dir.join(subdir);
        let outcome = ingest::ingest_csv_files(&directory, prefix, table, db_path, data_date);

        if !outcome.permits_continuation() {
            bail!(
                "{dataset} data ingestion failed ({}): {}",
                outcome.status.as_str(),
                outcome
                    .message
                    .unwrap_or_else(|| "no files were loaded".to_owned())
            );
        }

        if outcome.status == IngestStatus::Partial {
            any_partial = true;
        }
    }

    if any_partial {
        warn!("some files failed to process completely; check file-level errors above");
    }

    info!("step 2: running transformations");
    run_script_stage(
        "transform",
        &config.sql.transform_dir,
        &[
            &config.sql.transform_gsc,
            &config.sql.transform_analytics,
            &config.sql.transform_rank,
        ],
        db_path,
        data_date,
    )?;

    info!("step 3: running joins");
    run_script_stage(
        "join",
        &config.sql.join_dir,
        &[&config.sql.join_gsc_analytics, &config.sql.join_gsc_rank],
        db_path,
        data_date,
    )?;

    info!("step 4: creating fact table");
    run_script_stage(
        "fact",
        &config.sql.fact_dir,
        &[&config.sql.fact_seo],
        db_path,
        data_date,
    )?;

    info!("step 5: exporting results");
    export_fact_table(config, db_path)?;

    let finished = Local::now();
    let duration = finished.signed_duration_since(started);
    info!(
        duration_ms = duration.num_milliseconds(),
        "pipeline completed"
    );

    Ok(())
}

/// Runs the stage's scripts in their fixed order; the first script error
/// fails the whole stage.
fn run_script_stage(
    stage: &str,
    directory: &Path,
    scripts: &[&String],
    db_path: &Path,
    data_date: &str,
) -> Result<()> {
    for name in scripts {
        let path = directory.join(name.as_str());
        match exec_sql::execute_sql_file(&path, db_path, data_date) {
            ScriptOutcome::Success { .. } => {}
            ScriptOutcome::Error { script, message } => {
                bail!("{stage} stage failed at {script}: {message}")
            }
        }
    }
    Ok(())
}

/// Dumps the fact table to `<export_dir>/<fact_table>_<timestamp>.csv`.
/// Skipped (treated as success) when export is disabled in configuration.
pub(crate) fn export_fact_table(config: &Config, db_path: &Path) -> Result<Option<PathBuf>> {
    if !config.output.export_csv {
        info!("CSV export disabled in configuration");
        return Ok(None);
    }

    let table = &config.output.fact_table;
    validate_identifier(table)?;

    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open database: {}", db_path.display()))?;

    let columns = ingest::table_columns(&conn, table)?;
    if columns.is_empty() {
        bail!("fact table {table} does not exist");
    }

    ensure_directory(&config.output.export_dir)?;
    let export_path = config
        .output
        .export_dir
        .join(format!("{table}_{}.csv", timestamp_compact()));

    let mut writer = csv::Writer::from_path(&export_path)
        .with_context(|| format!("failed to create export file: {}", export_path.display()))?;
    writer
        .write_record(&columns)
        .context("failed to write export header")?;

    let mut statement = conn
        .prepare(&format!("SELECT * FROM {table}"))
        .with_context(|| format!("failed to query fact table {table}"))?;
    let mut rows = statement.query([])?;

    while let Some(row) = rows.next()? {
        let mut record = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            record.push(field_to_string(row.get_ref(index)?));
        }
        writer
            .write_record(&record)
            .context("failed to write export row")?;
    }

    writer.flush().context("failed to flush export file")?;
    info!(path = %export_path.display(), "exported fact table");

    Ok(Some(export_path))
}

fn field_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(value) => value.to_string(),
        ValueRef::Real(value) => value.to_string(),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned(),
        ValueRef::Blob(blob) => String::from_utf8_lossy(blob).into_owned(),
    }
}
