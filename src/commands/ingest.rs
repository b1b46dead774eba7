//! Idempotent CSV ingestion into a staging table.
//!
//! Files are discovered by directory + filename prefix, deduplicated against
//! the ingestion ledger, and loaded one at a time inside their own
//! transaction. A file either lands whole or not at all; one file's failure
//! never aborts the batch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use tracing::{error, info, warn};

use crate::cli::IngestArgs;
use crate::ledger::Ledger;
use crate::model::{FileOutcome, FileStatus, IngestOutcome, IngestStatus};
use crate::util::{discover_files, now_string, resolve_data_date, validate_identifier};

pub fn run(args: IngestArgs) -> Result<()> {
    let data_date = resolve_data_date(args.data_date.as_deref(), None)?;

    let outcome = ingest_csv_files(&args.directory, &args.prefix, &args.table, &args.db, &data_date);

    match outcome.status {
        IngestStatus::Success => {
            info!(succeeded = outcome.succeeded, "CSV ingestion completed successfully");
            Ok(())
        }
        IngestStatus::Skipped => {
            info!(
                matched = outcome.matched,
                "CSV ingestion skipped; all matching files already processed"
            );
            Ok(())
        }
        IngestStatus::Partial => bail!(
            "CSV ingestion partially completed ({} succeeded, {} failed)",
            outcome.succeeded,
            outcome.failed
        ),
        IngestStatus::NoMatches | IngestStatus::Failed => bail!(
            "CSV ingestion failed: {}",
            outcome.message.unwrap_or_else(|| "unknown error".to_owned())
        ),
    }
}

/// Loads every not-yet-ingested `<prefix>*.csv` file from `directory` into
/// `table`, recording per-file outcomes in the ledger when it is available.
pub fn ingest_csv_files(
    directory: &Path,
    prefix: &str,
    table: &str,
    db_path: &Path,
    data_date: &str,
) -> IngestOutcome {
    if !directory.is_dir() {
        return IngestOutcome::failed(format!("directory not found: {}", directory.display()));
    }

    if let Err(err) = validate_identifier(table) {
        return IngestOutcome::failed(format!("{err:#}"));
    }

    let matched = match discover_files(directory, prefix, "csv") {
        Ok(files) => files,
        Err(err) => return IngestOutcome::failed(format!("{err:#}")),
    };

    if matched.is_empty() {
        return IngestOutcome::no_matches(format!(
            "no files matching {prefix}*.csv found in {}",
            directory.display()
        ));
    }

    let mut conn = match Connection::open(db_path) {
        Ok(conn) => conn,
        Err(err) => {
            return IngestOutcome::failed(format!(
                "failed to open database {}: {err}",
                db_path.display()
            ));
        }
    };

    let ledger = Ledger::open(&conn);
    let completed = ledger.completed_files(&conn);

    let new_files: Vec<&PathBuf> = matched
        .iter()
        .filter(|path| !completed.contains(&path_key(path)))
        .collect();
    let already_ingested = matched.len() - new_files.len();

    if new_files.is_empty() {
        info!(
            matched = matched.len(),
            "all matching files have already been ingested"
        );
        return IngestOutcome::skipped(matched.len());
    }

    info!(
        new = new_files.len(),
        matched = matched.len(),
        table,
        "found new files to ingest"
    );

    let mut files = Vec::with_capacity(new_files.len());
    let mut succeeded = 0;
    let mut failed = 0;

    for path in new_files {
        let name = path_key(path);

        match load_file(&mut conn, path, table, data_date) {
            Ok(rows) => {
                ledger.record(&conn, &name, FileStatus::Completed, data_date);
                succeeded += 1;
                info!(file = %name, rows, table, "loaded file");
                files.push(FileOutcome {
                    file: name,
                    status: FileStatus::Completed,
                    message: None,
                });
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(file = %name, error = %message, "file ingestion failed");
                ledger.record(&conn, &name, FileStatus::Failed, data_date);
                failed += 1;
                files.push(FileOutcome {
                    file: name,
                    status: FileStatus::Failed,
                    message: Some(message),
                });
            }
        }
    }

    info!(
        succeeded,
        failed,
        skipped = already_ingested,
        "ingestion summary"
    );
    if failed > 0 {
        warn!(failed, "some files failed to process; see file-level errors");
    }

    IngestOutcome {
        status: if failed == 0 {
            IngestStatus::Success
        } else {
            IngestStatus::Partial
        },
        message: None,
        matched: matched.len(),
        succeeded,
        failed,
        skipped: already_ingested,
        files,
    }
}

/// All-or-nothing load of one CSV file. The transaction commits only after
/// every row parsed and inserted; any error rolls the whole file back.
fn load_file(conn: &mut Connection, path: &Path, table: &str, data_date: &str) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to open CSV file: {}", path.display()))?;

    let header_len = reader
        .headers()
        .with_context(|| format!("failed to read CSV header: {}", path.display()))?
        .len();

    let audit_columns = table_columns(conn, table)?
        .iter()
        .any(|column| column == "data_date");
    let run_date = now_string();

    let placeholder_count = if audit_columns {
        header_len + 2
    } else {
        header_len
    };
    let placeholders = vec!["?"; placeholder_count].join(", ");
    let insert_sql = format!("INSERT INTO {table} VALUES ({placeholders})");

    let tx = conn
        .transaction()
        .context("failed to begin file transaction")?;
    let mut inserted = 0;

    {
        let mut statement = tx
            .prepare(&insert_sql)
            .with_context(|| format!("failed to prepare insert into {table}"))?;

        for record in reader.records() {
            let record = record
                .with_context(|| format!("failed to read CSV row in {}", path.display()))?;

            let mut values: Vec<&str> = record.iter().collect();
            if audit_columns {
                values.push(data_date);
                values.push(&run_date);
            }

            statement
                .execute(rusqlite::params_from_iter(&values))
                .with_context(|| format!("failed to insert row into {table}"))?;
            inserted += 1;
        }
    }

    tx.commit().context("failed to commit file transaction")?;
    Ok(inserted)
}

/// Column names of `table` in declaration order, via `PRAGMA table_info`.
/// Empty when the table does not exist.
pub(crate) fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    validate_identifier(table)?;

    let mut statement = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("failed to inspect schema for table {table}"))?;

    let mut columns = Vec::new();
    let mut rows = statement.query([])?;
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }

    Ok(columns)
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
