//! SQL script executor: runs one script file against the store and reports a
//! structured outcome. Failures never propagate past this boundary; they come
//! back as [`ScriptOutcome::Error`] with the underlying message.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use tracing::{error, info};

use crate::cli::ExecSqlArgs;
use crate::model::ScriptOutcome;
use crate::util::resolve_data_date;

pub fn run(args: ExecSqlArgs) -> Result<()> {
    let data_date = resolve_data_date(args.data_date.as_deref(), None)?;

    match execute_sql_file(&args.sql_file, &args.db, &data_date) {
        ScriptOutcome::Success { script, data_date } => {
            info!(script, data_date, "SQL execution completed successfully");
            Ok(())
        }
        ScriptOutcome::Error { script, message } => {
            bail!("SQL execution failed for {script}: {message}")
        }
    }
}

/// Executes the whole script text against `db_path`. The batch date is made
/// visible to scripts two ways: a leading comment for human traceability, and
/// a zero-argument `DATA_DATE()` SQL function scripts may call. Statements
/// are not parameterized with it directly.
pub fn execute_sql_file(script_path: &Path, db_path: &Path, data_date: &str) -> ScriptOutcome {
    let script = base_name(script_path);

    match try_execute(script_path, db_path, data_date) {
        Ok(()) => {
            info!(script = %script, data_date, db = %db_path.display(), "executed SQL script");
            ScriptOutcome::Success {
                script,
                data_date: data_date.to_owned(),
            }
        }
        Err(err) => {
            let message = format!("{err:#}");
            error!(script = %script, error = %message, "SQL script failed");
            ScriptOutcome::Error { script, message }
        }
    }
}

fn try_execute(script_path: &Path, db_path: &Path, data_date: &str) -> Result<()> {
    if !script_path.is_file() {
        bail!("SQL file not found: {}", script_path.display());
    }

    let text = fs::read_to_string(script_path)
        .with_context(|| format!("failed to read SQL file: {}", script_path.display()))?;
    let sql = format!("-- data_date parameter set to '{data_date}'\n{text}");

    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open database: {}", db_path.display()))?;

    let date = data_date.to_owned();
    conn.create_scalar_function(
        "DATA_DATE",
        0,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        move |_ctx| Ok(date.clone()),
    )
    .context("failed to register DATA_DATE function")?;

    // Statement-at-a-time execution: statements before a failing one stay
    // committed, matching SQLite autocommit semantics.
    conn.execute_batch(&sql)
        .with_context(|| format!("failed to execute {}", script_path.display()))?;

    Ok(())
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn success_reports_base_name_and_data_date() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("create_stage.sql");
        fs::write(&script, "CREATE TABLE stage_one (value TEXT);").unwrap();
        let db = dir.path().join("store.db");

        let outcome = execute_sql_file(&script, &db, "2024-04-01");

        match outcome {
            ScriptOutcome::Success { script, data_date } => {
                assert_eq!(script, "create_stage.sql");
                assert_eq!(data_date, "2024-04-01");
            }
            ScriptOutcome::Error { message, .. } => panic!("unexpected error: {message}"),
        }

        let conn = Connection::open(&db).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'stage_one'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn scripts_can_read_the_batch_date_via_data_date_function() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("stamp.sql");
        fs::write(
            &script,
            "CREATE TABLE stamped (batch TEXT);\nINSERT INTO stamped VALUES (DATA_DATE());",
        )
        .unwrap();
        let db = dir.path().join("store.db");

        let outcome = execute_sql_file(&script, &db, "2024-07-15");
        assert!(outcome.is_success());

        let conn = Connection::open(&db).unwrap();
        let batch: String = conn
            .query_row("SELECT batch FROM stamped", [], |row| row.get(0))
            .unwrap();
        assert_eq!(batch, "2024-07-15");
    }

    #[test]
    fn missing_script_becomes_error_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("absent.sql");
        let db = dir.path().join("store.db");

        match execute_sql_file(&script, &db, "2024-04-01") {
            ScriptOutcome::Error { script, message } => {
                assert_eq!(script, "absent.sql");
                assert!(message.contains("SQL file not found"));
            }
            ScriptOutcome::Success { .. } => panic!("expected error outcome"),
        }
    }

    #[test]
    fn syntax_error_keeps_earlier_statements_committed() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("broken.sql");
        fs::write(
            &script,
            "CREATE TABLE survivors (id INTEGER);\nINSERT INTO survivors VALUES (1);\nTHIS IS NOT SQL;",
        )
        .unwrap();
        let db = dir.path().join("store.db");

        match execute_sql_file(&script, &db, "2024-04-01") {
            ScriptOutcome::Error { script, message } => {
                assert_eq!(script, "broken.sql");
                assert!(!message.is_empty());
            }
            ScriptOutcome::Success { .. } => panic!("expected error outcome"),
        }

        let conn = Connection::open(&db).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM survivors", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
