//! Append-only ingestion ledger backed by the `log_file_dtl` table.
//!
//! The ledger is an optional capability of the store: availability is probed
//! once per connection, and a missing table means "nothing ingested yet", not
//! an error. Writes are best-effort; ledger unavailability must never abort
//! ingestion of actual data.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::model::FileStatus;
use crate::util::{file_id_for, now_string};

pub const LEDGER_TABLE: &str = "log_file_dtl";

const LEDGER_USER: &str = "admin";

pub struct Ledger {
    available: bool,
}

impl Ledger {
    /// Probes `sqlite_master` for the ledger table; probe failures count as
    /// unavailable.
    pub fn open(conn: &Connection) -> Self {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [LEDGER_TABLE],
                |row| row.get(0),
            )
            .unwrap_or(0);

        let available = count > 0;
        if !available {
            warn!(
                table = LEDGER_TABLE,
                "ingestion ledger unavailable; treating all files as new"
            );
        }

        Self { available }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// File names with at least one `completed` entry. Query failures degrade
    /// to an empty set with a warning.
    pub fn completed_files(&self, conn: &Connection) -> HashSet<String> {
        if !self.available {
            return HashSet::new();
        }

        match query_completed(conn) {
            Ok(files) => files,
            Err(err) => {
                warn!(table = LEDGER_TABLE, error = %err, "could not query ingestion ledger");
                HashSet::new()
            }
        }
    }

    /// Appends one attempt row. Repeated attempts for the same file create new
    /// rows; the ledger is history, not current-state.
    pub fn record(&self, conn: &Connection, file_name: &str, status: FileStatus, data_date: &str) {
        if !self.available {
            debug!(
                file = file_name,
                status = status.as_str(),
                "ledger unavailable; entry not recorded"
            );
            return;
        }

        let result = conn.execute(
            "INSERT INTO log_file_dtl
               (file_id, file_name, status, created_ts, created_user, data_date, run_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                file_id_for(file_name),
                file_name,
                status.as_str(),
                now_string(),
                LEDGER_USER,
                data_date,
                now_string(),
            ],
        );

        match result {
            Ok(_) => debug!(
                file = file_name,
                status = status.as_str(),
                data_date,
                "recorded ledger entry"
            ),
            Err(err) => {
                warn!(file = file_name, error = %err, "could not write ingestion ledger entry");
            }
        }
    }
}

fn query_completed(conn: &Connection) -> rusqlite::Result<HashSet<String>> {
    let mut statement =
        conn.prepare("SELECT file_name FROM log_file_dtl WHERE status = 'completed'")?;
    let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_schema(conn: &Connection) {
        conn.execute_batch(
            "CREATE TABLE log_file_dtl (
               file_id TEXT NOT NULL,
               file_name TEXT NOT NULL,
               status TEXT NOT NULL,
               created_ts TEXT NOT NULL,
               created_user TEXT NOT NULL,
               data_date TEXT NOT NULL,
               run_date TEXT NOT NULL
             );",
        )
        .unwrap();
    }

    #[test]
    fn missing_table_means_unavailable_and_empty() {
        let conn = Connection::open_in_memory().unwrap();
        let ledger = Ledger::open(&conn);

        assert!(!ledger.is_available());
        assert!(ledger.completed_files(&conn).is_empty());

        // Writes against a missing ledger are silently dropped.
        ledger.record(&conn, "gsc_2024.csv", FileStatus::Completed, "2024-01-01");
        assert!(ledger.completed_files(&conn).is_empty());
    }

    #[test]
    fn completed_filter_excludes_failed_attempts() {
        let conn = Connection::open_in_memory().unwrap();
        ledger_schema(&conn);
        let ledger = Ledger::open(&conn);

        assert!(ledger.is_available());
        ledger.record(&conn, "data/gsc_a.csv", FileStatus::Completed, "2024-01-01");
        ledger.record(&conn, "data/gsc_b.csv", FileStatus::Failed, "2024-01-01");

        let completed = ledger.completed_files(&conn);
        assert_eq!(completed.len(), 1);
        assert!(completed.contains("data/gsc_a.csv"));
    }

    #[test]
    fn repeated_attempts_append_rows() {
        let conn = Connection::open_in_memory().unwrap();
        ledger_schema(&conn);
        let ledger = Ledger::open(&conn);

        ledger.record(&conn, "gsc_a.csv", FileStatus::Failed, "2024-01-01");
        ledger.record(&conn, "gsc_a.csv", FileStatus::Completed, "2024-01-02");

        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM log_file_dtl WHERE file_name = 'gsc_a.csv'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 2);

        // A later completed entry marks the file as ingested despite the
        // earlier failure.
        assert!(ledger.completed_files(&conn).contains("gsc_a.csv"));
    }

    #[test]
    fn entries_carry_identifier_user_and_batch_date() {
        let conn = Connection::open_in_memory().unwrap();
        ledger_schema(&conn);
        let ledger = Ledger::open(&conn);

        ledger.record(&conn, "data/gsc_a.csv", FileStatus::Completed, "2024-02-29");

        let (file_id, user, data_date): (String, String, String) = conn
            .query_row(
                "SELECT file_id, created_user, data_date FROM log_file_dtl",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();

        assert_eq!(file_id, file_id_for("gsc_a.csv"));
        assert_eq!(user, "admin");
        assert_eq!(data_date, "2024-02-29");
    }
}
