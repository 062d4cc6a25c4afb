//! SQLite-backed row store for raw notes and processed meeting records.
//!
//! Both tables are append-only; the status column is the distributed
//! commit marker the whole pipeline's idempotency reasoning rests on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use bridge_module::protocol::REPORT_COLUMNS;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS raw_notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    received_at TEXT NOT NULL,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    status TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS processed_meetings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    meeting_date TEXT NOT NULL,
    meeting_name TEXT NOT NULL,
    accomplishments TEXT NOT NULL,
    upcoming TEXT NOT NULL,
    risks TEXT NOT NULL,
    decisions TEXT NOT NULL,
    status TEXT NOT NULL
);
"#;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown row status `{0}`")]
    UnknownStatus(String),
    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),
}

/// Processing state of a stored row. The wire strings are load-bearing:
/// they are what the aggregator filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    New,
    Processed,
}

impl RowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RowStatus::New => "New",
            RowStatus::Processed => "Processed",
        }
    }

    fn parse(value: &str) -> Result<Self, StoreError> {
        match value {
            "New" => Ok(RowStatus::New),
            "Processed" => Ok(RowStatus::Processed),
            other => Err(StoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// One ingested mail thread.
#[derive(Debug, Clone)]
pub struct RawNote {
    pub id: i64,
    pub received_at: DateTime<Utc>,
    pub subject: String,
    pub body: String,
    pub status: RowStatus,
}

/// A report row as supplied by the webhook, normalized to exactly six
/// cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub cells: [String; REPORT_COLUMNS],
}

impl ReportRow {
    /// Normalize a scraped row: missing trailing cells become empty text,
    /// cells beyond the sixth are dropped. A short row is never rejected
    /// and never stored short.
    pub fn from_cells(cells: &[String]) -> Self {
        Self {
            cells: std::array::from_fn(|i| cells.get(i).cloned().unwrap_or_default()),
        }
    }
}

/// One stored report row.
#[derive(Debug, Clone)]
pub struct ProcessedMeeting {
    pub id: i64,
    pub cells: [String; REPORT_COLUMNS],
    pub status: RowStatus,
}

/// Handle to the pipeline database. Connections are opened per operation,
/// so the handle is cheap to clone and safe to share with the server.
#[derive(Debug, Clone)]
pub struct RowStore {
    path: PathBuf,
}

impl RowStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn open(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    /// Append one raw note with status New; returns its row id.
    pub fn append_raw_note(
        &self,
        received_at: DateTime<Utc>,
        subject: &str,
        body: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO raw_notes (received_at, subject, body, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                received_at.to_rfc3339(),
                subject,
                body,
                RowStatus::New.as_str()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All raw notes in insertion order. Order matters downstream: the
    /// aggregator folds notes chronologically.
    pub fn list_raw_notes(&self) -> Result<Vec<RawNote>, StoreError> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare("SELECT id, received_at, subject, body, status FROM raw_notes ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut notes = Vec::new();
        for row in rows {
            let (id, received_at, subject, body, status) = row?;
            notes.push(RawNote {
                id,
                received_at: parse_timestamp(&received_at)?,
                subject,
                body,
                status: RowStatus::parse(&status)?,
            });
        }
        Ok(notes)
    }

    /// Flip the given raw rows to Processed in one transaction.
    pub fn mark_raw_processed(&self, ids: &[i64]) -> Result<(), StoreError> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        for id in ids {
            tx.execute(
                "UPDATE raw_notes SET status = ?1 WHERE id = ?2",
                params![RowStatus::Processed.as_str(), id],
            )?;
        }
        tx.commit()?;
        debug!("marked {} raw notes processed", ids.len());
        Ok(())
    }

    /// Append a whole batch of report rows with status New, atomically:
    /// either every row lands or none does.
    pub fn append_report_rows(&self, rows: &[ReportRow]) -> Result<usize, StoreError> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        for row in rows {
            tx.execute(
                "INSERT INTO processed_meetings
                    (meeting_date, meeting_name, accomplishments, upcoming, risks, decisions, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    row.cells[0],
                    row.cells[1],
                    row.cells[2],
                    row.cells[3],
                    row.cells[4],
                    row.cells[5],
                    RowStatus::New.as_str()
                ],
            )?;
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// All processed meeting records in insertion order.
    pub fn list_processed(&self) -> Result<Vec<ProcessedMeeting>, StoreError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, meeting_date, meeting_name, accomplishments, upcoming, risks, decisions, status
             FROM processed_meetings ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                [
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ],
                row.get::<_, String>(7)?,
            ))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (id, cells, status) = row?;
            records.push(ProcessedMeeting {
                id,
                cells,
                status: RowStatus::parse(&status)?,
            });
        }
        Ok(records)
    }

    /// Delete every raw data row. The table and its schema stay in
    /// place, so appends keep working after a clear.
    pub fn clear_raw(&self) -> Result<(), StoreError> {
        let conn = self.open()?;
        conn.execute("DELETE FROM raw_notes", [])?;
        Ok(())
    }

    /// Delete every processed data row, keeping the table.
    pub fn clear_processed(&self) -> Result<(), StoreError> {
        let conn = self.open()?;
        conn.execute("DELETE FROM processed_meetings", [])?;
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidTimestamp(raw.to_string()))
}
