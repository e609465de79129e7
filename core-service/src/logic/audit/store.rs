//! Audit Log Store - append-only SQLite table
//!
//! Schema tự migrate: column khai báo nhưng thiếu trong store cũ được
//! `ALTER TABLE ADD COLUMN`, rows cũ đọc ra null.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use serde::Serialize;

use super::entry::LogEntry;
use super::query::{recent_window_start, LogFilter, LogStatistics};
use crate::constants::{LOG_APPEND_ATTEMPTS, LOG_APPEND_BACKOFF_MS};
use crate::error::{PipelineError, PipelineResult};
use crate::logic::decision::Severity;
use crate::logic::observation::Domain;

pub const TABLE: &str = "anomaly_log";

/// Declared column superset (name, SQL type), in insert order
pub const COLUMNS: [(&str, &str); 18] = [
    ("domain", "TEXT"),
    ("source_ip", "TEXT"),
    ("destination_ip", "TEXT"),
    ("protocol", "TEXT"),
    ("port_number", "INTEGER"),
    ("bytes", "REAL"),
    ("packets", "INTEGER"),
    ("process", "TEXT"),
    ("sender", "TEXT"),
    ("recipient", "TEXT"),
    ("observed_at", "TEXT"),
    ("anomaly_score", "REAL"),
    ("is_anomaly", "INTEGER"),
    ("threat_class", "TEXT"),
    ("confidence", "REAL"),
    ("severity", "TEXT"),
    ("details", "TEXT"),
    ("timestamp", "TEXT"),
];

/// Result of `entries()`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogListing {
    Empty,
    Rows(Vec<LogEntry>),
}

impl LogListing {
    pub fn len(&self) -> usize {
        match self {
            LogListing::Empty => 0,
            LogListing::Rows(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_rows(self) -> Vec<LogEntry> {
        match self {
            LogListing::Empty => Vec::new(),
            LogListing::Rows(rows) => rows,
        }
    }
}

pub struct AuditLog {
    conn: Mutex<Connection>,
}

impl AuditLog {
    /// Open or create the log at `path`
    pub fn open(path: &Path) -> PipelineResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(250))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> PipelineResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> PipelineResult<Self> {
        initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Append one row, retrying transient failures. Returns the row id.
    pub fn append(&self, entry: &LogEntry) -> PipelineResult<i64> {
        with_retry(|| {
            let conn = self.conn.lock();
            insert(&conn, entry)?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Append rows in one transaction
    pub fn append_all(&self, entries: &[LogEntry]) -> PipelineResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        with_retry(|| {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;
            for entry in entries {
                insert(&tx, entry)?;
            }
            tx.commit()?;
            Ok(entries.len())
        })
    }

    /// All rows, oldest first
    pub fn entries(&self) -> PipelineResult<LogListing> {
        self.query(&LogFilter::default())
    }

    /// Rows matching `filter`, oldest first
    pub fn query(&self, filter: &LogFilter) -> PipelineResult<LogListing> {
        let conn = self.conn.lock();
        let columns: Vec<&str> = COLUMNS.iter().map(|(name, _)| *name).collect();
        let (clause, values) = filter.where_clause();
        let sql = format!(
            "SELECT id, {} FROM {}{} ORDER BY id ASC",
            columns.join(", "),
            TABLE,
            clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            Ok(LogListing::Empty)
        } else {
            Ok(LogListing::Rows(rows))
        }
    }

    /// Totals, severity / threat distributions of anomalous rows, and the
    /// number of anomalies logged in the 24 hours before `now`
    pub fn statistics(&self, now: DateTime<Utc>) -> PipelineResult<LogStatistics> {
        let conn = self.conn.lock();

        let total_logs: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", TABLE), [], |row| row.get(0))?;

        // Timestamps are parsed here: old rows may use other RFC3339 spellings
        let since = recent_window_start(now);
        let mut stmt = conn.prepare(&format!("SELECT timestamp FROM {} WHERE is_anomaly = 1", TABLE))?;
        let stamps = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let total_anomalies = stamps.len();
        let recent = stamps
            .into_iter()
            .filter_map(parse_time)
            .filter(|t| *t >= since && *t <= now)
            .count();

        Ok(LogStatistics {
            total_logs: total_logs.max(0) as usize,
            total_anomalies,
            severity_distribution: distribution(&conn, "severity")?,
            threat_distribution: distribution(&conn, "threat_class")?,
            recent_anomalies_24h: recent,
        })
    }

    pub fn count(&self) -> PipelineResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", TABLE), [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

fn initialize(conn: &Connection) -> PipelineResult<()> {
    let declared: Vec<String> = COLUMNS
        .iter()
        .map(|(name, ty)| format!("{} {}", name, ty))
        .collect();

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                {}
            )",
            TABLE,
            declared.join(",\n                ")
        ),
        [],
    )?;

    let existing = existing_columns(conn)?;
    for (name, ty) in COLUMNS {
        if !existing.iter().any(|c| c == name) {
            log::info!("Adding missing column '{}' to {}", name, TABLE);
            conn.execute(&format!("ALTER TABLE {} ADD COLUMN {} {}", TABLE, name, ty), [])?;
        }
    }

    Ok(())
}

/// Anomalous row counts grouped by `column` (nulls skipped)
fn distribution(conn: &Connection, column: &str) -> PipelineResult<BTreeMap<String, usize>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {col}, COUNT(*) FROM {table} WHERE is_anomaly = 1 AND {col} IS NOT NULL GROUP BY {col}",
        col = column,
        table = TABLE
    ))?;

    let pairs = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(pairs
        .into_iter()
        .map(|(key, count)| (key, count.max(0) as usize))
        .collect())
}

fn existing_columns(conn: &Connection) -> PipelineResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", TABLE))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn insert(conn: &Connection, entry: &LogEntry) -> rusqlite::Result<usize> {
    let columns: Vec<&str> = COLUMNS.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<String> = (1..=COLUMNS.len()).map(|i| format!("?{}", i)).collect();

    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES ({})",
            TABLE,
            columns.join(", "),
            placeholders.join(", ")
        ),
        params![
            entry.domain.map(|d| d.as_str()),
            entry.source_ip,
            entry.destination_ip,
            entry.protocol,
            entry.port_number,
            entry.bytes,
            entry.packets,
            entry.process,
            entry.sender,
            entry.recipient,
            entry.observed_at.map(|t| t.to_rfc3339()),
            entry.anomaly_score,
            entry.is_anomaly,
            entry.threat_class,
            entry.confidence,
            entry.severity.map(|s| s.as_str()),
            entry.details,
            entry.timestamp.map(|t| t.to_rfc3339()),
        ],
    )
}

fn parse_time(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn parse_domain(value: Option<String>) -> Option<Domain> {
    match value.as_deref() {
        Some("network") => Some(Domain::Network),
        Some("email") => Some(Domain::Email),
        _ => None,
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get("id")?,
        domain: parse_domain(row.get("domain")?),
        source_ip: row.get("source_ip")?,
        destination_ip: row.get("destination_ip")?,
        protocol: row.get("protocol")?,
        port_number: row.get("port_number")?,
        bytes: row.get("bytes")?,
        packets: row.get("packets")?,
        process: row.get("process")?,
        sender: row.get("sender")?,
        recipient: row.get("recipient")?,
        observed_at: parse_time(row.get("observed_at")?),
        anomaly_score: row.get("anomaly_score")?,
        is_anomaly: row.get("is_anomaly")?,
        threat_class: row.get("threat_class")?,
        confidence: row.get("confidence")?,
        severity: row
            .get::<_, Option<String>>("severity")?
            .as_deref()
            .and_then(Severity::parse),
        details: row.get("details")?,
        timestamp: parse_time(row.get("timestamp")?),
    })
}

// ============================================================================
// RETRY
// ============================================================================

fn is_transient(err: &PipelineError) -> bool {
    match err {
        PipelineError::Storage(rusqlite::Error::SqliteFailure(e, _)) => {
            matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        }
        _ => false,
    }
}

fn with_retry<T>(mut op: impl FnMut() -> PipelineResult<T>) -> PipelineResult<T> {
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < LOG_APPEND_ATTEMPTS && is_transient(&e) => {
                log::warn!("Log append attempt {} failed ({}), retrying", attempt, e);
                std::thread::sleep(Duration::from_millis(LOG_APPEND_BACKOFF_MS * attempt as u64));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
