use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::StoreError;
use crate::models::CheckResult;
#[cfg(test)]
use crate::models::LogRow;

/// Append-only sink for check results.
pub trait ResultLog: Send + Sync {
    /// Appends one row and returns its assigned id.
    fn append(&self, result: &CheckResult) -> Result<i64, StoreError>;
}

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS site_availability_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
        site_url TEXT NOT NULL,
        status_code INTEGER,
        response_time_ms INTEGER,
        is_online BOOLEAN NOT NULL
    )";

pub struct SqliteLog {
    conn: Mutex<Connection>,
}

impl SqliteLog {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(StoreError::sql("open"))?;
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::sql("open"))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(CREATE_TABLE, []).map_err(StoreError::sql("create table"))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// All rows in insertion order.
    #[cfg(test)]
    pub fn rows(&self) -> Result<Vec<LogRow>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, site_url, status_code, response_time_ms, is_online
                 FROM site_availability_logs ORDER BY id",
            )
            .map_err(StoreError::sql("prepare select"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LogRow {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    site_url: row.get(2)?,
                    status_code: row.get(3)?,
                    response_time_ms: row.get::<_, Option<i64>>(4)?.map(|ms| ms as u64),
                    is_online: row.get(5)?,
                })
            })
            .map_err(StoreError::sql("select"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::sql("read row"))?;
        Ok(rows)
    }
}

impl ResultLog for SqliteLog {
    fn append(&self, result: &CheckResult) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO site_availability_logs (site_url, status_code, is_online, response_time_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                result.url,
                result.status_code,
                result.is_online,
                result.response_time_ms.map(|ms| ms as i64),
            ],
        )
        .map_err(StoreError::sql("insert"))?;
        let id = conn.last_insert_rowid();
        debug!(id, url = %result.url, "Logged check result");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str, status_code: Option<u16>, response_time_ms: Option<u64>) -> CheckResult {
        CheckResult {
            url: url.into(),
            status_code,
            is_online: status_code.is_some_and(|c| (200..300).contains(&c)),
            response_time_ms,
        }
    }

    #[test]
    fn append_assigns_increasing_ids() {
        let log = SqliteLog::in_memory().unwrap();
        let first = log.append(&result("https://a.example", Some(200), Some(40))).unwrap();
        let second = log.append(&result("https://b.example", Some(500), Some(12))).unwrap();
        let third = log.append(&result("https://a.example", None, None)).unwrap();
        assert!(first < second && second < third);

        let rows = log.rows().unwrap();
        let urls: Vec<_> = rows.iter().map(|r| r.site_url.as_str()).collect();
        assert_eq!(urls, ["https://a.example", "https://b.example", "https://a.example"]);
    }

    #[test]
    fn transport_failures_store_nulls() {
        let log = SqliteLog::in_memory().unwrap();
        log.append(&result("https://down.example", None, None)).unwrap();

        let rows = log.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status_code, None);
        assert_eq!(rows[0].response_time_ms, None);
        assert!(!rows[0].is_online);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site_monitor.db");

        SqliteLog::open(&path)
            .unwrap()
            .append(&result("https://ok.example", Some(204), Some(8)))
            .unwrap();

        let reopened = SqliteLog::open(&path).unwrap();
        reopened.append(&result("https://ok.example", Some(200), Some(9))).unwrap();
        let rows = reopened.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status_code, Some(204));
        assert_eq!(rows[1].response_time_ms, Some(9));
        assert!(rows.iter().all(|r| r.is_online));
    }
}
