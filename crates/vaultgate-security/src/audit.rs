// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Security audit log — append-only SQLite record of security-relevant events
// on this device (enrollments, revocations, violations, integrity mismatches).
//
// Schema:
//   security_audit(
//     id        INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp TEXT    NOT NULL,   -- RFC 3339
//     action    TEXT    NOT NULL,   -- see the `actions` module
//     subject   TEXT    NOT NULL,   -- user id or document id
//     success   INTEGER NOT NULL,   -- 0 = failure, 1 = success
//     details   TEXT                -- optional free-form context
//   )

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use vaultgate_core::error::{GatewayError, Result};

/// Action names written to the log.
pub mod actions {
    pub const BIOMETRIC_ENROLLED: &str = "biometric_enrolled";
    pub const BIOMETRIC_REVOKED: &str = "biometric_revoked";
    pub const BIOMETRIC_DISABLED: &str = "biometric_disabled";
    pub const SECURITY_VIOLATION: &str = "security_violation";
    pub const INTEGRITY_MISMATCH: &str = "integrity_mismatch";
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS security_audit (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT    NOT NULL,
    action    TEXT    NOT NULL,
    subject   TEXT    NOT NULL,
    success   INTEGER NOT NULL,
    details   TEXT
);";

fn db_err(e: rusqlite::Error) -> GatewayError {
    GatewayError::Database(e.to_string())
}

/// One row of the local security log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub subject: String,
    pub success: bool,
    pub details: Option<String>,
}

impl SecurityEvent {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            action: row.get(2)?,
            subject: row.get(3)?,
            success: row.get::<_, i32>(4)? != 0,
            details: row.get(5)?,
        })
    }
}

/// Append-only audit log backed by a SQLite database.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `path`, in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;").map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!("in-memory audit log opened");
        Ok(Self { conn })
    }

    /// Append one event.
    #[instrument(skip(self, details), fields(%action, %subject, success))]
    pub fn record(
        &self,
        action: &str,
        subject: &str,
        success: bool,
        details: Option<&str>,
    ) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO security_audit (timestamp, action, subject, success, details)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![timestamp, action, subject, success as i32, details],
            )
            .map_err(db_err)?;

        debug!("audit entry recorded");
        Ok(())
    }

    /// All events for `subject`, oldest first.
    pub fn entries_for_subject(&self, subject: &str) -> Result<Vec<SecurityEvent>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, action, subject, success, details
                 FROM security_audit
                 WHERE subject = ?1
                 ORDER BY id ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![subject], SecurityEvent::from_row)
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// The most recent `limit` events, newest first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<SecurityEvent>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, action, subject, success, details
                 FROM security_audit
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![limit], SecurityEvent::from_row)
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Total number of events.
    pub fn count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM security_audit", [], |row| row.get(0))
            .map_err(db_err)
    }
}

/// Shared handle to an optional audit log.
///
/// Recording never fails the caller: a write error is logged and dropped so
/// the security outcome of the surrounding operation is never masked.
#[derive(Clone, Default)]
pub struct SharedAuditLog {
    inner: Option<Arc<Mutex<AuditLog>>>,
}

impl SharedAuditLog {
    pub fn new(log: AuditLog) -> Self {
        Self {
            inner: Some(Arc::new(Mutex::new(log))),
        }
    }

    /// A handle that records nothing.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn record(&self, action: &str, subject: &str, success: bool, details: Option<&str>) {
        let Some(log) = &self.inner else {
            return;
        };
        let log = log.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = log.record(action, subject, success, details) {
            error!(%action, %subject, "failed to write audit entry: {e}");
        }
    }

    /// Run `f` against the log, if there is one.
    pub fn with_log<T>(&self, f: impl FnOnce(&AuditLog) -> Result<T>) -> Option<Result<T>> {
        self.inner.as_ref().map(|log| {
            let log = log.lock().unwrap_or_else(PoisonError::into_inner);
            f(&log)
        })
    }
}

#[cfg(test)]
impl AuditLog {
    /// Drop the table so every later write fails.
    pub(crate) fn drop_table(&self) -> Result<()> {
        self.conn
            .execute_batch("DROP TABLE security_audit;")
            .map_err(db_err)
    }
}
