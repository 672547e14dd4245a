//! Append-only audit trail.
//!
//! Recording never fails from the caller's point of view: a sink error is
//! logged, counted and dropped so it can never replace the outcome of the
//! request being audited.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::db::{self, DatabaseError};
use crate::models::{AuditEntry, AuditRecord};

/// Default retention for `prune_audit_log`.
pub const AUDIT_RETENTION_DAYS: i64 = 365;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit storage error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;
    fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>, AuditError>;
}

/// Writes to the `audit_log` table, one short-lived connection per call.
pub struct SqliteAuditSink {
    db_path: PathBuf,
}

impl SqliteAuditSink {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

impl AuditSink for SqliteAuditSink {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let conn = db::open_database(&self.db_path)?;
        db::insert_audit_entry(&conn, entry)?;
        Ok(())
    }

    fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>, AuditError> {
        let conn = db::open_database(&self.db_path)?;
        Ok(db::recent_audit_entries(&conn, limit)?)
    }
}

pub struct AuditLogger {
    sink: Box<dyn AuditSink>,
    failures: AtomicU64,
}

impl AuditLogger {
    pub fn new(sink: Box<dyn AuditSink>) -> Self {
        Self {
            sink,
            failures: AtomicU64::new(0),
        }
    }

    /// Append an entry. Sink failures are swallowed here.
    pub fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.sink.append(&entry) {
            let total = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::error!(
                error = %e,
                action = %entry.action,
                resource_type = %entry.resource_type,
                failures = total,
                "Audit write failed"
            );
        }
    }

    pub fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>, AuditError> {
        self.sink.recent(limit)
    }

    /// Number of entries lost to sink failures since startup.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::AuditOutcome;
    use chrono::Utc;

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn append(&self, _entry: &AuditEntry) -> Result<(), AuditError> {
            Err(AuditError::Unavailable("disk full".into()))
        }

        fn recent(&self, _limit: u32) -> Result<Vec<AuditRecord>, AuditError> {
            Err(AuditError::Unavailable("disk full".into()))
        }
    }

    fn entry(action: &str) -> AuditEntry {
        AuditEntry::new(Utc::now(), "alice", action, "patient", AuditOutcome::Success)
            .with_resource("p-1")
            .with_client(Some("10.0.0.7".into()))
    }

    #[test]
    fn sqlite_sink_appends_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(Box::new(SqliteAuditSink::new(dir.path().join("audit.db"))));

        logger.record(entry("create"));
        logger.record(entry("update"));

        let recent = logger.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].entry.action, "update");
        assert_eq!(recent[0].entry.resource_id.as_deref(), Some("p-1"));
        assert_eq!(recent[0].entry.client_addr.as_deref(), Some("10.0.0.7"));
        assert_eq!(logger.failure_count(), 0);
    }

    #[test]
    fn sink_failure_is_swallowed_and_counted() {
        let logger = AuditLogger::new(Box::new(FailingSink));
        logger.record(entry("create"));
        logger.record(entry("delete"));
        assert_eq!(logger.failure_count(), 2);
    }

    #[test]
    fn unreachable_database_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let logger = AuditLogger::new(Box::new(SqliteAuditSink::new(dir.path().to_path_buf())));
        logger.record(entry("create"));
        assert_eq!(logger.failure_count(), 1);
    }
}
