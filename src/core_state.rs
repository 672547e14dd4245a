//! Process-wide application state.
//!
//! Built once at startup from `Config` and shared behind an `Arc` by every
//! request. Holds the field codec (and with it the field key), the session
//! gate and the audit logger. Nothing here is a global.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::RngCore;
use thiserror::Error;

use crate::audit::{AuditLogger, AuditSink, SqliteAuditSink, AUDIT_RETENTION_DAYS};
use crate::auth::{AuthError, Clock, SessionGate, SystemClock, TokenSigner};
use crate::config::Config;
use crate::crypto::{FieldCodec, FieldKey};
use crate::db::{self, DatabaseError};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    db_path: PathBuf,
    codec: FieldCodec,
    gate: SessionGate,
    audit: AuditLogger,
}

impl CoreState {
    /// Wire the state from configuration, deriving the field key once.
    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        let key = FieldKey::derive(&config.field_passphrase, config.field_salt.as_bytes());

        let signer = match &config.token_secret {
            Some(secret) => TokenSigner::new(secret.as_bytes())?,
            None => {
                tracing::warn!("No token secret configured; sessions end when the process exits");
                let mut secret = zeroize::Zeroizing::new([0u8; 32]);
                rand::rngs::OsRng.fill_bytes(&mut *secret);
                TokenSigner::new(&*secret)?
            }
        };

        let state = Self::new(
            config.db_path.clone(),
            FieldCodec::new(key),
            SessionGate::new(signer, Arc::new(SystemClock)),
            Box::new(SqliteAuditSink::new(config.db_path.clone())),
        );
        // Create the schema up front so the first request does not race it.
        state.open_db()?;
        Ok(state)
    }

    pub fn new(
        db_path: PathBuf,
        codec: FieldCodec,
        gate: SessionGate,
        sink: Box<dyn AuditSink>,
    ) -> Self {
        Self {
            db_path,
            codec,
            gate,
            audit: AuditLogger::new(sink),
        }
    }

    /// Open a database connection. One per request; SQLite serializes writers.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        if let Some(parent) = self.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::Storage(e.to_string()))?;
        }
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn codec(&self) -> &FieldCodec {
        &self.codec
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub fn clock(&self) -> &dyn Clock {
        self.gate.clock()
    }

    /// Drop audit entries past the retention window. Returns how many went.
    pub fn prune_audit(&self) -> Result<usize, CoreError> {
        let conn = self.open_db()?;
        let now = self.clock().now();
        Ok(db::prune_audit_log(&conn, AUDIT_RETENTION_DAYS, &now)?)
    }

    /// Provision the configured admin if the accounts table is empty.
    pub fn bootstrap(&self, config: &Config) -> Result<(), CoreError> {
        let Some((identifier, secret)) = &config.bootstrap_admin else {
            return Ok(());
        };
        let conn = self.open_db()?;
        if self.gate.bootstrap_admin(&conn, identifier, secret)? {
            tracing::info!("Bootstrap admin account provisioned");
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}
