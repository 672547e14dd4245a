use std::sync::Arc;

use rusqlite::Connection;
use uuid::Uuid;

use super::clock::Clock;
use super::lockout::AuthLockout;
use super::policy::check_secret_strength;
use super::token::{IssuedToken, TokenSigner};
use super::{AccountContext, AuthError};
use crate::crypto::{hash_secret, verify_secret};
use crate::db;
use crate::models::enums::Role;
use crate::models::{Account, AccountSummary};

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub issued: IssuedToken,
    pub account: AccountSummary,
}

pub struct SessionGate {
    signer: TokenSigner,
    lockout: AuthLockout,
    clock: Arc<dyn Clock>,
    /// Verified against when the identifier is unknown, so that path costs
    /// the same as a wrong secret.
    dummy_hash: String,
}

impl SessionGate {
    pub fn new(signer: TokenSigner, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer,
            lockout: AuthLockout::new(),
            clock,
            dummy_hash: hash_secret(&Uuid::new_v4().to_string()),
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Verify identifier + secret and mint a session credential.
    pub fn authenticate(
        &self,
        conn: &Connection,
        identifier: &str,
        secret: &str,
    ) -> Result<Session, AuthError> {
        let now = self.clock.now();
        self.lockout
            .check(identifier, now)
            .map_err(|retry_after| AuthError::LockedOut { retry_after })?;

        let account = db::get_account_by_identifier(conn, identifier)?;
        let verified = match &account {
            Some(account) => verify_secret(secret, &account.secret_hash)? && account.is_active,
            None => {
                verify_secret(secret, &self.dummy_hash)?;
                false
            }
        };

        let account = match account {
            Some(account) if verified => account,
            _ => {
                if let Some(until) = self.lockout.record_failure(identifier, now) {
                    tracing::warn!(locked_until = %until, "Login locked after repeated failures");
                }
                return Err(AuthError::InvalidCredentials);
            }
        };

        self.lockout.record_success(identifier);
        db::record_login(conn, identifier, &now)?;
        let issued = self.signer.mint(&account.identifier, account.role, now)?;
        tracing::info!(account_id = %account.id, "Login succeeded");

        Ok(Session {
            issued,
            account: AccountSummary::from(&account),
        })
    }

    /// Check a presented credential. Pure: touches no storage.
    pub fn validate(&self, credential: Option<&str>) -> Result<AccountContext, AuthError> {
        let credential = credential
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::Unauthenticated)?;
        self.signer.verify(credential, self.clock.now())
    }

    /// Create an account after enforcing the secret policy.
    pub fn provision(
        &self,
        conn: &Connection,
        identifier: &str,
        secret: &str,
        display_name: &str,
        role: Role,
    ) -> Result<Account, AuthError> {
        check_secret_strength(secret)?;
        let account = Account {
            id: Uuid::new_v4(),
            identifier: identifier.to_string(),
            secret_hash: hash_secret(secret),
            display_name: display_name.to_string(),
            role,
            is_active: true,
            last_login: None,
            created_at: self.clock.now(),
        };
        db::insert_account(conn, &account)?;
        tracing::info!(account_id = %account.id, role = %role, "Account provisioned");
        Ok(account)
    }

    /// Provision the first admin when no account exists yet.
    /// Returns whether an account was created.
    pub fn bootstrap_admin(
        &self,
        conn: &Connection,
        identifier: &str,
        secret: &str,
    ) -> Result<bool, AuthError> {
        if db::count_accounts(conn)? > 0 {
            return Ok(false);
        }
        self.provision(conn, identifier, secret, "Administrator", Role::Admin)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::crypto::{CryptoError, FieldCodec, FieldKey};
    use crate::db::sqlite::open_memory_database;
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (SessionGate, Arc<ManualClock>, Connection) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
        ));
        let signer = TokenSigner::new(b"gate-test-secret").unwrap();
        let gate = SessionGate::new(signer, clock.clone());
        let conn = open_memory_database().unwrap();
        (gate, clock, conn)
    }

    #[test]
    fn end_to_end_login_validate_and_field_protection() {
        let (gate, _clock, conn) = setup();
        gate.provision(&conn, "alice", "Sx9!aB2k", "Alice Costa", Role::Psychologist)
            .unwrap();

        let session = gate.authenticate(&conn, "alice", "Sx9!aB2k").unwrap();
        let ctx = gate.validate(Some(&session.issued.token)).unwrap();
        assert_eq!(ctx.identifier, "alice");
        assert_eq!(ctx.role, Role::Psychologist);

        let codec = FieldCodec::new(FieldKey::derive("clinic passphrase", b"clinic-salt"));
        let envelope = codec.protect("555-1234").unwrap().unwrap();
        assert_eq!(codec.reveal(&envelope).unwrap(), "555-1234");

        let mut tampered = envelope.clone();
        tampered.tag[0] ^= 0x01;
        assert!(matches!(
            codec.reveal(&tampered),
            Err(CryptoError::IntegrityViolation)
        ));

        assert!(matches!(
            gate.authenticate(&conn, "alice", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn login_stamps_last_login() {
        let (gate, clock, conn) = setup();
        gate.provision(&conn, "alice", "Sx9!aB2k", "Alice", Role::Admin).unwrap();
        gate.authenticate(&conn, "alice", "Sx9!aB2k").unwrap();
        let account = db::get_account_by_identifier(&conn, "alice").unwrap().unwrap();
        assert_eq!(account.last_login, Some(clock.now()));
    }

    #[test]
    fn unknown_identifier_fails_like_wrong_secret() {
        let (gate, _clock, conn) = setup();
        gate.provision(&conn, "alice", "Sx9!aB2k", "Alice", Role::Admin).unwrap();

        let wrong = gate.authenticate(&conn, "alice", "nope").unwrap_err();
        let unknown = gate.authenticate(&conn, "mallory", "nope").unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn inactive_account_cannot_log_in() {
        let (gate, _clock, conn) = setup();
        gate.provision(&conn, "alice", "Sx9!aB2k", "Alice", Role::Admin).unwrap();
        db::deactivate_account(&conn, "alice").unwrap();
        assert!(matches!(
            gate.authenticate(&conn, "alice", "Sx9!aB2k"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn credential_expires_after_eight_hours() {
        let (gate, clock, conn) = setup();
        gate.provision(&conn, "alice", "Sx9!aB2k", "Alice", Role::Admin).unwrap();
        let session = gate.authenticate(&conn, "alice", "Sx9!aB2k").unwrap();

        clock.advance(Duration::hours(8) - Duration::seconds(1));
        assert!(gate.validate(Some(&session.issued.token)).is_ok());

        clock.advance(Duration::seconds(1));
        assert!(matches!(
            gate.validate(Some(&session.issued.token)),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn missing_credential_is_unauthenticated() {
        let (gate, _clock, _conn) = setup();
        assert!(matches!(gate.validate(None), Err(AuthError::Unauthenticated)));
        assert!(matches!(gate.validate(Some("")), Err(AuthError::Unauthenticated)));
    }

    #[test]
    fn repeated_failures_lock_even_the_right_secret() {
        let (gate, clock, conn) = setup();
        gate.provision(&conn, "alice", "Sx9!aB2k", "Alice", Role::Admin).unwrap();
        for _ in 0..3 {
            let _ = gate.authenticate(&conn, "alice", "wrong");
        }
        assert!(matches!(
            gate.authenticate(&conn, "alice", "Sx9!aB2k"),
            Err(AuthError::LockedOut { retry_after: 900 })
        ));

        clock.advance(Duration::minutes(15));
        assert!(gate.authenticate(&conn, "alice", "Sx9!aB2k").is_ok());
    }

    #[test]
    fn lockout_applies_to_unknown_identifiers_too() {
        let (gate, _clock, conn) = setup();
        for _ in 0..3 {
            let _ = gate.authenticate(&conn, "mallory", "guess");
        }
        assert!(matches!(
            gate.authenticate(&conn, "mallory", "guess"),
            Err(AuthError::LockedOut { .. })
        ));
    }

    #[test]
    fn provision_rejects_weak_secret() {
        let (gate, _clock, conn) = setup();
        assert!(matches!(
            gate.provision(&conn, "bob", "password", "Bob", Role::Assistant),
            Err(AuthError::WeakSecret(_))
        ));
        assert_eq!(db::count_accounts(&conn).unwrap(), 0);
    }

    #[test]
    fn bootstrap_only_runs_on_empty_table() {
        let (gate, _clock, conn) = setup();
        assert!(gate.bootstrap_admin(&conn, "admin", "Adm1n!pass").unwrap());
        assert!(!gate.bootstrap_admin(&conn, "admin2", "Adm1n!pass").unwrap());

        let admin = db::get_account_by_identifier(&conn, "admin").unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(db::get_account_by_identifier(&conn, "admin2").unwrap().is_none());
    }
}
