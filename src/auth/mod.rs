//! Credential & session gate: secret verification, stateless signed
//! session credentials, login lockout and the provisioning password rule.

pub mod clock;
pub mod gate;
pub mod lockout;
pub mod policy;
pub mod token;

pub use clock::*;
pub use gate::*;
pub use lockout::*;
pub use policy::*;
pub use token::*;

use serde::Serialize;
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::db::DatabaseError;
use crate::models::enums::Role;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown identifier, inactive account or wrong secret. Deliberately
    /// one variant so callers cannot tell which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Session expired")]
    Expired,

    #[error("Session credential failed signature check")]
    Forged,

    #[error("Too many failed attempts, retry in {retry_after}s")]
    LockedOut { retry_after: u64 },

    #[error("Secret does not meet policy: {0}")]
    WeakSecret(String),

    #[error("Signing key unusable")]
    SigningKey,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Identity carried by a valid session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountContext {
    pub identifier: String,
    pub role: Role,
}

impl AccountContext {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
