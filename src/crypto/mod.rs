pub mod codec;
pub mod encryption;
pub mod keys;
pub mod password;
mod phi_audit;

pub use codec::*;
pub use encryption::*;
pub use keys::*;
pub use password::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Tag mismatch, tampered or unparseable envelope, or wrong key.
    /// Never accompanied by partial plaintext.
    #[error("Integrity violation: envelope failed authentication")]
    IntegrityViolation,

    #[error("Malformed secret hash")]
    MalformedSecretHash,
}
