use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use zeroize::Zeroize;

#[cfg(not(test))]
pub const FIELD_KEY_ITERATIONS: u32 = 100_000;
// Tests derive many keys; correctness does not depend on the work factor.
#[cfg(test)]
pub const FIELD_KEY_ITERATIONS: u32 = 1_000;

pub const KEY_LENGTH: usize = 32; // AES-256

/// Process-wide field encryption key, zeroed on drop.
///
/// Derived once at startup from the configured passphrase and salt.
/// There is no rotation path: rows written under one key can only be
/// read back under the same passphrase/salt pair.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct FieldKey {
    key_bytes: [u8; KEY_LENGTH],
}

impl FieldKey {
    /// Derive from passphrase + salt using PBKDF2-HMAC-SHA512.
    pub fn derive(passphrase: &str, salt: &[u8]) -> Self {
        Self::derive_with_iterations(passphrase, salt, FIELD_KEY_ITERATIONS)
    }

    pub fn derive_with_iterations(passphrase: &str, salt: &[u8], iterations: u32) -> Self {
        let mut key_bytes = [0u8; KEY_LENGTH];
        pbkdf2_hmac::<Sha512>(passphrase.as_bytes(), salt, iterations, &mut key_bytes);
        Self { key_bytes }
    }

    /// Access the raw key bytes (internal use only)
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key_bytes
    }
}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldKey([redacted])")
    }
}
