//! Sensitive-field codec: encrypt-on-write, decrypt-on-read for the
//! patient attributes listed in [`SensitiveField::ALL`].

use super::encryption::Envelope;
use super::keys::FieldKey;
use super::CryptoError;
use crate::models::{ProtectedFields, SensitiveField, SensitiveFields};

/// Holds the process-wide field key. Built once at startup and shared
/// through `CoreState`; never read from a global.
#[derive(Debug)]
pub struct FieldCodec {
    key: FieldKey,
}

impl FieldCodec {
    pub fn new(key: FieldKey) -> Self {
        Self { key }
    }

    /// Encrypt one value. Empty input yields `None`: emptiness is stored
    /// as absence, never as an encrypted empty string.
    pub fn protect(&self, plaintext: &str) -> Result<Option<Envelope>, CryptoError> {
        if plaintext.is_empty() {
            return Ok(None);
        }
        Envelope::seal(self.key.as_bytes(), plaintext.as_bytes()).map(Some)
    }

    /// Decrypt one envelope to its exact original string.
    pub fn reveal(&self, envelope: &Envelope) -> Result<String, CryptoError> {
        let bytes = envelope.open(self.key.as_bytes())?;
        String::from_utf8(bytes).map_err(|_| CryptoError::IntegrityViolation)
    }

    /// Decode a stored envelope and reveal it.
    pub fn reveal_stored(&self, stored: &str) -> Result<String, CryptoError> {
        self.reveal(&Envelope::decode(stored)?)
    }

    /// Protect every sensitive attribute, producing the stored text form.
    pub fn protect_fields(&self, fields: &SensitiveFields) -> Result<ProtectedFields, CryptoError> {
        let mut protected = ProtectedFields::default();
        for field in SensitiveField::ALL {
            let envelope = match fields.get(field) {
                Some(value) => self.protect(value)?,
                None => None,
            };
            protected.set(field, envelope.map(|e| e.encode()));
        }
        Ok(protected)
    }

    /// Reveal every stored sensitive attribute. Fails as a whole if any
    /// single envelope fails authentication.
    pub fn reveal_fields(&self, protected: &ProtectedFields) -> Result<SensitiveFields, CryptoError> {
        let mut fields = SensitiveFields::default();
        for field in SensitiveField::ALL {
            let value = match protected.get(field) {
                Some(stored) => Some(self.reveal_stored(stored).map_err(|e| {
                    tracing::warn!(column = field.column(), "Stored envelope failed authentication");
                    e
                })?),
                None => None,
            };
            fields.set(field, value);
        }
        Ok(fields)
    }
}
