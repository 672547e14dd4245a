use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce, Tag};
use serde::Deserialize;

use super::keys::KEY_LENGTH;
use super::CryptoError;

pub const IV_LENGTH: usize = 12;
pub const TAG_LENGTH: usize = 16;

/// One encrypted field value: IV + ciphertext + AES-GCM authentication tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub iv: [u8; IV_LENGTH],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LENGTH],
}

/// Stored text form: `{"iv":"<hex>","content":"<hex>","tag":"<hex>"}`.
#[derive(Deserialize)]
struct EnvelopeText {
    iv: String,
    content: String,
    tag: String,
}

impl Envelope {
    /// Encrypt plaintext using AES-256-GCM under a fresh random IV.
    ///
    /// `OsRng` is stateless, so concurrent callers never share IV state.
    pub(crate) fn seal(key_bytes: &[u8; KEY_LENGTH], plaintext: &[u8]) -> Result<Self, CryptoError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes));

        let mut iv = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut iv);

        let mut ciphertext = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut ciphertext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut tag_bytes = [0u8; TAG_LENGTH];
        tag_bytes.copy_from_slice(tag.as_slice());

        Ok(Self {
            iv,
            ciphertext,
            tag: tag_bytes,
        })
    }

    /// Decrypt and authenticate. On tag mismatch nothing is returned.
    pub(crate) fn open(&self, key_bytes: &[u8; KEY_LENGTH]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes));

        let mut buffer = self.ciphertext.clone();
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&self.iv),
                b"",
                &mut buffer,
                Tag::from_slice(&self.tag),
            )
            .map_err(|_| CryptoError::IntegrityViolation)?;
        Ok(buffer)
    }

    /// Encode for storage as a text column.
    pub fn encode(&self) -> String {
        serde_json::json!({
            "iv": hex::encode(self.iv),
            "content": hex::encode(&self.ciphertext),
            "tag": hex::encode(self.tag),
        })
        .to_string()
    }

    /// Parse a stored envelope. Anything unparseable is an integrity failure:
    /// a damaged envelope is indistinguishable from a tampered one.
    pub fn decode(text: &str) -> Result<Self, CryptoError> {
        let parsed: EnvelopeText =
            serde_json::from_str(text).map_err(|_| CryptoError::IntegrityViolation)?;

        let iv: [u8; IV_LENGTH] = hex::decode(&parsed.iv)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or(CryptoError::IntegrityViolation)?;
        let tag: [u8; TAG_LENGTH] = hex::decode(&parsed.tag)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or(CryptoError::IntegrityViolation)?;
        let ciphertext =
            hex::decode(&parsed.content).map_err(|_| CryptoError::IntegrityViolation)?;

        Ok(Self {
            iv,
            ciphertext,
            tag,
        })
    }
}
