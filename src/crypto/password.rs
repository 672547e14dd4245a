//! Salted account secret hashing.
//!
//! Format: `pbkdf2_sha256$<iterations>$<salt b64>$<hash b64>`. The iteration
//! count travels with the hash so it can be raised without invalidating
//! existing accounts.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::CryptoError;

const SCHEME: &str = "pbkdf2_sha256";
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

#[cfg(not(test))]
pub const SECRET_HASH_ITERATIONS: u32 = 600_000;
#[cfg(test)]
pub const SECRET_HASH_ITERATIONS: u32 = 1_000;

/// Hash a secret under a fresh random salt.
pub fn hash_secret(secret: &str) -> String {
    hash_secret_with_iterations(secret, SECRET_HASH_ITERATIONS)
}

pub fn hash_secret_with_iterations(secret: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);

    let hash = derive(secret, &salt, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash.as_slice()),
    )
}

/// Check a secret against a stored hash in constant time.
///
/// `Err(MalformedSecretHash)` only when the stored value itself is unusable;
/// a wrong secret is `Ok(false)`.
pub fn verify_secret(secret: &str, stored: &str) -> Result<bool, CryptoError> {
    let parsed = ParsedHash::parse(stored)?;
    let candidate = derive(secret, &parsed.salt, parsed.iterations);
    Ok(candidate.as_slice().ct_eq(&parsed.hash).into())
}

fn derive(secret: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; HASH_LENGTH]> {
    let mut out = Zeroizing::new([0u8; HASH_LENGTH]);
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, iterations, &mut *out);
    out
}

struct ParsedHash {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl ParsedHash {
    fn parse(stored: &str) -> Result<Self, CryptoError> {
        let mut parts = stored.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(CryptoError::MalformedSecretHash);
        };

        if scheme != SCHEME {
            return Err(CryptoError::MalformedSecretHash);
        }
        let iterations: u32 = iterations
            .parse()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(CryptoError::MalformedSecretHash)?;
        let salt = STANDARD_NO_PAD
            .decode(salt)
            .map_err(|_| CryptoError::MalformedSecretHash)?;
        let hash = STANDARD_NO_PAD
            .decode(hash)
            .map_err(|_| CryptoError::MalformedSecretHash)?;
        if hash.len() != HASH_LENGTH {
            return Err(CryptoError::MalformedSecretHash);
        }

        Ok(Self {
            iterations,
            salt,
            hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_secret_verifies() {
        let stored = hash_secret("Sx9!aB2k");
        assert!(verify_secret("Sx9!aB2k", &stored).unwrap());
    }

    #[test]
    fn wrong_secret_does_not_verify() {
        let stored = hash_secret("Sx9!aB2k");
        assert!(!verify_secret("wrong", &stored).unwrap());
        assert!(!verify_secret("Sx9!aB2K", &stored).unwrap());
        assert!(!verify_secret("", &stored).unwrap());
    }

    #[test]
    fn same_secret_hashes_differently() {
        let h1 = hash_secret("Sx9!aB2k");
        let h2 = hash_secret("Sx9!aB2k");
        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_is_self_describing() {
        let stored = hash_secret_with_iterations("Sx9!aB2k", 1234);
        let parts: Vec<_> = stored.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "pbkdf2_sha256");
        assert_eq!(parts[1], "1234");
        assert!(verify_secret("Sx9!aB2k", &stored).unwrap());
    }

    #[test]
    fn hash_does_not_contain_secret() {
        let stored = hash_secret("Sx9!aB2k");
        assert!(!stored.contains("Sx9!aB2k"));
    }

    #[test]
    fn malformed_hashes_are_rejected() {
        for stored in [
            "",
            "plaintext",
            "bcrypt$10$abc$def",
            "pbkdf2_sha256$0$AAAA$AAAA",
            "pbkdf2_sha256$abc$AAAA$AAAA",
            "pbkdf2_sha256$1000$!!!$AAAA",
            "pbkdf2_sha256$1000$AAAA$AAAA",
            "pbkdf2_sha256$1000$AAAA$AAAA$extra",
        ] {
            assert!(
                matches!(verify_secret("x", stored), Err(CryptoError::MalformedSecretHash)),
                "accepted {stored:?}"
            );
        }
    }
}
