//! Stateless session credential: `base64url(claims).base64url(hmac)`.
//!
//! Validity is a function of the signature and the expiry only. There is
//! no server-side session table, so a credential cannot be revoked before
//! it expires.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::{AccountContext, AuthError};
use crate::models::enums::Role;

type HmacSha256 = Hmac<Sha256>;

/// Credentials live for 8 hours and are never renewed implicitly.
pub const SESSION_TTL_HOURS: i64 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly minted credential.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenSigner {
    mac: HmacSha256,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Result<Self, AuthError> {
        Self::with_ttl(secret, Duration::hours(SESSION_TTL_HOURS))
    }

    pub fn with_ttl(secret: &[u8], ttl: Duration) -> Result<Self, AuthError> {
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| AuthError::SigningKey)?;
        Ok(Self { mac, ttl })
    }

    pub fn mint(&self, identifier: &str, role: Role, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: identifier.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let json = serde_json::to_vec(&claims).map_err(|_| AuthError::SigningKey)?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes()));
        Ok(IssuedToken {
            token: format!("{payload}.{signature}"),
            expires_at,
        })
    }

    /// Signature first, then expiry: a forged credential is rejected as
    /// forged whatever its claimed expiry.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AccountContext, AuthError> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError::Unauthenticated)?;
        if payload.is_empty() || signature.contains('.') {
            return Err(AuthError::Unauthenticated);
        }
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::Unauthenticated)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| AuthError::Forged)?;

        let claims: Claims = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(AuthError::Unauthenticated)?;

        if now.timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }
        Ok(AccountContext {
            identifier: claims.sub,
            role: claims.role,
        })
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}
