//! Session endpoints.
//!
//! `POST /api/login` (unprotected): exchange identifier + secret for a credential
//! `GET /api/validate-token` (protected): echo the identity behind a credential

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{peer_or_forwarded, ApiContext, ApiJson};
use crate::auth::{AccountContext, AuthError};
use crate::models::enums::AuditOutcome;
use crate::models::{AccountSummary, AuditEntry};

const LOGIN_ACTION: &str = "POST /api/login";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AccountSummary,
}

/// `POST /api/login`: verify credentials and mint a session credential.
pub async fn login(
    State(ctx): State<ApiContext>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let client = peer_or_forwarded(connect.map(|ConnectInfo(addr)| addr), &headers);
    let now = ctx.core.clock().now();

    let (Some(identifier), Some(secret)) = (
        request.username.filter(|u| !u.trim().is_empty()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        ctx.core.audit().record(
            AuditEntry::new(now, "anonymous", LOGIN_ACTION, "session", AuditOutcome::Failure)
                .with_client(client),
        );
        return Err(ApiError::BadRequest("Username and password are required".into()));
    };
    let identifier = identifier.trim().to_string();

    let conn = ctx.core.open_db()?;
    let result = ctx.core.gate().authenticate(&conn, &identifier, &secret);

    let outcome = match &result {
        Ok(_) => AuditOutcome::Success,
        Err(AuthError::LockedOut { .. }) => AuditOutcome::Denied,
        Err(_) => AuditOutcome::Failure,
    };
    ctx.core.audit().record(
        AuditEntry::new(now, identifier.as_str(), LOGIN_ACTION, "session", outcome)
            .with_client(client),
    );

    let session = result?;
    Ok(Json(LoginResponse {
        token: session.issued.token,
        expires_at: session.issued.expires_at,
        user: session.account,
    }))
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub user: AccountContext,
}

/// `GET /api/validate-token`: the auth middleware already did the work.
pub async fn validate_token(
    Extension(account): Extension<AccountContext>,
) -> Result<Json<ValidateResponse>, ApiError> {
    Ok(Json(ValidateResponse {
        valid: true,
        user: account,
    }))
}
