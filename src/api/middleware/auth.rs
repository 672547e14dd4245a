//! Bearer credential authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, validates it through the
//! session gate, and injects `AccountContext` into request extensions for
//! downstream handlers. Rejections are written to the audit trail with the
//! actor `anonymous`.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{bearer_token, client_addr, request_path, resource_from_path, ApiContext};
use crate::models::enums::AuditOutcome;
use crate::models::AuditEntry;

/// Require a valid session credential.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let account = match ctx.core.gate().validate(bearer_token(&req)) {
        Ok(account) => account,
        Err(err) => {
            let path = request_path(&req);
            tracing::warn!(path = %path, reason = %err, "Request rejected by session gate");
            ctx.core.audit().record(
                AuditEntry::new(
                    ctx.core.clock().now(),
                    "anonymous",
                    format!("{} {}", req.method(), path),
                    resource_from_path(&path),
                    AuditOutcome::Denied,
                )
                .with_client(client_addr(&req)),
            );
            return Err(err.into());
        }
    };

    req.extensions_mut().insert(account);
    Ok(next.run(req).await)
}
