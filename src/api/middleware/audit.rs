//! Audit logging middleware.
//!
//! Records every state-changing request, every denied request, and any
//! read whose handler marked a record with `AuditTarget`. Runs innermost
//! (after auth has injected `AccountContext`).

use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::{client_addr, request_path, resource_from_path, ApiContext, AuditTarget};
use crate::auth::AccountContext;
use crate::models::enums::AuditOutcome;
use crate::models::AuditEntry;

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Outcome of a request as the audit trail sees it.
pub fn outcome_for(status: StatusCode) -> AuditOutcome {
    match status.as_u16() {
        s if s < 400 => AuditOutcome::Success,
        401 | 403 => AuditOutcome::Denied,
        _ => AuditOutcome::Failure,
    }
}

/// Log API access for the audit trail.
/// Accesses `ApiContext` from request extensions.
pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = request_path(&req);
    let client = client_addr(&req);

    let ctx = req.extensions().get::<ApiContext>().cloned();
    let actor = req
        .extensions()
        .get::<AccountContext>()
        .map(|a| a.identifier.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let response = next.run(req).await;

    let target = response.extensions().get::<AuditTarget>().cloned();
    let status = response.status();
    let audited = is_mutating(&method) || target.is_some() || status == StatusCode::FORBIDDEN;

    if let (Some(ctx), true) = (ctx, audited) {
        let resource_type = target
            .as_ref()
            .map(|t| t.resource_type.to_string())
            .unwrap_or_else(|| resource_from_path(&path).to_string());
        let mut entry = AuditEntry::new(
            ctx.core.clock().now(),
            actor,
            format!("{method} {path}"),
            resource_type,
            outcome_for(status),
        )
        .with_client(client);
        if let Some(target) = target {
            entry = entry.with_resource(target.resource_id);
        }
        ctx.core.audit().record(entry);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_follows_status() {
        assert_eq!(outcome_for(StatusCode::CREATED), AuditOutcome::Success);
        assert_eq!(outcome_for(StatusCode::FORBIDDEN), AuditOutcome::Denied);
        assert_eq!(outcome_for(StatusCode::UNAUTHORIZED), AuditOutcome::Denied);
        assert_eq!(outcome_for(StatusCode::BAD_REQUEST), AuditOutcome::Failure);
        assert_eq!(
            outcome_for(StatusCode::INTERNAL_SERVER_ERROR),
            AuditOutcome::Failure
        );
    }

    #[test]
    fn only_writes_are_mutating() {
        assert!(is_mutating(&Method::POST));
        assert!(is_mutating(&Method::DELETE));
        assert!(!is_mutating(&Method::GET));
    }
}
