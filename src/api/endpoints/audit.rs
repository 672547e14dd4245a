//! Read-only view of the audit trail. Admin role only.

use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use super::require_admin;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::AccountContext;
use crate::models::AuditRecord;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct AuditResponse {
    pub entries: Vec<AuditRecord>,
}

/// `GET /api/audit?limit=`: newest first.
pub async fn recent(
    State(ctx): State<ApiContext>,
    Extension(account): Extension<AccountContext>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditResponse>, ApiError> {
    require_admin(&account)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let entries = ctx.core.audit().recent(limit)?;
    Ok(Json(AuditResponse { entries }))
}
