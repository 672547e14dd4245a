//! Account administration. Admin role only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use super::{require_admin, MessageResponse};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, AuditTarget};
use crate::auth::AccountContext;
use crate::db;
use crate::models::enums::Role;
use crate::models::AccountSummary;

#[derive(Debug, Deserialize)]
pub struct ProvisionRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

#[derive(Serialize)]
pub struct AccountsResponse {
    pub accounts: Vec<AccountSummary>,
}

/// `POST /api/accounts`
pub async fn provision(
    State(ctx): State<ApiContext>,
    Extension(account): Extension<AccountContext>,
    ApiJson(request): ApiJson<ProvisionRequest>,
) -> Result<(StatusCode, Extension<AuditTarget>, Json<AccountSummary>), ApiError> {
    require_admin(&account)?;
    let identifier = request.username.trim();
    if identifier.is_empty() || request.full_name.trim().is_empty() {
        return Err(ApiError::BadRequest("username and full_name are required".into()));
    }

    let conn = ctx.core.open_db()?;
    let created = ctx.core.gate().provision(
        &conn,
        identifier,
        &request.password,
        request.full_name.trim(),
        request.role,
    )?;

    Ok((
        StatusCode::CREATED,
        Extension(AuditTarget::new("account", created.id)),
        Json(AccountSummary::from(&created)),
    ))
}

/// `GET /api/accounts`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(account): Extension<AccountContext>,
) -> Result<Json<AccountsResponse>, ApiError> {
    require_admin(&account)?;
    let conn = ctx.core.open_db()?;
    let accounts = db::list_accounts(&conn)?
        .iter()
        .map(AccountSummary::from)
        .collect();
    Ok(Json(AccountsResponse { accounts }))
}

/// `POST /api/accounts/:identifier/deactivate`
pub async fn deactivate(
    State(ctx): State<ApiContext>,
    Extension(account): Extension<AccountContext>,
    Path(identifier): Path<String>,
) -> Result<(Extension<AuditTarget>, Json<MessageResponse>), ApiError> {
    require_admin(&account)?;
    if identifier == account.identifier {
        return Err(ApiError::BadRequest("Cannot deactivate your own account".into()));
    }

    let conn = ctx.core.open_db()?;
    db::deactivate_account(&conn, &identifier)?;
    Ok((
        Extension(AuditTarget::new("account", &identifier)),
        Json(MessageResponse {
            message: "Account deactivated",
        }),
    ))
}
