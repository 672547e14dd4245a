//! Clinical report endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use super::CreatedResponse;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, AuditTarget};
use crate::auth::AccountContext;
use crate::db;
use crate::models::{NewReport, PatientFilter, Report};
use crate::records;

#[derive(Serialize)]
pub struct ReportsResponse {
    pub reports: Vec<Report>,
}

/// `POST /api/reports`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(account): Extension<AccountContext>,
    ApiJson(input): ApiJson<NewReport>,
) -> Result<(StatusCode, Extension<AuditTarget>, Json<CreatedResponse>), ApiError> {
    let conn = ctx.core.open_db()?;
    let report = records::create_report(&conn, input, &account.identifier, ctx.core.clock().now())?;

    Ok((
        StatusCode::CREATED,
        Extension(AuditTarget::new("report", report.id)),
        Json(CreatedResponse {
            id: report.id.to_string(),
            message: "Report created",
        }),
    ))
}

/// `GET /api/reports?patient_id=`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(filter): Query<PatientFilter>,
) -> Result<Json<ReportsResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let reports = db::list_reports(&conn, &filter)?;
    Ok(Json(ReportsResponse { reports }))
}
