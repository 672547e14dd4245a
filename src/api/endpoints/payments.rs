//! Payment endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use super::CreatedResponse;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, AuditTarget};
use crate::auth::AccountContext;
use crate::db;
use crate::models::{NewPayment, PatientFilter, Payment};
use crate::records;

#[derive(Serialize)]
pub struct PaymentsResponse {
    pub payments: Vec<Payment>,
}

/// `POST /api/payments`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(account): Extension<AccountContext>,
    ApiJson(input): ApiJson<NewPayment>,
) -> Result<(StatusCode, Extension<AuditTarget>, Json<CreatedResponse>), ApiError> {
    let conn = ctx.core.open_db()?;
    let payment =
        records::record_payment(&conn, input, &account.identifier, ctx.core.clock().now())?;

    Ok((
        StatusCode::CREATED,
        Extension(AuditTarget::new("payment", payment.id)),
        Json(CreatedResponse {
            id: payment.id.to_string(),
            message: "Payment recorded",
        }),
    ))
}

/// `GET /api/payments?patient_id=`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(filter): Query<PatientFilter>,
) -> Result<Json<PaymentsResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let payments = db::list_payments(&conn, &filter)?;
    Ok(Json(PaymentsResponse { payments }))
}
