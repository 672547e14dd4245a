//! Patient endpoints.
//!
//! - `POST /api/patients`: create
//! - `GET /api/patients`: list, without sensitive attributes
//! - `GET /api/patients/:id`: detail with sensitive attributes revealed
//! - `PUT /api/patients/:id`: replace attributes
//! - `DELETE /api/patients/:id`: soft delete with a reason

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CreatedResponse, MessageResponse};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, AuditTarget};
use crate::auth::AccountContext;
use crate::models::{Patient, PatientInput, PatientSummary};
use crate::records;

const RESOURCE: &str = "patient";

#[derive(Serialize)]
pub struct PatientsResponse {
    pub patients: Vec<PatientSummary>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub reason: String,
}

/// `POST /api/patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(account): Extension<AccountContext>,
    ApiJson(input): ApiJson<PatientInput>,
) -> Result<(StatusCode, Extension<AuditTarget>, Json<CreatedResponse>), ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = records::create_patient(
        &conn,
        ctx.core.codec(),
        input,
        &account.identifier,
        ctx.core.clock().now(),
    )?;

    Ok((
        StatusCode::CREATED,
        Extension(AuditTarget::new(RESOURCE, patient.id)),
        Json(CreatedResponse {
            id: patient.id.to_string(),
            message: "Patient created",
        }),
    ))
}

/// `GET /api/patients`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<PatientsResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patients = records::list_patients(&conn)?;
    Ok(Json(PatientsResponse { patients }))
}

/// `GET /api/patients/:id`. Audited, since this is the read that reveals.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<(Extension<AuditTarget>, Json<Patient>), ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = records::get_patient(&conn, ctx.core.codec(), &id)?;
    Ok((Extension(AuditTarget::new(RESOURCE, id)), Json(patient)))
}

/// `PUT /api/patients/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<PatientInput>,
) -> Result<(Extension<AuditTarget>, Json<Patient>), ApiError> {
    let conn = ctx.core.open_db()?;
    let patient =
        records::update_patient(&conn, ctx.core.codec(), &id, input, ctx.core.clock().now())?;
    Ok((Extension(AuditTarget::new(RESOURCE, id)), Json(patient)))
}

/// `DELETE /api/patients/:id`
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<DeleteRequest>,
) -> Result<(Extension<AuditTarget>, Json<MessageResponse>), ApiError> {
    let conn = ctx.core.open_db()?;
    records::delete_patient(&conn, &id, &request.reason, ctx.core.clock().now())?;
    Ok((
        Extension(AuditTarget::new(RESOURCE, id)),
        Json(MessageResponse {
            message: "Patient deleted",
        }),
    ))
}
