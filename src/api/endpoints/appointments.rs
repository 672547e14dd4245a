//! Appointment endpoints.
//!
//! - `POST /api/appointments`: schedule
//! - `GET /api/appointments`: list, filtered by `?date=` and `?patient_id=`
//! - `PUT /api/appointments/:id`: status, notes and payment status

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use super::CreatedResponse;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, AuditTarget};
use crate::auth::AccountContext;
use crate::db;
use crate::models::{Appointment, AppointmentFilter, AppointmentUpdate, NewAppointment};
use crate::records;

const RESOURCE: &str = "appointment";

#[derive(Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<Appointment>,
}

/// `POST /api/appointments`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(account): Extension<AccountContext>,
    ApiJson(input): ApiJson<NewAppointment>,
) -> Result<(StatusCode, Extension<AuditTarget>, Json<CreatedResponse>), ApiError> {
    let conn = ctx.core.open_db()?;
    let appointment =
        records::create_appointment(&conn, input, &account.identifier, ctx.core.clock().now())?;

    Ok((
        StatusCode::CREATED,
        Extension(AuditTarget::new(RESOURCE, appointment.id)),
        Json(CreatedResponse {
            id: appointment.id.to_string(),
            message: "Appointment created",
        }),
    ))
}

/// `GET /api/appointments`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let appointments = db::list_appointments(&conn, &filter)?;
    Ok(Json(AppointmentsResponse { appointments }))
}

/// `PUT /api/appointments/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<AppointmentUpdate>,
) -> Result<(Extension<AuditTarget>, Json<Appointment>), ApiError> {
    let conn = ctx.core.open_db()?;
    let appointment = db::update_appointment(&conn, &id, &update)?;
    Ok((Extension(AuditTarget::new(RESOURCE, id)), Json(appointment)))
}
