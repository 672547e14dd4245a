use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

/// Query string of `GET /api/appointments`.
#[derive(Debug, Default, Deserialize)]
pub struct AppointmentFilter {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub patient_id: Option<Uuid>,
}

/// Query string of the report and payment listings.
#[derive(Debug, Default, Deserialize)]
pub struct PatientFilter {
    #[serde(default)]
    pub patient_id: Option<Uuid>,
}
