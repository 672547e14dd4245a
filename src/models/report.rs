use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ConfidentialityLevel;

/// A clinical note written after (or outside of) a session.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub date: NaiveDate,
    pub report_type: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub confidentiality_level: ConfidentialityLevel,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
    pub patient_id: Uuid,
    #[serde(default)]
    pub appointment_id: Option<Uuid>,
    pub date: NaiveDate,
    pub report_type: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub confidentiality_level: Option<ConfidentialityLevel>,
}
