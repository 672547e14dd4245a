use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PaymentMethod;

#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub amount: f64,
    pub method: PaymentMethod,
    pub paid_at: NaiveDate,
    pub notes: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub patient_id: Uuid,
    #[serde(default)]
    pub appointment_id: Option<Uuid>,
    pub amount: f64,
    pub method: PaymentMethod,
    pub paid_at: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}
