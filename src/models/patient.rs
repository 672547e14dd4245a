use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PatientStatus;

/// The four patient attributes that are only ever stored encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitiveField {
    NationalId,
    Phone,
    Email,
    Address,
}

impl SensitiveField {
    pub const ALL: [SensitiveField; 4] = [
        SensitiveField::NationalId,
        SensitiveField::Phone,
        SensitiveField::Email,
        SensitiveField::Address,
    ];

    /// Storage column holding this field's envelope.
    pub fn column(&self) -> &'static str {
        match self {
            Self::NationalId => "national_id_encrypted",
            Self::Phone => "phone_encrypted",
            Self::Email => "email_encrypted",
            Self::Address => "address_encrypted",
        }
    }
}

/// Plaintext values of the sensitive attributes. Exists only in memory,
/// between the codec and the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SensitiveFields {
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl SensitiveFields {
    pub fn get(&self, field: SensitiveField) -> Option<&str> {
        match field {
            SensitiveField::NationalId => self.national_id.as_deref(),
            SensitiveField::Phone => self.phone.as_deref(),
            SensitiveField::Email => self.email.as_deref(),
            SensitiveField::Address => self.address.as_deref(),
        }
    }

    pub fn set(&mut self, field: SensitiveField, value: Option<String>) {
        match field {
            SensitiveField::NationalId => self.national_id = value,
            SensitiveField::Phone => self.phone = value,
            SensitiveField::Email => self.email = value,
            SensitiveField::Address => self.address = value,
        }
    }
}

/// Encoded envelopes for the sensitive attributes, exactly as persisted.
/// Storage treats these as opaque text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedFields {
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl ProtectedFields {
    pub fn get(&self, field: SensitiveField) -> Option<&str> {
        match field {
            SensitiveField::NationalId => self.national_id.as_deref(),
            SensitiveField::Phone => self.phone.as_deref(),
            SensitiveField::Email => self.email.as_deref(),
            SensitiveField::Address => self.address.as_deref(),
        }
    }

    pub fn set(&mut self, field: SensitiveField, value: Option<String>) {
        match field {
            SensitiveField::NationalId => self.national_id = value,
            SensitiveField::Phone => self.phone = value,
            SensitiveField::Email => self.email = value,
            SensitiveField::Address => self.address = value,
        }
    }
}

/// Non-sensitive patient attributes; stored and returned as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientDetails {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub profession: Option<String>,
    pub emergency_contact: Option<String>,
    pub health_insurance: Option<String>,
    pub status: PatientStatus,
    pub first_session_date: Option<NaiveDate>,
    pub session_frequency: Option<String>,
    pub therapy_reason: Option<String>,
    pub observations: Option<String>,
}

/// Body of `POST /api/patients` and `PUT /api/patients/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, alias = "cpf")]
    pub national_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub health_insurance: Option<String>,
    #[serde(default)]
    pub status: Option<PatientStatus>,
    #[serde(default)]
    pub first_session_date: Option<NaiveDate>,
    #[serde(default)]
    pub session_frequency: Option<String>,
    #[serde(default)]
    pub therapy_reason: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
}

impl PatientInput {
    /// Separate the attributes that pass through from the ones the codec must protect.
    pub fn split(self) -> (PatientDetails, SensitiveFields) {
        let details = PatientDetails {
            first_name: self.first_name,
            last_name: self.last_name,
            birth_date: self.birth_date,
            gender: self.gender,
            profession: self.profession,
            emergency_contact: self.emergency_contact,
            health_insurance: self.health_insurance,
            status: self.status.unwrap_or(PatientStatus::Active),
            first_session_date: self.first_session_date,
            session_frequency: self.session_frequency,
            therapy_reason: self.therapy_reason,
            observations: self.observations,
        };
        let contact = SensitiveFields {
            national_id: self.national_id,
            phone: self.phone,
            email: self.email,
            address: self.address,
        };
        (details, contact)
    }
}

/// A patient row as persisted: sensitive attributes as envelopes only.
#[derive(Debug, Clone)]
pub struct PatientRecord {
    pub id: Uuid,
    pub details: PatientDetails,
    pub protected: ProtectedFields,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deletion_reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A patient with sensitive attributes revealed, returned by the detail route.
#[derive(Debug, Clone, Serialize)]
pub struct Patient {
    pub id: Uuid,
    #[serde(flatten)]
    pub details: PatientDetails,
    #[serde(flatten)]
    pub contact: SensitiveFields,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List view. Carries no sensitive attributes at all.
#[derive(Debug, Clone, Serialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub profession: Option<String>,
    pub status: PatientStatus,
    pub first_session_date: Option<NaiveDate>,
    pub session_frequency: Option<String>,
    pub therapy_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PatientRecord> for PatientSummary {
    fn from(record: &PatientRecord) -> Self {
        let d = &record.details;
        Self {
            id: record.id,
            first_name: d.first_name.clone(),
            last_name: d.last_name.clone(),
            birth_date: d.birth_date,
            gender: d.gender.clone(),
            profession: d.profession.clone(),
            status: d.status,
            first_session_date: d.first_session_date,
            session_frequency: d.session_frequency.clone(),
            therapy_reason: d.therapy_reason.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
