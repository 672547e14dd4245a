//! Record services: validation and codec application between the HTTP
//! handlers and the repositories.
//!
//! Patient sensitive attributes are protected here on every write path and
//! revealed here on the single read path that returns them. Repositories
//! only ever see envelopes.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::crypto::{CryptoError, FieldCodec};
use crate::db::{self, DatabaseError};
use crate::models::enums::{AppointmentStatus, ConfidentialityLevel, PaymentStatus};
use crate::models::*;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

fn require(value: &str, field: &str) -> Result<(), RecordError> {
    if value.trim().is_empty() {
        return Err(RecordError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_patient(conn: &Connection, patient_id: &Uuid) -> Result<(), RecordError> {
    if !db::patient_exists(conn, patient_id)? {
        return Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: patient_id.to_string(),
        }
        .into());
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Patients
// ═══════════════════════════════════════════

fn validate_patient(details: &PatientDetails, contact: &SensitiveFields, today: chrono::NaiveDate) -> Result<(), RecordError> {
    require(&details.first_name, "first_name")?;
    require(&details.last_name, "last_name")?;
    if details.birth_date.is_some_and(|d| d > today) {
        return Err(RecordError::Validation("birth_date is in the future".into()));
    }
    if contact.email.as_deref().is_some_and(|e| !e.is_empty() && !e.contains('@')) {
        return Err(RecordError::Validation("email is not a valid address".into()));
    }
    Ok(())
}

pub fn create_patient(
    conn: &Connection,
    codec: &FieldCodec,
    input: PatientInput,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<Patient, RecordError> {
    let (details, contact) = input.split();
    validate_patient(&details, &contact, now.date_naive())?;

    let record = PatientRecord {
        id: Uuid::new_v4(),
        details,
        protected: codec.protect_fields(&contact)?,
        created_by: actor.to_string(),
        created_at: now,
        updated_at: now,
        is_deleted: false,
        deletion_reason: None,
        deleted_at: None,
    };
    db::insert_patient(conn, &record)?;
    tracing::info!(patient_id = %record.id, "Patient created");

    // Empty strings were stored as absence; report what was stored.
    let contact = codec.reveal_fields(&record.protected)?;
    Ok(reveal_view(record, contact))
}

/// Detail view with sensitive attributes revealed. Fails as a whole on any
/// envelope that does not authenticate.
pub fn get_patient(conn: &Connection, codec: &FieldCodec, id: &Uuid) -> Result<Patient, RecordError> {
    let record = db::get_patient(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "patient".into(),
        id: id.to_string(),
    })?;
    let contact = codec.reveal_fields(&record.protected).map_err(|e| {
        tracing::error!(patient_id = %id, "Patient envelopes failed authentication");
        e
    })?;
    Ok(reveal_view(record, contact))
}

/// List view. Never touches the codec: summaries carry no sensitive fields.
pub fn list_patients(conn: &Connection) -> Result<Vec<PatientSummary>, RecordError> {
    Ok(db::list_patients(conn)?
        .iter()
        .map(PatientSummary::from)
        .collect())
}

pub fn update_patient(
    conn: &Connection,
    codec: &FieldCodec,
    id: &Uuid,
    input: PatientInput,
    now: DateTime<Utc>,
) -> Result<Patient, RecordError> {
    let (details, contact) = input.split();
    validate_patient(&details, &contact, now.date_naive())?;

    let protected = codec.protect_fields(&contact)?;
    db::update_patient(conn, id, &details, &protected, &now)?;
    tracing::info!(patient_id = %id, "Patient updated");
    get_patient(conn, codec, id)
}

pub fn delete_patient(
    conn: &Connection,
    id: &Uuid,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), RecordError> {
    require(reason, "reason")?;
    db::soft_delete_patient(conn, id, reason.trim(), &now)?;
    tracing::info!(patient_id = %id, "Patient soft-deleted");
    Ok(())
}

fn reveal_view(record: PatientRecord, contact: SensitiveFields) -> Patient {
    Patient {
        id: record.id,
        details: record.details,
        contact,
        created_by: record.created_by,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

// ═══════════════════════════════════════════
// Appointments, reports, payments
// ═══════════════════════════════════════════

pub fn create_appointment(
    conn: &Connection,
    input: NewAppointment,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<Appointment, RecordError> {
    require(&input.appointment_type, "appointment_type")?;
    if input.duration_minutes == 0 || input.duration_minutes > 24 * 60 {
        return Err(RecordError::Validation("duration_minutes out of range".into()));
    }
    if input.price.is_some_and(|p| !p.is_finite() || p < 0.0) {
        return Err(RecordError::Validation("price must be a non-negative number".into()));
    }
    require_patient(conn, &input.patient_id)?;

    let appt = Appointment {
        id: Uuid::new_v4(),
        patient_id: input.patient_id,
        date: input.date,
        time: input.time,
        duration_minutes: input.duration_minutes,
        appointment_type: input.appointment_type.trim().to_string(),
        status: input.status.unwrap_or(AppointmentStatus::Scheduled),
        notes: input.notes,
        price: input.price,
        payment_status: input.payment_status.unwrap_or(PaymentStatus::Pending),
        created_by: actor.to_string(),
        created_at: now,
    };
    db::insert_appointment(conn, &appt)?;
    tracing::info!(appointment_id = %appt.id, patient_id = %appt.patient_id, "Appointment scheduled");
    Ok(appt)
}

pub fn create_report(
    conn: &Connection,
    input: NewReport,
    author: &str,
    now: DateTime<Utc>,
) -> Result<Report, RecordError> {
    require(&input.report_type, "report_type")?;
    require(&input.title, "title")?;
    require(&input.content, "content")?;
    require_patient(conn, &input.patient_id)?;
    if let Some(appt_id) = &input.appointment_id {
        let appt = db::get_appointment(conn, appt_id)?.ok_or_else(|| DatabaseError::NotFound {
            entity_type: "appointment".into(),
            id: appt_id.to_string(),
        })?;
        if appt.patient_id != input.patient_id {
            return Err(RecordError::Validation(
                "appointment belongs to a different patient".into(),
            ));
        }
    }

    let report = Report {
        id: Uuid::new_v4(),
        patient_id: input.patient_id,
        appointment_id: input.appointment_id,
        date: input.date,
        report_type: input.report_type,
        title: input.title,
        content: input.content,
        author_id: author.to_string(),
        confidentiality_level: input
            .confidentiality_level
            .unwrap_or(ConfidentialityLevel::Confidential),
        created_at: now,
    };
    db::insert_report(conn, &report)?;
    tracing::info!(report_id = %report.id, patient_id = %report.patient_id, "Report written");
    Ok(report)
}

pub fn record_payment(
    conn: &Connection,
    input: NewPayment,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<Payment, RecordError> {
    if !input.amount.is_finite() || input.amount <= 0.0 {
        return Err(RecordError::Validation("amount must be greater than zero".into()));
    }
    require_patient(conn, &input.patient_id)?;
    if let Some(appt_id) = &input.appointment_id {
        if db::get_appointment(conn, appt_id)?.is_none() {
            return Err(DatabaseError::NotFound {
                entity_type: "appointment".into(),
                id: appt_id.to_string(),
            }
            .into());
        }
    }

    let payment = Payment {
        id: Uuid::new_v4(),
        patient_id: input.patient_id,
        appointment_id: input.appointment_id,
        amount: input.amount,
        method: input.method,
        paid_at: input.paid_at,
        notes: input.notes,
        recorded_by: actor.to_string(),
        created_at: now,
    };
    db::insert_payment(conn, &payment)?;
    tracing::info!(payment_id = %payment.id, patient_id = %payment.patient_id, "Payment recorded");
    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::FieldKey;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::{PatientStatus, PaymentMethod};
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use rusqlite::params;

    fn codec() -> FieldCodec {
        FieldCodec::new(FieldKey::derive("records-test", b"records-salt"))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 2, 15, 0, 0).unwrap()
    }

    fn input(json: &str) -> PatientInput {
        serde_json::from_str(json).unwrap()
    }

    fn maria() -> PatientInput {
        input(
            r#"{
                "first_name": "Maria",
                "last_name": "Silva",
                "cpf": "123.456.789-00",
                "phone": "555-1234",
                "email": "maria@example.com",
                "address": "Rua das Flores, 42",
                "therapy_reason": "anxiety"
            }"#,
        )
    }

    #[test]
    fn create_stores_only_envelopes_and_get_reveals() {
        let conn = open_memory_database().unwrap();
        let codec = codec();
        let created = create_patient(&conn, &codec, maria(), "alice", now()).unwrap();
        assert_eq!(created.contact.phone.as_deref(), Some("555-1234"));

        let stored: (String, String) = conn
            .query_row(
                "SELECT phone_encrypted, national_id_encrypted FROM patients WHERE id = ?1",
                params![created.id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert!(!stored.0.contains("555-1234"));
        assert!(!stored.1.contains("123.456.789-00"));
        assert!(stored.0.starts_with(r#"{"iv":"#));

        let fetched = get_patient(&conn, &codec, &created.id).unwrap();
        assert_eq!(fetched.contact.national_id.as_deref(), Some("123.456.789-00"));
        assert_eq!(fetched.contact.email.as_deref(), Some("maria@example.com"));
        assert_eq!(fetched.contact.address.as_deref(), Some("Rua das Flores, 42"));
        assert_eq!(fetched.details.therapy_reason.as_deref(), Some("anxiety"));
        assert_eq!(fetched.created_by, "alice");
    }

    #[test]
    fn tampered_column_fails_the_detail_read() {
        let conn = open_memory_database().unwrap();
        let codec = codec();
        let created = create_patient(&conn, &codec, maria(), "alice", now()).unwrap();

        let stored: String = conn
            .query_row(
                "SELECT email_encrypted FROM patients WHERE id = ?1",
                params![created.id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        let mut envelope = crate::crypto::Envelope::decode(&stored).unwrap();
        envelope.ciphertext[0] ^= 0x01;
        conn.execute(
            "UPDATE patients SET email_encrypted = ?1 WHERE id = ?2",
            params![envelope.encode(), created.id.to_string()],
        )
        .unwrap();

        assert!(matches!(
            get_patient(&conn, &codec, &created.id),
            Err(RecordError::Crypto(CryptoError::IntegrityViolation))
        ));
    }

    #[test]
    fn list_returns_summaries_without_sensitive_fields() {
        let conn = open_memory_database().unwrap();
        create_patient(&conn, &codec(), maria(), "alice", now()).unwrap();
        let list = list_patients(&conn).unwrap();
        assert_eq!(list.len(), 1);
        let json = serde_json::to_string(&list).unwrap();
        assert!(!json.contains("555-1234"));
        assert!(!json.contains("phone"));
        assert!(!json.contains("national_id"));
    }

    #[test]
    fn update_re_encrypts_and_can_clear_fields() {
        let conn = open_memory_database().unwrap();
        let codec = codec();
        let created = create_patient(&conn, &codec, maria(), "alice", now()).unwrap();

        let change = input(
            r#"{"first_name": "Maria", "last_name": "Souza", "phone": "555-9999", "status": "inactive"}"#,
        );
        let later = now() + chrono::Duration::days(1);
        let updated = update_patient(&conn, &codec, &created.id, change, later).unwrap();
        assert_eq!(updated.details.last_name, "Souza");
        assert_eq!(updated.details.status, PatientStatus::Inactive);
        assert_eq!(updated.contact.phone.as_deref(), Some("555-9999"));
        assert!(updated.contact.email.is_none());
        assert_eq!(updated.updated_at, later);
    }

    #[test]
    fn validation_rejects_bad_patient_input() {
        let conn = open_memory_database().unwrap();
        let codec = codec();
        for json in [
            r#"{"first_name": " ", "last_name": "Silva"}"#,
            r#"{"first_name": "Maria", "last_name": ""}"#,
            r#"{"first_name": "Maria", "last_name": "Silva", "email": "not-an-email"}"#,
            r#"{"first_name": "Maria", "last_name": "Silva", "birth_date": "2099-01-01"}"#,
        ] {
            assert!(
                matches!(
                    create_patient(&conn, &codec, input(json), "alice", now()),
                    Err(RecordError::Validation(_))
                ),
                "accepted {json}"
            );
        }
        assert!(list_patients(&conn).unwrap().is_empty());
    }

    #[test]
    fn delete_requires_reason_and_hides_patient() {
        let conn = open_memory_database().unwrap();
        let codec = codec();
        let created = create_patient(&conn, &codec, maria(), "alice", now()).unwrap();

        assert!(matches!(
            delete_patient(&conn, &created.id, "  ", now()),
            Err(RecordError::Validation(_))
        ));
        delete_patient(&conn, &created.id, "patient request", now()).unwrap();
        assert!(matches!(
            get_patient(&conn, &codec, &created.id),
            Err(RecordError::Database(DatabaseError::NotFound { .. }))
        ));
    }

    #[test]
    fn appointment_defaults_and_unknown_patient() {
        let conn = open_memory_database().unwrap();
        let patient = create_patient(&conn, &codec(), maria(), "alice", now()).unwrap();

        let appt = create_appointment(
            &conn,
            NewAppointment {
                patient_id: patient.id,
                date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
                time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                duration_minutes: 50,
                appointment_type: "individual".into(),
                status: None,
                notes: None,
                price: Some(200.0),
                payment_status: None,
            },
            "alice",
            now(),
        )
        .unwrap();
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.payment_status, PaymentStatus::Pending);

        let orphan = NewAppointment {
            patient_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            duration_minutes: 50,
            appointment_type: "individual".into(),
            status: None,
            notes: None,
            price: None,
            payment_status: None,
        };
        assert!(matches!(
            create_appointment(&conn, orphan, "alice", now()),
            Err(RecordError::Database(DatabaseError::NotFound { .. }))
        ));
    }

    #[test]
    fn report_must_reference_same_patients_appointment() {
        let conn = open_memory_database().unwrap();
        let codec = codec();
        let p1 = create_patient(&conn, &codec, maria(), "alice", now()).unwrap();
        let p2 = create_patient(&conn, &codec, maria(), "alice", now()).unwrap();
        let appt = create_appointment(
            &conn,
            NewAppointment {
                patient_id: p1.id,
                date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
                time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                duration_minutes: 50,
                appointment_type: "individual".into(),
                status: None,
                notes: None,
                price: None,
                payment_status: None,
            },
            "alice",
            now(),
        )
        .unwrap();

        let report = |patient_id| NewReport {
            patient_id,
            appointment_id: Some(appt.id),
            date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            report_type: "session".into(),
            title: "Session 1".into(),
            content: "Notes".into(),
            confidentiality_level: None,
        };
        assert!(matches!(
            create_report(&conn, report(p2.id), "alice", now()),
            Err(RecordError::Validation(_))
        ));
        let written = create_report(&conn, report(p1.id), "alice", now()).unwrap();
        assert_eq!(written.confidentiality_level, ConfidentialityLevel::Confidential);
        assert_eq!(written.author_id, "alice");
    }

    #[test]
    fn payment_amount_must_be_positive() {
        let conn = open_memory_database().unwrap();
        let patient = create_patient(&conn, &codec(), maria(), "alice", now()).unwrap();
        let payment = |amount| NewPayment {
            patient_id: patient.id,
            appointment_id: None,
            amount,
            method: PaymentMethod::Cash,
            paid_at: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            notes: None,
        };
        assert!(matches!(
            record_payment(&conn, payment(0.0), "alice", now()),
            Err(RecordError::Validation(_))
        ));
        assert!(matches!(
            record_payment(&conn, payment(f64::NAN), "alice", now()),
            Err(RecordError::Validation(_))
        ));
        let recorded = record_payment(&conn, payment(180.0), "alice", now()).unwrap();
        assert_eq!(recorded.recorded_by, "alice");
    }
}
