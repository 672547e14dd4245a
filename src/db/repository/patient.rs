use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_date, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::PatientStatus;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, first_name, last_name, birth_date, gender,
    national_id_encrypted, phone_encrypted, email_encrypted, address_encrypted,
    profession, emergency_contact, health_insurance, status, first_session_date,
    session_frequency, therapy_reason, observations, created_by, created_at, updated_at,
    is_deleted, deletion_reason, deleted_at";

pub fn insert_patient(conn: &Connection, patient: &PatientRecord) -> Result<(), DatabaseError> {
    let d = &patient.details;
    let p = &patient.protected;
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, birth_date, gender,
         national_id_encrypted, phone_encrypted, email_encrypted, address_encrypted,
         profession, emergency_contact, health_insurance, status, first_session_date,
         session_frequency, therapy_reason, observations, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
         ?18, ?19, ?20)",
        params![
            patient.id.to_string(),
            d.first_name,
            d.last_name,
            d.birth_date.map(|v| v.to_string()),
            d.gender,
            p.national_id,
            p.phone,
            p.email,
            p.address,
            d.profession,
            d.emergency_contact,
            d.health_insurance,
            d.status.as_str(),
            d.first_session_date.map(|v| v.to_string()),
            d.session_frequency,
            d.therapy_reason,
            d.observations,
            patient.created_by,
            format_timestamp(&patient.created_at),
            format_timestamp(&patient.updated_at),
        ],
    )?;
    Ok(())
}

/// Fetch a live (not soft-deleted) patient.
pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<PatientRecord>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1 AND is_deleted = 0"),
            params![id.to_string()],
            patient_row_from_rusqlite,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

/// All live patients, most recently registered first.
pub fn list_patients(conn: &Connection) -> Result<Vec<PatientRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE is_deleted = 0
         ORDER BY created_at DESC, last_name COLLATE NOCASE"
    ))?;
    let rows = stmt.query_map([], patient_row_from_rusqlite)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

pub fn patient_exists(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE id = ?1 AND is_deleted = 0",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Replace every mutable attribute of a live patient.
pub fn update_patient(
    conn: &Connection,
    id: &Uuid,
    details: &PatientDetails,
    protected: &ProtectedFields,
    updated_at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET first_name = ?2, last_name = ?3, birth_date = ?4, gender = ?5,
         national_id_encrypted = ?6, phone_encrypted = ?7, email_encrypted = ?8,
         address_encrypted = ?9, profession = ?10, emergency_contact = ?11,
         health_insurance = ?12, status = ?13, first_session_date = ?14,
         session_frequency = ?15, therapy_reason = ?16, observations = ?17, updated_at = ?18
         WHERE id = ?1 AND is_deleted = 0",
        params![
            id.to_string(),
            details.first_name,
            details.last_name,
            details.birth_date.map(|v| v.to_string()),
            details.gender,
            protected.national_id,
            protected.phone,
            protected.email,
            protected.address,
            details.profession,
            details.emergency_contact,
            details.health_insurance,
            details.status.as_str(),
            details.first_session_date.map(|v| v.to_string()),
            details.session_frequency,
            details.therapy_reason,
            details.observations,
            format_timestamp(updated_at),
        ],
    )?;
    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

/// Mark a patient deleted. The row and its envelopes stay in place.
pub fn soft_delete_patient(
    conn: &Connection,
    id: &Uuid,
    reason: &str,
    at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let stamp = format_timestamp(at);
    let changed = conn.execute(
        "UPDATE patients SET is_deleted = 1, deletion_reason = ?2, deleted_at = ?3, updated_at = ?3
         WHERE id = ?1 AND is_deleted = 0",
        params![id.to_string(), reason, stamp],
    )?;
    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

fn not_found(id: &Uuid) -> DatabaseError {
    DatabaseError::NotFound {
        entity_type: "patient".into(),
        id: id.to_string(),
    }
}

// Internal row type for Patient mapping
struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    birth_date: Option<String>,
    gender: Option<String>,
    national_id_encrypted: Option<String>,
    phone_encrypted: Option<String>,
    email_encrypted: Option<String>,
    address_encrypted: Option<String>,
    profession: Option<String>,
    emergency_contact: Option<String>,
    health_insurance: Option<String>,
    status: String,
    first_session_date: Option<String>,
    session_frequency: Option<String>,
    therapy_reason: Option<String>,
    observations: Option<String>,
    created_by: String,
    created_at: String,
    updated_at: String,
    is_deleted: i32,
    deletion_reason: Option<String>,
    deleted_at: Option<String>,
}

fn patient_row_from_rusqlite(row: &rusqlite::Row) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        birth_date: row.get(3)?,
        gender: row.get(4)?,
        national_id_encrypted: row.get(5)?,
        phone_encrypted: row.get(6)?,
        email_encrypted: row.get(7)?,
        address_encrypted: row.get(8)?,
        profession: row.get(9)?,
        emergency_contact: row.get(10)?,
        health_insurance: row.get(11)?,
        status: row.get(12)?,
        first_session_date: row.get(13)?,
        session_frequency: row.get(14)?,
        therapy_reason: row.get(15)?,
        observations: row.get(16)?,
        created_by: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
        is_deleted: row.get(20)?,
        deletion_reason: row.get(21)?,
        deleted_at: row.get(22)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<PatientRecord, DatabaseError> {
    Ok(PatientRecord {
        id: parse_uuid("patients.id", &row.id)?,
        details: PatientDetails {
            first_name: row.first_name,
            last_name: row.last_name,
            birth_date: row
                .birth_date
                .as_deref()
                .map(|s| parse_date("patients.birth_date", s))
                .transpose()?,
            gender: row.gender,
            profession: row.profession,
            emergency_contact: row.emergency_contact,
            health_insurance: row.health_insurance,
            status: PatientStatus::from_str(&row.status)?,
            first_session_date: row
                .first_session_date
                .as_deref()
                .map(|s| parse_date("patients.first_session_date", s))
                .transpose()?,
            session_frequency: row.session_frequency,
            therapy_reason: row.therapy_reason,
            observations: row.observations,
        },
        protected: ProtectedFields {
            national_id: row.national_id_encrypted,
            phone: row.phone_encrypted,
            email: row.email_encrypted,
            address: row.address_encrypted,
        },
        created_by: row.created_by,
        created_at: parse_timestamp("patients.created_at", &row.created_at)?,
        updated_at: parse_timestamp("patients.updated_at", &row.updated_at)?,
        is_deleted: row.is_deleted != 0,
        deletion_reason: row.deletion_reason,
        deleted_at: row
            .deleted_at
            .as_deref()
            .map(|s| parse_timestamp("patients.deleted_at", s))
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::patient_record as make_record;
    use crate::db::sqlite::open_memory_database;
    use chrono::TimeZone;

    #[test]
    fn insert_and_get_preserves_envelopes_verbatim() {
        let conn = open_memory_database().unwrap();
        let record = make_record("Maria", "Silva");
        insert_patient(&conn, &record).unwrap();

        let fetched = get_patient(&conn, &record.id).unwrap().unwrap();
        assert_eq!(fetched.details, record.details);
        assert_eq!(fetched.protected, record.protected);
        assert_eq!(fetched.created_at, record.created_at);
    }

    #[test]
    fn list_is_newest_first_and_skips_deleted() {
        let conn = open_memory_database().unwrap();
        let a = make_record("Ana", "Souza");
        let mut b = make_record("Bruno", "Alves");
        b.created_at = b.created_at + chrono::Duration::days(1);
        let c = make_record("Carla", "Lima");
        for r in [&a, &b, &c] {
            insert_patient(&conn, r).unwrap();
        }
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        soft_delete_patient(&conn, &c.id, "duplicate record", &at).unwrap();

        let names: Vec<_> = list_patients(&conn)
            .unwrap()
            .into_iter()
            .map(|p| p.details.last_name)
            .collect();
        assert_eq!(names, vec!["Alves", "Souza"]);
        assert!(names.iter().all(|n| n != "Lima"));
    }

    #[test]
    fn soft_deleted_patient_is_hidden_but_kept() {
        let conn = open_memory_database().unwrap();
        let record = make_record("Maria", "Silva");
        insert_patient(&conn, &record).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        soft_delete_patient(&conn, &record.id, "moved away", &at).unwrap();

        assert!(get_patient(&conn, &record.id).unwrap().is_none());
        assert!(!patient_exists(&conn, &record.id).unwrap());

        let (reason, deleted_at): (String, String) = conn
            .query_row(
                "SELECT deletion_reason, deleted_at FROM patients WHERE id = ?1",
                params![record.id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(reason, "moved away");
        assert_eq!(deleted_at, "2025-03-01T00:00:00Z");

        assert!(matches!(
            soft_delete_patient(&conn, &record.id, "again", &at),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn update_replaces_fields() {
        let conn = open_memory_database().unwrap();
        let record = make_record("Maria", "Silva");
        insert_patient(&conn, &record).unwrap();

        let mut details = record.details.clone();
        details.status = PatientStatus::Inactive;
        details.observations = Some("paused treatment".into());
        let later = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        update_patient(&conn, &record.id, &details, &ProtectedFields::default(), &later).unwrap();

        let fetched = get_patient(&conn, &record.id).unwrap().unwrap();
        assert_eq!(fetched.details.status, PatientStatus::Inactive);
        assert!(fetched.protected.phone.is_none());
        assert_eq!(fetched.updated_at, later);
        assert_eq!(fetched.created_at, record.created_at);
    }

    #[test]
    fn update_unknown_patient_is_not_found() {
        let conn = open_memory_database().unwrap();
        let record = make_record("Maria", "Silva");
        let now = Utc::now();
        assert!(matches!(
            update_patient(&conn, &record.id, &record.details, &record.protected, &now),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
