use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_date, parse_time, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::{AppointmentStatus, PaymentStatus};
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "id, patient_id, appointment_date, appointment_time,
    duration_minutes, appointment_type, status, notes, price, payment_status, created_by,
    created_at";

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, appointment_date, appointment_time,
         duration_minutes, appointment_type, status, notes, price, payment_status, created_by,
         created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.date.to_string(),
            appt.time.format("%H:%M:%S").to_string(),
            appt.duration_minutes,
            appt.appointment_type,
            appt.status.as_str(),
            appt.notes,
            appt.price,
            appt.payment_status.as_str(),
            appt.created_by,
            format_timestamp(&appt.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id.to_string()],
            appointment_row_from_rusqlite,
        )
        .optional()?;
    row.map(appointment_from_row).transpose()
}

/// Appointments in chronological order, optionally narrowed to one day
/// and/or one patient.
pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE (?1 IS NULL OR appointment_date = ?1)
           AND (?2 IS NULL OR patient_id = ?2)
         ORDER BY appointment_date, appointment_time"
    ))?;
    let rows = stmt.query_map(
        params![
            filter.date.map(|d| d.to_string()),
            filter.patient_id.map(|id| id.to_string()),
        ],
        appointment_row_from_rusqlite,
    )?;

    let mut appts = Vec::new();
    for row in rows {
        appts.push(appointment_from_row(row?)?);
    }
    Ok(appts)
}

/// Apply a partial update; absent fields keep their stored value.
pub fn update_appointment(
    conn: &Connection,
    id: &Uuid,
    update: &AppointmentUpdate,
) -> Result<Appointment, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET
         status = COALESCE(?2, status),
         notes = COALESCE(?3, notes),
         payment_status = COALESCE(?4, payment_status)
         WHERE id = ?1",
        params![
            id.to_string(),
            update.status.map(|s| s.as_str()),
            update.notes,
            update.payment_status.map(|s| s.as_str()),
        ],
    )?;
    if changed == 0 {
        return Err(not_found(id));
    }
    get_appointment(conn, id)?.ok_or_else(|| not_found(id))
}

fn not_found(id: &Uuid) -> DatabaseError {
    DatabaseError::NotFound {
        entity_type: "appointment".into(),
        id: id.to_string(),
    }
}

// Internal row type for Appointment mapping
struct AppointmentRow {
    id: String,
    patient_id: String,
    date: String,
    time: String,
    duration_minutes: u32,
    appointment_type: String,
    status: String,
    notes: Option<String>,
    price: Option<f64>,
    payment_status: String,
    created_by: String,
    created_at: String,
}

fn appointment_row_from_rusqlite(row: &rusqlite::Row) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        date: row.get(2)?,
        time: row.get(3)?,
        duration_minutes: row.get(4)?,
        appointment_type: row.get(5)?,
        status: row.get(6)?,
        notes: row.get(7)?,
        price: row.get(8)?,
        payment_status: row.get(9)?,
        created_by: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid("appointments.id", &row.id)?,
        patient_id: parse_uuid("appointments.patient_id", &row.patient_id)?,
        date: parse_date("appointments.appointment_date", &row.date)?,
        time: parse_time("appointments.appointment_time", &row.time)?,
        duration_minutes: row.duration_minutes,
        appointment_type: row.appointment_type,
        status: AppointmentStatus::from_str(&row.status)?,
        notes: row.notes,
        price: row.price,
        payment_status: PaymentStatus::from_str(&row.payment_status)?,
        created_by: row.created_by,
        created_at: parse_timestamp("appointments.created_at", &row.created_at)?,
    })
}
