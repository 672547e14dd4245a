use std::str::FromStr;

use rusqlite::{params, Connection};

use super::{format_timestamp, parse_date, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::ConfidentialityLevel;
use crate::models::*;

pub fn insert_report(conn: &Connection, report: &Report) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO reports (id, patient_id, appointment_id, report_date, report_type, title,
         content, author_id, confidentiality_level, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            report.id.to_string(),
            report.patient_id.to_string(),
            report.appointment_id.map(|id| id.to_string()),
            report.date.to_string(),
            report.report_type,
            report.title,
            report.content,
            report.author_id,
            report.confidentiality_level.as_str(),
            format_timestamp(&report.created_at),
        ],
    )?;
    Ok(())
}

/// Reports newest first, optionally for one patient.
pub fn list_reports(conn: &Connection, filter: &PatientFilter) -> Result<Vec<Report>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, appointment_id, report_date, report_type, title, content,
         author_id, confidentiality_level, created_at
         FROM reports
         WHERE (?1 IS NULL OR patient_id = ?1)
         ORDER BY report_date DESC, created_at DESC",
    )?;

    let rows = stmt.query_map(params![filter.patient_id.map(|id| id.to_string())], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, String>(8)?,
            row.get::<_, String>(9)?,
        ))
    })?;

    let mut reports = Vec::new();
    for row in rows {
        let (id, patient_id, appointment_id, date, report_type, title, content, author_id, level, created_at) =
            row?;
        reports.push(Report {
            id: parse_uuid("reports.id", &id)?,
            patient_id: parse_uuid("reports.patient_id", &patient_id)?,
            appointment_id: appointment_id
                .as_deref()
                .map(|s| parse_uuid("reports.appointment_id", s))
                .transpose()?,
            date: parse_date("reports.report_date", &date)?,
            report_type,
            title,
            content,
            author_id,
            confidentiality_level: ConfidentialityLevel::from_str(&level)?,
            created_at: parse_timestamp("reports.created_at", &created_at)?,
        });
    }
    Ok(reports)
}
