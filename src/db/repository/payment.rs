use std::str::FromStr;

use rusqlite::{params, Connection};

use super::{format_timestamp, parse_date, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::PaymentMethod;
use crate::models::*;

pub fn insert_payment(conn: &Connection, payment: &Payment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO payments (id, patient_id, appointment_id, amount, method, paid_at, notes,
         recorded_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            payment.id.to_string(),
            payment.patient_id.to_string(),
            payment.appointment_id.map(|id| id.to_string()),
            payment.amount,
            payment.method.as_str(),
            payment.paid_at.to_string(),
            payment.notes,
            payment.recorded_by,
            format_timestamp(&payment.created_at),
        ],
    )?;
    Ok(())
}

/// Payments newest first, optionally for one patient.
pub fn list_payments(conn: &Connection, filter: &PatientFilter) -> Result<Vec<Payment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, appointment_id, amount, method, paid_at, notes, recorded_by,
         created_at
         FROM payments
         WHERE (?1 IS NULL OR patient_id = ?1)
         ORDER BY paid_at DESC, created_at DESC",
    )?;

    let rows = stmt.query_map(params![filter.patient_id.map(|id| id.to_string())], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, String>(8)?,
        ))
    })?;

    let mut payments = Vec::new();
    for row in rows {
        let (id, patient_id, appointment_id, amount, method, paid_at, notes, recorded_by, created_at) = row?;
        payments.push(Payment {
            id: parse_uuid("payments.id", &id)?,
            patient_id: parse_uuid("payments.patient_id", &patient_id)?,
            appointment_id: appointment_id
                .as_deref()
                .map(|s| parse_uuid("payments.appointment_id", s))
                .transpose()?,
            amount,
            method: PaymentMethod::from_str(&method)?,
            paid_at: parse_date("payments.paid_at", &paid_at)?,
            notes,
            recorded_by,
            created_at: parse_timestamp("payments.created_at", &created_at)?,
        });
    }
    Ok(payments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::seed_patient;
    use crate::db::sqlite::open_memory_database;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn make_payment(patient_id: Uuid, day: u32, amount: f64) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            patient_id,
            appointment_id: None,
            amount,
            method: PaymentMethod::Pix,
            paid_at: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            notes: None,
            recorded_by: "alice".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_list_for_patient() {
        let conn = open_memory_database().unwrap();
        let p1 = seed_patient(&conn);
        let p2 = seed_patient(&conn);
        insert_payment(&conn, &make_payment(p1, 1, 180.0)).unwrap();
        insert_payment(&conn, &make_payment(p1, 8, 200.0)).unwrap();
        insert_payment(&conn, &make_payment(p2, 5, 150.0)).unwrap();

        let mine = list_payments(&conn, &PatientFilter { patient_id: Some(p1) }).unwrap();
        let amounts: Vec<_> = mine.iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![200.0, 180.0]);
        assert_eq!(mine[0].method, PaymentMethod::Pix);

        assert_eq!(list_payments(&conn, &PatientFilter::default()).unwrap().len(), 3);
    }

    #[test]
    fn negative_amount_is_rejected_by_schema() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        assert!(insert_payment(&conn, &make_payment(patient, 1, -10.0)).is_err());
    }
}
