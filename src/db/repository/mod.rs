//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed `Connection`; callers own the
//! connection lifetime (one per request). Sensitive patient attributes
//! arrive here already encoded as envelopes.

mod account;
mod appointment;
mod audit;
mod patient;
mod payment;
mod report;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::DatabaseError;

pub use account::*;
pub use appointment::*;
pub use audit::*;
pub use patient::*;
pub use payment::*;
pub use report::*;

/// Canonical stored form for instants: RFC 3339, second precision, `Z`.
/// Lexicographic order equals chronological order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::CorruptedColumn {
            column,
            value: value.to_string(),
        })
}

pub(crate) fn parse_uuid(column: &'static str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|_| DatabaseError::CorruptedColumn {
        column,
        value: value.to_string(),
    })
}

pub(crate) fn parse_date(column: &'static str, value: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| DatabaseError::CorruptedColumn {
        column,
        value: value.to_string(),
    })
}

pub(crate) fn parse_time(column: &'static str, value: &str) -> Result<NaiveTime, DatabaseError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| DatabaseError::CorruptedColumn {
            column,
            value: value.to_string(),
        })
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_round_trip_at_second_precision() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let stored = format_timestamp(&ts);
        assert_eq!(stored, "2025-03-14T09:26:53Z");
        assert_eq!(parse_timestamp("created_at", &stored).unwrap(), ts);
    }

    #[test]
    fn corrupted_values_name_their_column() {
        let err = parse_uuid("patient_id", "not-a-uuid").unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::CorruptedColumn { column: "patient_id", .. }
        ));
        assert!(parse_date("birth_date", "14/03/2025").is_err());
        assert!(parse_timestamp("created_at", "yesterday").is_err());
    }

    #[test]
    fn time_accepts_minutes_only() {
        assert_eq!(
            parse_time("appointment_time", "14:30").unwrap(),
            NaiveTime::from_hms_opt(14, 30, 0).unwrap()
        );
        assert_eq!(
            parse_time("appointment_time", "14:30:00").unwrap(),
            NaiveTime::from_hms_opt(14, 30, 0).unwrap()
        );
    }
}
