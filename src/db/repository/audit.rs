use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};

use super::{format_timestamp, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::enums::AuditOutcome;
use crate::models::{AuditEntry, AuditRecord};

/// Append one entry to the audit_log table. Returns its sequence number.
pub fn insert_audit_entry(conn: &Connection, entry: &AuditEntry) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (timestamp, actor, action, resource_type, resource_id, outcome,
         client_addr)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            format_timestamp(&entry.timestamp),
            entry.actor,
            entry.action,
            entry.resource_type,
            entry.resource_id,
            entry.outcome.as_str(),
            entry.client_addr,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Prune audit entries older than `retention_days` before `now`.
pub fn prune_audit_log(
    conn: &Connection,
    retention_days: i64,
    now: &DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let cutoff = *now - Duration::days(retention_days);
    let deleted = conn.execute(
        "DELETE FROM audit_log WHERE timestamp < ?1",
        params![format_timestamp(&cutoff)],
    )?;
    Ok(deleted)
}

/// Most recent entries first.
pub fn recent_audit_entries(conn: &Connection, limit: u32) -> Result<Vec<AuditRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, actor, action, resource_type, resource_id, outcome, client_addr
         FROM audit_log ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, Option<String>>(7)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, timestamp, actor, action, resource_type, resource_id, outcome, client_addr) = row?;
        records.push(AuditRecord {
            id,
            entry: AuditEntry {
                timestamp: parse_timestamp("audit_log.timestamp", &timestamp)?,
                actor,
                action,
                resource_type,
                resource_id,
                outcome: AuditOutcome::from_str(&outcome)?,
                client_addr,
            },
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::TimeZone;

    fn entry_at(ts: DateTime<Utc>, action: &str) -> AuditEntry {
        AuditEntry {
            timestamp: ts,
            actor: "alice".into(),
            action: action.into(),
            resource_type: "patient".into(),
            resource_id: Some("c0ffee".into()),
            outcome: AuditOutcome::Success,
            client_addr: Some("127.0.0.1".into()),
        }
    }

    #[test]
    fn insert_and_read_back_newest_first() {
        let conn = open_memory_database().unwrap();
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        insert_audit_entry(&conn, &entry_at(t0, "create")).unwrap();
        insert_audit_entry(&conn, &entry_at(t0, "read")).unwrap();
        insert_audit_entry(&conn, &entry_at(t0, "update")).unwrap();

        let recent = recent_audit_entries(&conn, 2).unwrap();
        let actions: Vec<_> = recent.iter().map(|r| r.entry.action.as_str()).collect();
        assert_eq!(actions, vec!["update", "read"]);
        assert_eq!(recent[0].entry, entry_at(t0, "update"));
    }

    #[test]
    fn entries_cannot_be_updated() {
        let conn = open_memory_database().unwrap();
        let id = insert_audit_entry(&conn, &entry_at(Utc::now(), "create")).unwrap();
        let result = conn.execute(
            "UPDATE audit_log SET outcome = 'failure' WHERE id = ?1",
            params![id],
        );
        assert!(result.is_err());
    }

    #[test]
    fn prune_removes_only_old_entries() {
        let conn = open_memory_database().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        insert_audit_entry(&conn, &entry_at(now - Duration::days(400), "old")).unwrap();
        insert_audit_entry(&conn, &entry_at(now - Duration::days(30), "recent")).unwrap();

        let deleted = prune_audit_log(&conn, 365, &now).unwrap();
        assert_eq!(deleted, 1);

        let remaining = recent_audit_entries(&conn, 10).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].entry.action, "recent");
    }
}
