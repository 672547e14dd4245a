use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::Account;

const ACCOUNT_COLUMNS: &str =
    "id, identifier, secret_hash, display_name, role, is_active, last_login, created_at";

/// Insert a new account. A taken identifier is a `ConstraintViolation`.
pub fn insert_account(conn: &Connection, account: &Account) -> Result<(), DatabaseError> {
    let result = conn.execute(
        "INSERT INTO accounts (id, identifier, secret_hash, display_name, role, is_active,
         last_login, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            account.id.to_string(),
            account.identifier,
            account.secret_hash,
            account.display_name,
            account.role.as_str(),
            account.is_active as i32,
            account.last_login.as_ref().map(format_timestamp),
            format_timestamp(&account.created_at),
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(DatabaseError::ConstraintViolation(format!(
                "identifier already in use: {}",
                account.identifier
            )))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_account_by_identifier(
    conn: &Connection,
    identifier: &str,
) -> Result<Option<Account>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE identifier = ?1"),
            params![identifier],
            account_row_from_rusqlite,
        )
        .optional()?;
    row.map(account_from_row).transpose()
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY identifier"
    ))?;
    let rows = stmt.query_map([], account_row_from_rusqlite)?;

    let mut accounts = Vec::new();
    for row in rows {
        accounts.push(account_from_row(row?)?);
    }
    Ok(accounts)
}

pub fn count_accounts(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?)
}

/// Stamp a successful authentication.
pub fn record_login(
    conn: &Connection,
    identifier: &str,
    at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE accounts SET last_login = ?1 WHERE identifier = ?2",
        params![format_timestamp(at), identifier],
    )?;
    Ok(())
}

/// Deactivation is the only way an account leaves service; rows are never deleted.
pub fn deactivate_account(conn: &Connection, identifier: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE accounts SET is_active = 0 WHERE identifier = ?1",
        params![identifier],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "account".into(),
            id: identifier.to_string(),
        });
    }
    Ok(())
}

// Internal row type for Account mapping
struct AccountRow {
    id: String,
    identifier: String,
    secret_hash: String,
    display_name: String,
    role: String,
    is_active: i32,
    last_login: Option<String>,
    created_at: String,
}

fn account_row_from_rusqlite(row: &rusqlite::Row) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        identifier: row.get(1)?,
        secret_hash: row.get(2)?,
        display_name: row.get(3)?,
        role: row.get(4)?,
        is_active: row.get(5)?,
        last_login: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn account_from_row(row: AccountRow) -> Result<Account, DatabaseError> {
    Ok(Account {
        id: parse_uuid("accounts.id", &row.id)?,
        identifier: row.identifier,
        secret_hash: row.secret_hash,
        display_name: row.display_name,
        role: Role::from_str(&row.role)?,
        is_active: row.is_active != 0,
        last_login: row
            .last_login
            .as_deref()
            .map(|s| parse_timestamp("accounts.last_login", s))
            .transpose()?,
        created_at: parse_timestamp("accounts.created_at", &row.created_at)?,
    })
}
