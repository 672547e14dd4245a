use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::enums::Role;

/// A staff login. `secret_hash` never leaves the server.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub identifier: String,
    pub secret_hash: String,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Public view of an account, safe to return to callers.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.identifier.clone(),
            full_name: account.display_name.clone(),
            role: account.role,
            is_active: account.is_active,
            last_login: account.last_login,
        }
    }
}
