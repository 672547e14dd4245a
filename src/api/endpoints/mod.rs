//! API endpoint handlers.
//!
//! Each module corresponds to one resource under `/api/`.
//! Handlers stay thin: validation and the codec live in `records`.

pub mod accounts;
pub mod appointments;
pub mod audit;
pub mod auth;
pub mod health;
pub mod patients;
pub mod payments;
pub mod reports;

use serde::Serialize;

use crate::api::error::ApiError;
use crate::auth::AccountContext;

/// Body returned by the create routes.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Reject callers without the admin role.
pub(crate) fn require_admin(account: &AccountContext) -> Result<(), ApiError> {
    if account.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
