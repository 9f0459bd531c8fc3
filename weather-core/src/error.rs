use thiserror::Error;

use crate::locations::MAX_SAVED_LOCATIONS;

/// Every failure the service can report, one variant per taxonomy member.
///
/// Display strings double as the client-facing messages, so keep them stable.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing `q` query parameter")]
    InvalidQuery,

    #[error("Invalid or missing `lat`/`lon`")]
    InvalidCoordinates,

    #[error("{0}")]
    InvalidInput(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Max {} saved locations", MAX_SAVED_LOCATIONS)]
    CapacityExceeded,

    #[error("Location already saved")]
    DuplicateLocation,

    #[error("Email already in use")]
    EmailInUse,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing or invalid bearer token")]
    Unauthorized,

    #[error("Token does not grant access to this user")]
    Forbidden,

    #[error("Upstream provider error: {0:#}")]
    Upstream(anyhow::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures raised by a [`crate::store::UserStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("no user with id {0}")]
    UserNotFound(String),

    #[error("{0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Backend(format!("malformed user document: {e}"))
    }
}
