//! Ledger error types

use thiserror::Error;

/// Errors from ledger and subscription operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Insufficient tokens")]
    InsufficientTokens,

    #[error("License code already registered")]
    LicenseExists,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Database(err.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors from webhook reconciliation. The variants map one-to-one onto
/// the HTTP statuses the provider keys its retry behavior off.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid callback token")]
    Unauthorized,

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("No customer email in payload")]
    MissingEmail,

    #[error("No account for email: {0}")]
    UnknownAccount(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<sqlx::Error> for WebhookError {
    fn from(err: sqlx::Error) -> Self {
        WebhookError::Ledger(LedgerError::from(err))
    }
}
