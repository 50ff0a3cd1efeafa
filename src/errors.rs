use sea_orm::error::DbErr;
use serde::Serialize;

/// Typed error surface for every ledger operation.
///
/// Synchronous callers (queries, admin calls) receive these directly; the
/// command intake logs them per line item and keeps processing siblings.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Insufficient reserved quantity: {0}")]
    InsufficientReservedQuantity(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Concurrent modification of product {0}")]
    ConcurrentModification(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Whether the caller may retry the exact same call and expect progress.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::ConcurrentModification(_))
    }
}

/// Alias kept for infrastructure code (DB setup, migrations).
pub type AppError = ServiceError;
