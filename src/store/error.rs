use thiserror::Error;

/// Failure kinds surfaced by the mutation procedures. Anything raised after a
/// transaction was opened has already been rolled back by the time the caller
/// sees it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("book has no available copies")]
    OutOfStock,
    #[error("{0}")]
    InvalidState(String),
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("{0}")]
    ValidationFailure(String),
    #[error("database is busy, try again")]
    Busy,
    #[error("transaction failed: {0}")]
    TransactionFailure(rusqlite::Error),
}

impl StoreError {
    /// Stable machine-readable code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::OutOfStock => "out_of_stock",
            StoreError::InvalidState(_) => "invalid_state",
            StoreError::UnknownEntity(_) => "unknown_entity",
            StoreError::ValidationFailure(_) => "bad_params",
            StoreError::Busy => "busy",
            StoreError::TransactionFailure(_) => "db_failed",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, _) = &e {
            if matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) {
                return StoreError::Busy;
            }
        }
        StoreError::TransactionFailure(e)
    }
}

impl From<r2d2::Error> for StoreError {
    // Pool checkout only fails when every connection stayed claimed past the
    // checkout deadline, which callers handle the same way as a lock wait.
    fn from(_: r2d2::Error) -> Self {
        StoreError::Busy
    }
}
