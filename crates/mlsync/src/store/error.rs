use sea_orm::DbErr;
use thiserror::Error;

/// Errors from a [`SyncStore`](super::SyncStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl StoreError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Lock contention and dropped connections are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(db_err) => is_retryable_db_error(db_err),
            _ => false,
        }
    }
}

fn is_retryable_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(_) | DbErr::Query(_) => {
            let err_str = err.to_string().to_lowercase();
            // SQLite: database is locked, busy
            err_str.contains("locked")
                || err_str.contains("busy")
                || err_str.contains("timeout")
                || err_str.contains("connection")
                || err_str.contains("temporarily unavailable")
        }
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::RuntimeErr;

    #[test]
    fn locked_database_is_retryable() {
        let err = StoreError::from(DbErr::Exec(RuntimeErr::Internal(
            "database is locked".to_string(),
        )));
        assert!(err.is_retryable());
    }

    #[test]
    fn constraint_violation_is_not_retryable() {
        let err = StoreError::from(DbErr::Exec(RuntimeErr::Internal(
            "UNIQUE constraint failed: synced_records.id".to_string(),
        )));
        assert!(!err.is_retryable());
        assert!(!StoreError::invalid("missing key").is_retryable());
    }
}
