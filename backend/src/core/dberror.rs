use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    ConnectionFailed(sqlx::Error),

    #[error("Database operation failed: {0}")]
    OperationFailed(sqlx::Error),

    #[error("Row not found: {0}")]
    RowNotFound(sqlx::Error),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::RowNotFound(error),
            sqlx::Error::Database(ref e) if e.is_unique_violation() => Self::UniqueViolation(error),
            _ => Self::OperationFailed(error),
        }
    }
}
