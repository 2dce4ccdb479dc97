use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Entity-level failures: field validation or a rejected database call.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{0}")]
    Validation(String),
    /// A unique index refused the row, e.g. two concurrent sign-ups.
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Db(String),
}

impl From<DbErr> for ModelError {
    fn from(e: DbErr) -> Self { ModelError::Db(e.to_string()) }
}

impl ModelError {
    /// Map an insert failure, turning unique-index violations into `Conflict`.
    pub fn on_insert(e: DbErr, conflict: &str) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ModelError::Conflict(conflict.to_string()),
            _ => ModelError::from(e),
        }
    }
}
