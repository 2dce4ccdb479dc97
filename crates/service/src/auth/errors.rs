use thiserror::Error;

/// Failures of the sign-up, sign-in and token workflows.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    /// Email already registered.
    #[error("email already registered")]
    Conflict,
    /// Unknown user, wrong password, or a disabled/deleted account.
    #[error("invalid credentials")]
    Unauthorized,
    #[error("password hashing failed: {0}")]
    HashError(String),
    #[error("token error: {0}")]
    TokenError(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl AuthError {
    /// Stable numeric code for logs and external mapping.
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::Conflict => 1002,
            AuthError::Unauthorized => 1004,
            AuthError::HashError(_) => 1101,
            AuthError::TokenError(_) => 1102,
            AuthError::Repository(_) => 1200,
        }
    }
}
