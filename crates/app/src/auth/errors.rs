//! Auth service errors.

use thiserror::Error;

use crate::auth::ApiTokenError;

#[derive(Debug, Error)]
pub enum AuthServiceError {
    /// Unknown, malformed or revoked token. Callers never learn which.
    #[error("token not found")]
    NotFound,

    #[error("storage error")]
    Sql(#[source] sqlx::Error),

    #[error("token processing error")]
    Token(#[from] ApiTokenError),
}

impl From<sqlx::Error> for AuthServiceError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Sql(other),
        }
    }
}
