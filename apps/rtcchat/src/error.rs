//! # API Errors
//!
//! Errors a GraphQL resolver can report. Their `Display` text is the message
//! clients see, so it is kept stable. Storage failures that are not the
//! caller's fault are logged and reported as a generic internal error.

use rtcchat_core::{StoreError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Wrong credentials")]
    WrongCredentials,

    #[error("Too many login attempts, try again later")]
    RateLimited,

    #[error("Not allowed: {0}")]
    Forbidden(&'static str),

    #[error("User {0} not found")]
    UnknownUser(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Not available in this environment")]
    Disabled,

    #[error("Internal server error")]
    Internal,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid(e) => Self::Invalid(e),
            StoreError::NameTaken(_)
            | StoreError::UserNotFound(_)
            | StoreError::ConnectionNotFound(_)
            | StoreError::MessageNotFound(_)
            | StoreError::SelfConnection => Self::Rejected(err.to_string()),
            StoreError::Database(_) | StoreError::Encoding(_) | StoreError::Io(_) => {
                tracing::error!(error = %err, "Storage failure");
                Self::Internal
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
