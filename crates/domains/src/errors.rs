//! # AppError
//!
//! Centralized error handling for the forum core.
//! Every failure surfaces to callers as one of these kinds; mapping kinds to
//! response codes is the request layer's job.

use thiserror::Error;

/// The primary error type for all forum operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Referenced entity is absent (post, comment, user, mark, vote).
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Business-rule violation: duplicate vote, karma floor, expired edit
    /// window, non-author mutation, comment with replies, self-vote.
    #[error("not allowed: {0}")]
    NotAllowed(String),

    /// Malformed or missing required input (e.g. empty title).
    #[error("bad values: {0}")]
    BadValues(String),

    /// No authenticated principal where one is required.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Infrastructure failure (e.g. store unavailable, corrupt row)
    #[error("internal service error: {0}")]
    Internal(String),
}

/// Stable, machine-readable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    NotAllowed,
    BadValues,
    Unauthenticated,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::NotAllowed => "not_allowed",
            ErrorKind::BadValues => "bad_values",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Internal => "internal",
        }
    }
}

impl AppError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        AppError::NotFound(entity.into(), id.to_string())
    }

    pub fn not_allowed(msg: impl Into<String>) -> Self {
        AppError::NotAllowed(msg.into())
    }

    pub fn bad_values(msg: impl Into<String>) -> Self {
        AppError::BadValues(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(..) => ErrorKind::NotFound,
            AppError::NotAllowed(_) => ErrorKind::NotAllowed,
            AppError::BadValues(_) => ErrorKind::BadValues,
            AppError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Port failures are infrastructure failures by definition; business outcomes
/// travel back from the ports as values, not errors.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}

/// A specialized Result type for forum logic.
pub type Result<T> = std::result::Result<T, AppError>;
