use crate::store::StoreError;
use crate::validation::FieldError;
use serde_json::{json, Value};
use thiserror::Error;

/// Failure of one user action. Nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AuthFailed(String),
    #[error("sign in first")]
    Unauthenticated,
    #[error("{0}")]
    BadParams(String),
    #[error(transparent)]
    Backend(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError {
            field,
            message: message.into(),
        }])
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::Duplicate(_) => "duplicate",
            Self::NotFound(_) => "not_found",
            Self::AuthFailed(_) => "auth_failed",
            Self::Unauthenticated => "unauthenticated",
            Self::BadParams(_) => "bad_params",
            Self::Backend(_) => "backend_failed",
            Self::Io(_) => "io_failed",
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Validation(fields) => Some(json!({ "fields": fields })),
            _ => None,
        }
    }

    /// Backend and I/O failures are unexpected; the rest are answers to bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Io(_))
    }
}
