use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{RenderError, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    IndexOutOfRange,
    Storage,
    Serialization,
    Deserialization,
    Render,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::IndexOutOfRange => "INDEX_OUT_OF_RANGE",
            Self::Storage => "STORAGE_ERROR",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Render => "RENDER_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Storage | Self::Render => ErrorSeverity::Transient,
            Self::Validation
            | Self::IndexOutOfRange
            | Self::Serialization
            | Self::Deserialization => ErrorSeverity::Permanent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("content cannot be empty")]
    EmptyContent,
    #[error("no rendered image to save")]
    MissingImage,
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} is not a valid hex colour: {value}")]
    InvalidColor { field: &'static str, value: String },
    #[error("unsupported barcode format: {0}")]
    UnknownBarcodeFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("index {index} out of range for {len} saved items")]
pub struct IndexError {
    pub index: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Failure moving the saved collection to or from the backend.
///
/// Never fatal: the in-memory collection stays authoritative for the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PersistenceError {
    #[error("serialization failed: {0}")]
    SerializationFailed(String),
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),
    #[error("storage read failed: {0}")]
    ReadFailed(StorageError),
    #[error("storage write failed: {0}")]
    WriteFailed(StorageError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::IndexOutOfRange => "That saved code no longer exists.".into(),
            ErrorKind::Storage => {
                "Saved codes could not be stored. They are kept for this session only.".into()
            }
            ErrorKind::Serialization | ErrorKind::Deserialization => {
                "Saved codes could not be read. Starting with an empty gallery.".into()
            }
            ErrorKind::Render => "Error generating code".into(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<IndexError> for AppError {
    fn from(e: IndexError) -> Self {
        AppError::new(ErrorKind::IndexOutOfRange, e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(e) => e.into(),
            StoreError::Index(e) => e.into(),
        }
    }
}

impl From<PersistenceError> for AppError {
    fn from(e: PersistenceError) -> Self {
        let kind = match &e {
            PersistenceError::SerializationFailed(_) => ErrorKind::Serialization,
            PersistenceError::DeserializationFailed(_) => ErrorKind::Deserialization,
            PersistenceError::ReadFailed(_) | PersistenceError::WriteFailed(_) => {
                ErrorKind::Storage
            }
        };
        AppError::new(kind, e.to_string())
    }
}

impl From<RenderError> for AppError {
    fn from(e: RenderError) -> Self {
        AppError::new(ErrorKind::Render, e.to_string())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            error_code: e.code().to_string(),
        }
    }
}
