//! # Error types
//!
//! Every fallible operation of the crate returns [`LabError`]. The menu layer
//! prints the error and keeps the loop running, nothing here is fatal.
use thiserror::Error;

/// error types for inventory, recipes, experiments and persistence
#[derive(Debug, Error)]
pub enum LabError {
    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: String },
    #[error("insufficient stock of '{reagent}': available {available}, required {required}")]
    InsufficientStock {
        reagent: String,
        available: f64,
        required: f64,
    },
    #[error("reagent '{reagent}' has no conversion from {from} to {to}")]
    UnsupportedConversion {
        reagent: String,
        from: String,
        to: String,
    },
    #[error("malformed data in {file}: {reason}")]
    MalformedData { file: String, reason: String },
    #[error("could not decode {file} with any supported encoding")]
    EncodingFailure { file: String },
    #[error("invalid value '{value}' for {field}")]
    InvalidInput { field: String, value: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LabError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        LabError::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn malformed(file: impl Into<String>, reason: impl Into<String>) -> Self {
        LabError::MalformedData {
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>) -> Self {
        LabError::InvalidInput {
            field: field.into(),
            value: value.into(),
        }
    }
}
