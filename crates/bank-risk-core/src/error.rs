use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskEngineError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {context} (need {required}, got {actual})")]
    InsufficientData {
        context: String,
        required: usize,
        actual: usize,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Coarse error classification used in batch failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InsufficientData,
    Configuration,
    Serialization,
}

impl RiskEngineError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RiskEngineError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn insufficient(context: impl Into<String>, required: usize, actual: usize) -> Self {
        RiskEngineError::InsufficientData {
            context: context.into(),
            required,
            actual,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RiskEngineError::InvalidInput { .. } => ErrorKind::Validation,
            RiskEngineError::InsufficientData { .. } => ErrorKind::InsufficientData,
            RiskEngineError::Configuration(_) => ErrorKind::Configuration,
            RiskEngineError::SerializationError(_) => ErrorKind::Serialization,
        }
    }

    /// Validation and data-sufficiency failures only disqualify the record
    /// they came from; everything else stops the run.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::InsufficientData
        )
    }
}

impl From<serde_json::Error> for RiskEngineError {
    fn from(e: serde_json::Error) -> Self {
        RiskEngineError::SerializationError(e.to_string())
    }
}
