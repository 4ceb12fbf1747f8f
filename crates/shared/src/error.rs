use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ContactField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    TargetMissing,
    DeliveryFailure,
    Unsupported,
}

/// Serialisable error record surfaced in page snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageError {
    pub code: ErrorCode,
    pub message: String,
}

impl PageError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the {0} field is required")]
    EmptyField(ContactField),
    #[error("'{0}' is not a valid email address")]
    MalformedEmail(String),
}

impl From<ValidationError> for PageError {
    fn from(value: ValidationError) -> Self {
        Self::new(ErrorCode::Validation, value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryError {
    #[error("message delivery failed: {message}")]
    Transport { message: String },
    #[error("relay endpoint rejected the message with status {status}")]
    Rejected { status: u16 },
}

impl From<DeliveryError> for PageError {
    fn from(value: DeliveryError) -> Self {
        Self::new(ErrorCode::DeliveryFailure, value.to_string())
    }
}
