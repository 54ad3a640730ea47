use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValidationError {
    #[error("text is required")]
    EmptyText,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid {field}: {value}")]
    UnknownValue { field: &'static str, value: String },
}

/// Everything a caller of the orchestrator can see fail. Generation
/// failures never appear here; they degrade to the local fallback.
#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("usage limit reached: {current}/{limit} on the {plan} plan")]
    UsageLimitReached {
        current: u32,
        limit: i64,
        plan: String,
    },
    #[error("storage error: {0}")]
    Storage(String),
}

impl EnhanceError {
    pub fn code(&self) -> &'static str {
        match self {
            EnhanceError::Validation(_) => "validation_error",
            EnhanceError::UsageLimitReached { .. } => "usage_limit_reached",
            EnhanceError::Storage(_) => "storage_error",
        }
    }
}
