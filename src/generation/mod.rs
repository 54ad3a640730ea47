pub mod client;
pub mod retry;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use client::GenerationClient;
pub use retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorKind {
    BadRequest,
    Auth,
    AccessDenied,
    RateLimited,
    Server,
    Timeout,
    Network,
    NoContent,
    Unknown,
}

impl GenerationErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => GenerationErrorKind::BadRequest,
            401 => GenerationErrorKind::Auth,
            403 => GenerationErrorKind::AccessDenied,
            429 => GenerationErrorKind::RateLimited,
            500..=599 => GenerationErrorKind::Server,
            _ => GenerationErrorKind::Unknown,
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            GenerationErrorKind::Timeout | GenerationErrorKind::Server | GenerationErrorKind::Network
        )
    }

    pub fn code(self) -> &'static str {
        match self {
            GenerationErrorKind::BadRequest => "bad_request",
            GenerationErrorKind::Auth => "auth_error",
            GenerationErrorKind::AccessDenied => "access_denied",
            GenerationErrorKind::RateLimited => "rate_limited",
            GenerationErrorKind::Server => "server_error",
            GenerationErrorKind::Timeout => "timeout",
            GenerationErrorKind::Network => "network_error",
            GenerationErrorKind::NoContent => "no_content",
            GenerationErrorKind::Unknown => "unknown",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("generation failed ({}): {message}", .kind.code())]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn from_status(status: u16, detail: &str) -> Self {
        let detail = detail.trim();
        let message = if detail.is_empty() {
            format!("generation API error: {}", status)
        } else {
            format!("generation API error: {} {}", status, detail)
        };
        Self {
            kind: GenerationErrorKind::from_status(status),
            status: Some(status),
            message,
        }
    }
}

/// One generation call for one slot. Implementations own their retry budget.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, instruction: &str, platform_label: &str) -> Result<String, GenerationError>;
}
