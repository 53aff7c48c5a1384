//! Errors raised by the remote source clients (GitHub, skill catalog).
//!
//! Everything above the clients works with `anyhow`; these variants exist so
//! callers can tell a rate-limit from a 404 from a decode failure before
//! deciding to degrade to an empty result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate limit exhausted (resets at {reset})")]
    RateLimited { reset: i64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SourceError {
    /// Whether the failure is worth logging at warn level rather than debug.
    /// A 404 or 409 (empty repository) is an expected absence of data.
    pub fn is_expected_absence(&self) -> bool {
        match self {
            SourceError::NotFound(_) => true,
            SourceError::Status { status, .. } => *status == 404 || *status == 409,
            _ => false,
        }
    }
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;
