// ABOUTME: Errors returned by provider gateway calls.
// ABOUTME: Distinguishes vanished instances and transient outages from hard rejections.

use crate::types::InstanceId;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The referenced instance no longer exists (usually a concurrent deletion).
    #[error("instance not found: {0}")]
    NotFound(InstanceId),

    /// Transport or authentication failure; worth retrying.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider refused the request.
    #[error("provider rejected {operation} ({status}): {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("{0} is not supported by this provider")]
    Unsupported(&'static str),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_))
    }
}
