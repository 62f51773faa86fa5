//! Gateway error taxonomy
//!
//! Every handler catches these and logs them. None is fatal to the process
//! and none is retried.

use thiserror::Error;

/// Errors raised while translating controller input into remote commands
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Unknown device id referenced by the controller or the sink
    #[error("unknown device '{0}'")]
    NotFound(String),

    /// Remote call exceeded its deadline
    #[error("{context} timed out")]
    RemoteTimeout { context: String },

    /// Non-success status or transport error from the remote API
    #[error("{context} failed: {reason}")]
    RemoteFailure { context: String, reason: String },

    /// Value or message outside the expected shape
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GatewayError {
    /// Build a remote failure with `domain.service on entity` style context
    pub fn remote(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::RemoteFailure {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from the remote side (timeout or failure)
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteTimeout { .. } | Self::RemoteFailure { .. })
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
