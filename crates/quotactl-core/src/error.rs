//! Unified error handling for quotactl-core
//!
//! Transport failures keep the phase they happened in (submit, status query,
//! final read) so callers can tell a failed submission from a read that
//! failed after the operation already succeeded upstream.
//!
//! # Example
//!
//! ```rust
//! use quotactl_core::{ApiError, CoreError};
//!
//! let err = CoreError::Fetch(ApiError::NotFound {
//!     message: "limit not readable yet".to_string(),
//! });
//! assert!(err.is_not_found());
//! assert!(!err.is_retryable());
//! ```

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::state::ProvisioningState;
use std::time::Duration;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Submit response carried no status location to track
    #[error("Submit response did not include an operation status location")]
    MissingOperationLocation,

    /// Status location present but unusable
    #[error("Invalid operation status location '{location}': {reason}")]
    InvalidOperationLocation { location: String, reason: String },

    /// Initial mutating call failed
    #[error("Submission failed: {0}")]
    Submission(#[source] ApiError),

    /// Re-reading operation status failed
    #[error("Operation status query failed: {0}")]
    StatusQuery(#[source] ApiError),

    /// Reading the final resource failed after the operation succeeded
    #[error("Operation succeeded but reading the final resource failed: {0}")]
    Fetch(#[source] ApiError),

    /// Remote reported `Failed`
    #[error("Operation {operation_id} failed: {reason}")]
    RemoteFailed {
        operation_id: String,
        reason: String,
    },

    /// Remote reported `Escalated`; needs out-of-band approval
    #[error("Operation {operation_id} was escalated for manual approval; check {status_url}")]
    RemoteEscalated {
        operation_id: String,
        status_url: String,
    },

    /// Deadline expired before a terminal state was observed
    #[error(
        "Operation {operation_id} did not reach a terminal state within {deadline:?} (last state: {last_state}); check {status_url}"
    )]
    TimedOut {
        operation_id: String,
        status_url: String,
        last_state: ProvisioningState,
        deadline: Duration,
    },

    /// Caller cancelled the wait
    #[error("Operation tracking was cancelled")]
    Cancelled { status_url: Option<String> },

    /// Validation error (e.g. empty resource name)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport error outside any LRO phase (plain reads)
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    fn api_error(&self) -> Option<&ApiError> {
        match self {
            CoreError::Submission(e)
            | CoreError::StatusQuery(e)
            | CoreError::Fetch(e)
            | CoreError::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_not_found)
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_unauthorized)
    }

    /// Returns true if this is a timeout, local or remote
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::TimedOut { .. })
            || self.api_error().is_some_and(ApiError::is_timeout)
    }

    /// Returns true if this is a bad request error (400)
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        match self {
            CoreError::Validation(_) => true,
            _ => self
                .api_error()
                .is_some_and(|e| matches!(e, ApiError::BadRequest { .. })),
        }
    }

    /// Returns true if this error is potentially retryable
    ///
    /// A timed-out wait can be resumed with a fresh poll session; a failed or
    /// escalated operation cannot.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::TimedOut { .. } => true,
            CoreError::MissingOperationLocation
            | CoreError::InvalidOperationLocation { .. }
            | CoreError::RemoteFailed { .. }
            | CoreError::RemoteEscalated { .. } => false,
            _ => self.api_error().is_some_and(ApiError::is_retryable),
        }
    }

    /// Status URL to resume tracking from, when the error carries one
    pub fn status_url(&self) -> Option<&str> {
        match self {
            CoreError::RemoteEscalated { status_url, .. }
            | CoreError::TimedOut { status_url, .. } => Some(status_url),
            CoreError::Cancelled { status_url } => status_url.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_errors_delegate_helpers() {
        let err = CoreError::StatusQuery(ApiError::RateLimited {
            message: "slow down".to_string(),
        });
        assert!(err.is_retryable());
        assert!(!err.is_not_found());

        let err = CoreError::Submission(ApiError::Unauthorized {
            message: "expired token".to_string(),
        });
        assert!(err.is_unauthorized());
        assert!(!err.is_retryable());

        let err = CoreError::Fetch(ApiError::NotFound {
            message: "missing".to_string(),
        });
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_location_is_not_retryable() {
        let err = CoreError::MissingOperationLocation;
        assert!(!err.is_retryable());
        assert!(err.status_url().is_none());
    }

    #[test]
    fn test_timed_out_carries_resume_context() {
        let err = CoreError::TimedOut {
            operation_id: "op-123".to_string(),
            status_url: "https://x/ops/op-123".to_string(),
            last_state: ProvisioningState::InProgress,
            deadline: Duration::from_secs(120),
        };
        assert!(err.is_timeout());
        assert!(err.is_retryable());
        assert_eq!(err.status_url(), Some("https://x/ops/op-123"));
        assert!(err.to_string().contains("InProgress"));
    }

    #[test]
    fn test_escalated_is_terminal_and_points_at_status() {
        let err = CoreError::RemoteEscalated {
            operation_id: "op-9".to_string(),
            status_url: "https://x/ops/op-9".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("https://x/ops/op-9"));
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = CoreError::Validation("empty group name".to_string());
        assert!(err.is_bad_request());
        assert!(!err.is_retryable());
    }
}
