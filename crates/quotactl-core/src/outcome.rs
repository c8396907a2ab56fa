//! Caller-visible results of tracking an operation
//!
//! [`Outcome`] is the only value the tracker hands back. Every variant that
//! is not a success carries the operation handle, so an operator can inspect
//! or resume tracking by hand.

use crate::error::CoreError;
use crate::operation::OperationHandle;
use crate::state::ProvisioningState;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Final result of one tracked operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Operation succeeded; `resource` is the follow-up read of the final state.
    ///
    /// `operation` is `None` when the submit call completed synchronously.
    Success {
        operation: Option<OperationHandle>,
        resource: Value,
    },
    /// Remote reported `Failed`; resubmit to retry
    Failed {
        operation: OperationHandle,
        reason: String,
    },
    /// Needs out-of-band approval
    Escalated { operation: OperationHandle },
    /// Deadline expired while the operation was still pending
    TimedOut {
        operation: OperationHandle,
        last_state: ProvisioningState,
        deadline: Duration,
    },
    /// Caller cancelled before a terminal state
    Cancelled { operation: Option<OperationHandle> },
}

impl Outcome {
    /// Short lowercase tag (`succeeded`, `failed`, `escalated`, `timed_out`, `cancelled`)
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "succeeded",
            Outcome::Failed { .. } => "failed",
            Outcome::Escalated { .. } => "escalated",
            Outcome::TimedOut { .. } => "timed_out",
            Outcome::Cancelled { .. } => "cancelled",
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn operation(&self) -> Option<&OperationHandle> {
        match self {
            Outcome::Success { operation, .. } | Outcome::Cancelled { operation } => {
                operation.as_ref()
            }
            Outcome::Failed { operation, .. }
            | Outcome::Escalated { operation }
            | Outcome::TimedOut { operation, .. } => Some(operation),
        }
    }

    /// Resource snapshot for successful outcomes
    pub fn resource(&self) -> Option<&Value> {
        match self {
            Outcome::Success { resource, .. } => Some(resource),
            _ => None,
        }
    }

    /// Convert into a `Result` for callers that only care about success
    pub fn into_result(self) -> Result<Value, CoreError> {
        match self {
            Outcome::Success { resource, .. } => Ok(resource),
            Outcome::Failed { operation, reason } => Err(CoreError::RemoteFailed {
                operation_id: operation.operation_id().to_string(),
                reason,
            }),
            Outcome::Escalated { operation } => Err(CoreError::RemoteEscalated {
                operation_id: operation.operation_id().to_string(),
                status_url: operation.status_url().to_string(),
            }),
            Outcome::TimedOut {
                operation,
                last_state,
                deadline,
            } => Err(CoreError::TimedOut {
                operation_id: operation.operation_id().to_string(),
                status_url: operation.status_url().to_string(),
                last_state,
                deadline,
            }),
            Outcome::Cancelled { operation } => Err(CoreError::Cancelled {
                status_url: operation.map(|o| o.status_url().to_string()),
            }),
        }
    }

    /// Serializable summary for output
    pub fn report(&self) -> Report {
        let operation = self.operation();
        let (message, last_state) = match self {
            Outcome::Success { .. } => ("Operation succeeded".to_string(), None),
            Outcome::Failed { reason, .. } => (format!("Operation failed: {}", reason), None),
            Outcome::Escalated { operation } => (
                format!(
                    "Request was escalated; contact your capacity manager. Check status with a GET on {}",
                    operation.status_url()
                ),
                None,
            ),
            Outcome::TimedOut {
                operation,
                last_state,
                deadline,
            } => (
                format!(
                    "Did not reach a terminal state within {}s. Check status with a GET on {}",
                    deadline.as_secs(),
                    operation.status_url()
                ),
                Some(last_state.clone()),
            ),
            Outcome::Cancelled { .. } => ("Stopped waiting: cancelled".to_string(), None),
        };
        Report {
            outcome: self.kind(),
            operation_id: operation.map(|o| o.operation_id().to_string()),
            status_url: operation.map(|o| o.status_url().to_string()),
            last_state,
            message,
            resource: self.resource().cloned(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report().message)
    }
}

/// Flat, serializable view of an [`Outcome`]
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_state: Option<ProvisioningState>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use url::Url;

    fn handle() -> OperationHandle {
        OperationHandle::new(Url::parse("https://x/requests/op-123").unwrap(), "op-123")
    }

    #[test]
    fn test_timed_out_report_includes_status_url() {
        let outcome = Outcome::TimedOut {
            operation: handle(),
            last_state: ProvisioningState::InProgress,
            deadline: Duration::from_secs(120),
        };

        let report = outcome.report();
        assert_eq!(report.outcome, "timed_out");
        assert_eq!(report.status_url.as_deref(), Some("https://x/requests/op-123"));
        assert!(report.message.contains("120s"));
        assert!(report.message.contains("https://x/requests/op-123"));
        assert_eq!(report.last_state, Some(ProvisioningState::InProgress));
    }

    #[test]
    fn test_escalated_is_not_success_or_failure() {
        let outcome = Outcome::Escalated {
            operation: handle(),
        };
        assert!(!outcome.is_success());
        assert_eq!(outcome.kind(), "escalated");
        assert!(outcome.to_string().contains("https://x/requests/op-123"));

        let err = outcome.into_result().unwrap_err();
        assert!(matches!(err, CoreError::RemoteEscalated { .. }));
    }

    #[test]
    fn test_success_into_result_yields_resource() {
        let outcome = Outcome::Success {
            operation: Some(handle()),
            resource: json!({"name": "cores"}),
        };
        assert_eq!(outcome.resource(), Some(&json!({"name": "cores"})));
        assert_eq!(outcome.into_result().unwrap(), json!({"name": "cores"}));
    }

    #[test]
    fn test_failed_into_result_keeps_reason() {
        let outcome = Outcome::Failed {
            operation: handle(),
            reason: "insufficient capacity".to_string(),
        };
        match outcome.into_result() {
            Err(CoreError::RemoteFailed {
                operation_id,
                reason,
            }) => {
                assert_eq!(operation_id, "op-123");
                assert_eq!(reason, "insufficient capacity");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_report_serialization_skips_empty_fields() {
        let outcome = Outcome::Cancelled { operation: None };
        let json = serde_json::to_value(outcome.report()).unwrap();
        assert_eq!(
            json,
            json!({"outcome": "cancelled", "message": "Stopped waiting: cancelled"})
        );
    }
}
