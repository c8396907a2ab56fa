//! Progress events for long-running operations
//!
//! The poller reports what it observes through an optional callback so the
//! CLI can drive a spinner while library callers simply pass `None`.

use crate::state::ProvisioningState;
use std::time::Duration;

/// Progress events emitted while tracking an operation
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Poll session started for an operation
    Started { operation_id: String },
    /// One status query completed
    Polling {
        operation_id: String,
        state: ProvisioningState,
        elapsed: Duration,
        attempt: u32,
    },
    /// Remote reported success
    Succeeded { operation_id: String },
    /// Remote reported failure
    Failed { operation_id: String, reason: String },
    /// Remote escalated the request for manual approval
    Escalated {
        operation_id: String,
        status_url: String,
    },
    /// Deadline expired before a terminal state
    TimedOut {
        operation_id: String,
        last_state: ProvisioningState,
    },
    /// Caller cancelled the wait
    Cancelled { operation_id: String },
}

/// Callback type for progress updates
///
/// CLI can use this to update spinners/progress bars.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Helper to emit progress events
pub(crate) fn emit(callback: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_emit_without_callback_is_noop() {
        emit(
            &None,
            ProgressEvent::Started {
                operation_id: "op".to_string(),
            },
        );
    }

    #[test]
    fn test_emit_forwards_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: Option<ProgressCallback> =
            Some(Box::new(move |event| sink.lock().unwrap().push(event)));

        emit(
            &callback,
            ProgressEvent::Succeeded {
                operation_id: "op-1".to_string(),
            },
        );

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ProgressEvent::Succeeded {
                operation_id: "op-1".to_string()
            }]
        );
    }
}
