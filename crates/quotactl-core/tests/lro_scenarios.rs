//! End-to-end tracking scenarios on a virtual clock
//!
//! Every test drives `track`/`resume` against a scripted operation, so the
//! 30s/120s cadence runs instantly and query/fetch counts are exact.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use quotactl_core::{
    ApiError, CancellationToken, CoreError, InitialResponse, LongRunningOperation, ManualClock,
    OperationHandle, Outcome, PollSettings, Poller, ProgressCallback, ProgressEvent,
    ProvisioningState, StatusReport, StatusSource, resume, track,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

const STATUS_URL: &str =
    "https://management.azure.com/providers/Microsoft.Management/managementGroups/mg/providers/Microsoft.Quota/groupQuotas/g1/groupQuotaRequests/op-123?api-version=2023-06-01-preview";

/// Scripted long-running operation
struct ScriptedOperation {
    initial: InitialResponse,
    states: Mutex<VecDeque<&'static str>>,
    hang: bool,
    yield_first: bool,
    query_error: bool,
    fetch_error: bool,
    synchronous: bool,
    queries: AtomicU32,
    fetches: AtomicU32,
}

impl ScriptedOperation {
    fn new(states: &[&'static str]) -> Self {
        Self {
            initial: InitialResponse {
                status: 202,
                status_location: Some(STATUS_URL.to_string()),
                body: Value::Null,
            },
            states: Mutex::new(states.iter().copied().collect()),
            hang: false,
            yield_first: false,
            query_error: false,
            fetch_error: false,
            synchronous: false,
            queries: AtomicU32::new(0),
            fetches: AtomicU32::new(0),
        }
    }

    fn queries(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }

    fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedOperation {
    async fn query_status(&self, handle: &OperationHandle) -> Result<StatusReport, ApiError> {
        assert_eq!(handle.operation_id(), "op-123");
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.yield_first {
            // Stands in for real I/O: the query is pending at least once
            tokio::task::yield_now().await;
        }
        if self.query_error {
            return Err(ApiError::ServerError {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        let state = self
            .states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or("InProgress");
        let raw = json!({
            "properties": {
                "provisioningState": state,
                "message": format!("request is {}", state),
            }
        });
        Ok(StatusReport::new(ProvisioningState::parse(state), raw))
    }
}

#[async_trait]
impl LongRunningOperation for ScriptedOperation {
    fn describe(&self) -> String {
        "scripted operation".to_string()
    }

    async fn submit(&self) -> Result<InitialResponse, ApiError> {
        Ok(self.initial.clone())
    }

    async fn fetch_result(&self) -> Result<Value, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fetch_error {
            return Err(ApiError::NotFound {
                message: "limit not readable yet".to_string(),
            });
        }
        Ok(json!({ "name": "cores", "properties": { "limit": 50 } }))
    }

    fn allows_synchronous_completion(&self) -> bool {
        self.synchronous
    }
}

fn poller(clock: &ManualClock) -> Poller {
    Poller::default().with_clock(clock.clone())
}

fn recorder() -> (Arc<Mutex<Vec<ProgressEvent>>>, ProgressCallback) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let callback: ProgressCallback = Box::new(move |event| sink.lock().unwrap().push(event));
    (events, callback)
}

// ============================================================================
// Terminal states
// ============================================================================

#[tokio::test]
async fn test_success_after_two_in_progress_polls() {
    let clock = ManualClock::new();
    let operation = ScriptedOperation::new(&["InProgress", "InProgress", "Succeeded"]);

    let outcome = track(&poller(&clock), &operation).await.unwrap();

    match &outcome {
        Outcome::Success {
            operation: Some(handle),
            resource,
        } => {
            assert_eq!(handle.operation_id(), "op-123");
            assert_eq!(resource["properties"]["limit"], 50);
        }
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(operation.queries(), 3);
    assert_eq!(operation.fetches(), 1);
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_secs(30), Duration::from_secs(30)]
    );
}

#[tokio::test]
async fn test_pending_until_deadline_times_out_after_four_queries() {
    let clock = ManualClock::new();
    let operation = ScriptedOperation::new(&[]);

    let outcome = track(&poller(&clock), &operation).await.unwrap();

    match &outcome {
        Outcome::TimedOut {
            operation: handle,
            last_state,
            deadline,
        } => {
            assert_eq!(handle.status_url().as_str(), STATUS_URL);
            assert_eq!(*last_state, ProvisioningState::InProgress);
            assert_eq!(*deadline, Duration::from_secs(120));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(operation.queries(), 4);
    assert_eq!(operation.fetches(), 0);
    assert_eq!(clock.elapsed(), Duration::from_secs(120));

    let report = outcome.report();
    assert_eq!(report.outcome, "timed_out");
    assert!(report.message.contains(STATUS_URL));
}

#[tokio::test]
async fn test_escalated_exits_without_fetch() {
    let clock = ManualClock::new();
    let operation = ScriptedOperation::new(&["Accepted", "Escalated", "Succeeded"]);

    let outcome = track(&poller(&clock), &operation).await.unwrap();

    assert!(matches!(outcome, Outcome::Escalated { .. }));
    assert_eq!(operation.queries(), 2);
    assert_eq!(operation.fetches(), 0);
    assert_eq!(outcome.report().status_url.as_deref(), Some(STATUS_URL));

    let err = outcome.into_result().unwrap_err();
    assert!(matches!(err, CoreError::RemoteEscalated { .. }));
    assert_eq!(err.status_url(), Some(STATUS_URL));
}

#[tokio::test]
async fn test_failed_is_terminal() {
    let clock = ManualClock::new();
    let operation = ScriptedOperation::new(&["InProgress", "Failed", "Succeeded"]);

    let outcome = track(&poller(&clock), &operation).await.unwrap();

    match &outcome {
        Outcome::Failed { reason, .. } => assert_eq!(reason, "request is Failed"),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(operation.queries(), 2);
    assert_eq!(operation.fetches(), 0);
}

#[tokio::test]
async fn test_query_that_awaits_io_is_not_cut_short() {
    let clock = ManualClock::new();
    let mut operation = ScriptedOperation::new(&["InProgress", "InProgress", "Succeeded"]);
    operation.yield_first = true;

    let outcome = track(&poller(&clock), &operation).await.unwrap();

    assert!(outcome.is_success(), "got {:?}", outcome);
    assert_eq!(operation.queries(), 3);
    assert_eq!(operation.fetches(), 1);
    assert_eq!(clock.elapsed(), Duration::from_secs(60));
}

#[tokio::test]
async fn test_near_miss_state_names_keep_polling() {
    let clock = ManualClock::new();
    let operation = ScriptedOperation::new(&["Canceled", "Completed", "Succeeded"]);

    let outcome = track(&poller(&clock), &operation).await.unwrap();

    assert!(outcome.is_success(), "got {:?}", outcome);
    assert_eq!(operation.queries(), 3);
    assert_eq!(operation.fetches(), 1);
}

#[tokio::test]
async fn test_zero_interval_is_rejected_before_submit() {
    let clock = ManualClock::new();
    let poller = Poller::new(PollSettings::new(Duration::ZERO, Duration::from_secs(120)))
        .with_clock(clock.clone());
    let operation = ScriptedOperation::new(&["Succeeded"]);

    let err = track(&poller, &operation).await.unwrap_err();

    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(operation.queries(), 0);
}

#[tokio::test]
async fn test_unrecognised_state_keeps_polling() {
    let clock = ManualClock::new();
    let operation = ScriptedOperation::new(&["Queued", "PendingReview", "Succeeded"]);

    let outcome = track(&poller(&clock), &operation).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(operation.queries(), 3);
}

// ============================================================================
// Cancellation and hung calls
// ============================================================================

#[tokio::test]
async fn test_cancel_between_ticks() {
    let clock = ManualClock::new();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let on_progress: ProgressCallback = Box::new(move |event| {
        if matches!(event, ProgressEvent::Polling { attempt: 1, .. }) {
            trigger.cancel();
        }
    });
    let poller = poller(&clock)
        .with_cancellation(cancel)
        .with_progress(Some(on_progress));
    let operation = ScriptedOperation::new(&["InProgress", "Succeeded"]);

    let outcome = track(&poller, &operation).await.unwrap();

    match &outcome {
        Outcome::Cancelled {
            operation: Some(handle),
        } => assert_eq!(handle.operation_id(), "op-123"),
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert_eq!(operation.queries(), 1);
    assert_eq!(operation.fetches(), 0);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_cancelled_before_submit() {
    let clock = ManualClock::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let operation = ScriptedOperation::new(&["Succeeded"]);

    let outcome = track(&poller(&clock).with_cancellation(cancel), &operation)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Cancelled { operation: None });
    assert_eq!(operation.queries(), 0);
}

#[tokio::test]
async fn test_hung_query_is_bounded_by_per_call_timeout() {
    let clock = ManualClock::new();
    let settings = PollSettings::default().with_per_call_timeout(Duration::from_secs(10));
    let poller = Poller::new(settings).with_clock(clock.clone());
    let mut operation = ScriptedOperation::new(&[]);
    operation.hang = true;

    // A hung call never moves virtual time, so push it along from outside
    let driver = async {
        loop {
            tokio::task::yield_now().await;
            clock.advance(Duration::from_secs(10));
        }
    };
    let outcome = tokio::select! {
        biased;
        outcome = track(&poller, &operation) => outcome.unwrap(),
        _ = driver => unreachable!("driver never finishes"),
    };

    match &outcome {
        Outcome::TimedOut { last_state, .. } => {
            assert_eq!(*last_state, ProvisioningState::Accepted)
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    // query 10s + pause 30s, three times, lands exactly on the deadline
    assert_eq!(operation.queries(), 3);
    assert_eq!(clock.elapsed(), Duration::from_secs(120));
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_missing_status_location() {
    let clock = ManualClock::new();
    let mut operation = ScriptedOperation::new(&["Succeeded"]);
    operation.initial.status_location = None;

    let err = track(&poller(&clock), &operation).await.unwrap_err();

    assert!(matches!(err, CoreError::MissingOperationLocation));
    assert_eq!(operation.queries(), 0);
}

#[tokio::test]
async fn test_status_query_error_propagates() {
    let clock = ManualClock::new();
    let mut operation = ScriptedOperation::new(&[]);
    operation.query_error = true;

    let err = track(&poller(&clock), &operation).await.unwrap_err();

    assert!(matches!(err, CoreError::StatusQuery(_)));
    assert!(err.is_retryable());
    assert_eq!(operation.queries(), 1);
}

#[tokio::test]
async fn test_fetch_error_after_success_is_distinct() {
    let clock = ManualClock::new();
    let mut operation = ScriptedOperation::new(&["Succeeded"]);
    operation.fetch_error = true;

    let err = track(&poller(&clock), &operation).await.unwrap_err();

    assert!(matches!(err, CoreError::Fetch(_)));
    assert!(err.is_not_found());
    assert_eq!(operation.fetches(), 1);
}

// ============================================================================
// Synchronous completion and resume
// ============================================================================

#[tokio::test]
async fn test_synchronous_completion_skips_polling() {
    let clock = ManualClock::new();
    let mut operation = ScriptedOperation::new(&[]);
    operation.synchronous = true;
    operation.initial = InitialResponse {
        status: 200,
        status_location: None,
        body: json!({ "properties": { "provisioningState": "Succeeded" } }),
    };

    let outcome = track(&poller(&clock), &operation).await.unwrap();

    assert!(matches!(outcome, Outcome::Success { operation: None, .. }));
    assert_eq!(operation.queries(), 0);
    assert_eq!(operation.fetches(), 1);
}

#[tokio::test]
async fn test_resume_existing_handle() {
    let clock = ManualClock::new();
    let operation = ScriptedOperation::new(&["Succeeded"]);
    let handle = OperationHandle::new(Url::parse(STATUS_URL).unwrap(), "op-123");
    let (events, on_progress) = recorder();

    let outcome = resume(
        &poller(&clock).with_progress(Some(on_progress)),
        &operation,
        handle.clone(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.operation(), Some(&handle));
    assert_eq!(operation.queries(), 1);
    assert_eq!(operation.fetches(), 1);

    let events = events.lock().unwrap();
    assert_eq!(
        events.first(),
        Some(&ProgressEvent::Started {
            operation_id: "op-123".to_string()
        })
    );
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Succeeded {
            operation_id: "op-123".to_string()
        })
    );
}
