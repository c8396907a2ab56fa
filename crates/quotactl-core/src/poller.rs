//! The long-running-operation poll loop
//!
//! One [`PollSession`] per tracked operation. Each tick re-reads the
//! operation's provisioning state through a [`StatusSource`] and classifies
//! it:
//!
//! | observed state          | action                                   |
//! |-------------------------|------------------------------------------|
//! | `Succeeded`             | exit, [`PollVerdict::Succeeded`]         |
//! | `Failed`                | exit, [`PollVerdict::Failed`]            |
//! | `Escalated`             | exit, [`PollVerdict::Escalated`]         |
//! | `Accepted`/`InProgress` | sleep one interval, tick again           |
//! | anything else           | same as `InProgress` (logged)            |
//!
//! The deadline is wall-clock time measured from session start. Status
//! queries are raced against the remaining budget (and the optional
//! per-call timeout) so a hung call cannot stall the loop past its deadline.
//! Cancellation is checked against every remote call and every sleep.

use crate::api::ApiError;
use crate::clock::{Clock, TokioClock};
use crate::error::{CoreError, Result};
use crate::operation::{OperationHandle, provisioning_state_of};
use crate::progress::{ProgressCallback, ProgressEvent, emit};
use crate::state::ProvisioningState;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default time between status queries
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default time to wait for a terminal state
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(120);

/// Cadence and budget for one poll session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub deadline: Duration,
    /// Upper bound for a single status query; the remaining deadline budget
    /// always applies on top of this
    pub per_call_timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_DEADLINE,
            per_call_timeout: None,
        }
    }
}

impl PollSettings {
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self {
            interval,
            deadline,
            per_call_timeout: None,
        }
    }

    pub fn with_per_call_timeout(mut self, timeout: Duration) -> Self {
        self.per_call_timeout = Some(timeout);
        self
    }

    /// Reject a zero interval or per-call timeout
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(CoreError::Validation(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.per_call_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CoreError::Validation(
                "per-call timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// One observation of an operation's status
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub state: ProvisioningState,
    /// Full status document as returned by the service
    pub raw: Value,
}

impl StatusReport {
    pub fn new(state: ProvisioningState, raw: Value) -> Self {
        Self { state, raw }
    }

    /// Build a report from a status document, using `missing` when the
    /// document has no state field
    pub fn from_body(raw: Value, missing: ProvisioningState) -> Self {
        let state = provisioning_state_of(&raw).unwrap_or(missing);
        Self { state, raw }
    }

    /// Best-effort failure description from the status document
    pub fn failure_reason(&self) -> String {
        const CANDIDATES: &[&str] = &[
            "/error/message",
            "/properties/error/message",
            "/properties/faultDetails",
            "/properties/message",
            "/message",
        ];
        CANDIDATES
            .iter()
            .find_map(|p| self.raw.pointer(p).and_then(Value::as_str))
            .map(String::from)
            .unwrap_or_else(|| format!("remote reported state {}", self.state))
    }
}

/// Re-reads the current state of a tracked operation
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn query_status(
        &self,
        handle: &OperationHandle,
    ) -> std::result::Result<StatusReport, ApiError>;
}

/// State of one running poll loop; discarded when the loop exits
#[derive(Debug, Clone)]
pub struct PollSession {
    handle: OperationHandle,
    started: Instant,
    settings: PollSettings,
    last_state: ProvisioningState,
    queries: u32,
}

impl PollSession {
    pub fn new(handle: OperationHandle, started: Instant, settings: PollSettings) -> Self {
        Self {
            handle,
            started,
            settings,
            last_state: ProvisioningState::Accepted,
            queries: 0,
        }
    }

    pub fn handle(&self) -> &OperationHandle {
        &self.handle
    }

    pub fn last_state(&self) -> &ProvisioningState {
        &self.last_state
    }

    /// Status queries issued so far
    pub fn queries(&self) -> u32 {
        self.queries
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    /// Budget left before the deadline; zero once it has passed
    pub fn remaining(&self, now: Instant) -> Duration {
        self.settings.deadline.saturating_sub(self.elapsed(now))
    }

    fn call_budget(&self, now: Instant) -> Duration {
        let remaining = self.remaining(now);
        match self.settings.per_call_timeout {
            Some(limit) => limit.min(remaining),
            None => remaining,
        }
    }
}

/// How a poll loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollVerdict {
    Succeeded(StatusReport),
    Failed { reason: String, report: StatusReport },
    Escalated(StatusReport),
    TimedOut { last_state: ProvisioningState },
    Cancelled,
}

/// Drives poll sessions with an injected clock and cancellation token
pub struct Poller {
    settings: PollSettings,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    on_progress: Option<ProgressCallback>,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(PollSettings::default())
    }
}

impl Poller {
    pub fn new(settings: PollSettings) -> Self {
        Self {
            settings,
            clock: Arc::new(TokioClock),
            cancel: CancellationToken::new(),
            on_progress: None,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, on_progress: Option<ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        emit(&self.on_progress, event);
    }

    /// Poll `handle` until a terminal state, the deadline, or cancellation
    ///
    /// Never returns a non-terminal state: the loop either observes
    /// `Succeeded`/`Failed`/`Escalated` or synthesises `TimedOut`/`Cancelled`.
    /// Status query transport errors end the loop with
    /// [`CoreError::StatusQuery`].
    pub async fn poll<S>(&self, source: &S, handle: &OperationHandle) -> Result<PollVerdict>
    where
        S: StatusSource + ?Sized,
    {
        self.settings.validate()?;
        let mut session = PollSession::new(handle.clone(), self.clock.now(), self.settings);
        let operation_id = handle.operation_id().to_string();

        debug!(
            "Polling operation {} every {:?} for up to {:?}",
            operation_id, self.settings.interval, self.settings.deadline
        );
        self.emit(ProgressEvent::Started {
            operation_id: operation_id.clone(),
        });

        loop {
            if self.cancel.is_cancelled() {
                return Ok(self.cancelled(&operation_id));
            }

            let now = self.clock.now();
            if session.remaining(now).is_zero() {
                warn!(
                    "Operation {} still {} after {:?}",
                    operation_id,
                    session.last_state(),
                    self.settings.deadline
                );
                self.emit(ProgressEvent::TimedOut {
                    operation_id: operation_id.clone(),
                    last_state: session.last_state.clone(),
                });
                return Ok(PollVerdict::TimedOut {
                    last_state: session.last_state,
                });
            }

            let budget = session.call_budget(now);
            session.queries += 1;
            let observed = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(self.cancelled(&operation_id)),
                result = source.query_status(handle) => Some(result.map_err(CoreError::StatusQuery)?),
                _ = self.clock.timer(budget) => None,
            };

            match observed {
                Some(report) => {
                    let elapsed = session.elapsed(self.clock.now());
                    session.last_state = report.state.clone();
                    self.emit(ProgressEvent::Polling {
                        operation_id: operation_id.clone(),
                        state: report.state.clone(),
                        elapsed,
                        attempt: session.queries,
                    });

                    if let Some(verdict) = self.classify(&operation_id, handle, report) {
                        return Ok(verdict);
                    }
                }
                None => {
                    warn!(
                        "Status query {} for operation {} exceeded its {:?} budget",
                        session.queries, operation_id, budget
                    );
                }
            }

            let remaining = session.remaining(self.clock.now());
            if remaining.is_zero() {
                continue;
            }
            let pause = self.settings.interval.min(remaining);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(self.cancelled(&operation_id)),
                _ = self.clock.sleep(pause) => {}
            }
        }
    }

    /// Terminal verdict for `report`, or `None` to keep polling
    fn classify(
        &self,
        operation_id: &str,
        handle: &OperationHandle,
        report: StatusReport,
    ) -> Option<PollVerdict> {
        match &report.state {
            ProvisioningState::Succeeded => {
                info!("Operation {} succeeded", operation_id);
                self.emit(ProgressEvent::Succeeded {
                    operation_id: operation_id.to_string(),
                });
                Some(PollVerdict::Succeeded(report))
            }
            ProvisioningState::Failed => {
                let reason = report.failure_reason();
                info!("Operation {} failed: {}", operation_id, reason);
                self.emit(ProgressEvent::Failed {
                    operation_id: operation_id.to_string(),
                    reason: reason.clone(),
                });
                Some(PollVerdict::Failed { reason, report })
            }
            ProvisioningState::Escalated => {
                info!(
                    "Operation {} escalated for manual approval; check {}",
                    operation_id,
                    handle.status_url()
                );
                self.emit(ProgressEvent::Escalated {
                    operation_id: operation_id.to_string(),
                    status_url: handle.status_url().to_string(),
                });
                Some(PollVerdict::Escalated(report))
            }
            ProvisioningState::Unknown(raw) => {
                warn!(
                    "Operation {} reported unrecognised state '{}', continuing to poll",
                    operation_id, raw
                );
                None
            }
            ProvisioningState::Accepted | ProvisioningState::InProgress => {
                debug!("Operation {} is {}", operation_id, report.state);
                None
            }
        }
    }

    fn cancelled(&self, operation_id: &str) -> PollVerdict {
        info!("Stopped tracking operation {}: cancelled", operation_id);
        self.emit(ProgressEvent::Cancelled {
            operation_id: operation_id.to_string(),
        });
        PollVerdict::Cancelled
    }
}
