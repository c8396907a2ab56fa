//! Submit, locate, poll, fetch
//!
//! [`track`] runs the full lifecycle of one long-running operation:
//!
//! 1. submit the mutating request
//! 2. locate the operation handle in the submit response
//! 3. poll until terminal, deadline or cancellation
//! 4. on success only, read the final resource exactly once
//!
//! [`start`] stops after step 2. [`resume`] starts at step 3 for a handle
//! obtained earlier, e.g. from a timed-out outcome.

use crate::api::ApiError;
use crate::error::{CoreError, Result};
use crate::operation::{InitialResponse, OperationHandle, OperationLocator, TrailingSegmentLocator};
use crate::outcome::Outcome;
use crate::poller::{PollVerdict, Poller, StatusSource};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

/// A resource-specific long-running operation
///
/// Implementors own the request payload and scoping (management group,
/// resource name, region filter); the engine only sees these calls.
#[async_trait]
pub trait LongRunningOperation: StatusSource {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Issue the initial mutating call
    async fn submit(&self) -> std::result::Result<InitialResponse, ApiError>;

    /// Read the final materialized resource after success
    async fn fetch_result(&self) -> std::result::Result<Value, ApiError>;

    /// How to find the operation handle in the submit response
    fn locator(&self) -> &dyn OperationLocator {
        &TrailingSegmentLocator
    }

    /// Whether a submit response with no status location may be treated as
    /// already complete (plain ARM create/delete), instead of an error
    fn allows_synchronous_completion(&self) -> bool {
        false
    }
}

/// What a submit call left behind
#[derive(Debug, Clone)]
pub enum Submitted {
    /// Still running; track it through this handle
    Pending(OperationHandle),
    /// Finished within the submit call itself
    Completed(InitialResponse),
}

/// Submit `operation` and locate its handle, without polling
pub async fn start<O>(operation: &O) -> Result<Submitted>
where
    O: LongRunningOperation + ?Sized,
{
    debug!("Submitting {}", operation.describe());
    let initial = operation.submit().await.map_err(CoreError::Submission)?;

    if operation.allows_synchronous_completion() && initial.completed_synchronously() {
        info!(
            "{} completed synchronously (HTTP {})",
            operation.describe(),
            initial.status
        );
        return Ok(Submitted::Completed(initial));
    }

    let handle = operation.locator().locate(&initial)?;
    info!(
        "{} accepted, tracking operation {}",
        operation.describe(),
        handle.operation_id()
    );
    Ok(Submitted::Pending(handle))
}

/// Run `operation` from submission to a caller-visible [`Outcome`]
pub async fn track<O>(poller: &Poller, operation: &O) -> Result<Outcome>
where
    O: LongRunningOperation + ?Sized,
{
    poller.settings().validate()?;
    let submitted = tokio::select! {
        biased;
        _ = poller.cancellation().cancelled() => return Ok(Outcome::Cancelled { operation: None }),
        submitted = start(operation) => submitted?,
    };

    match submitted {
        Submitted::Completed(_) => fetch(poller, operation, None).await,
        Submitted::Pending(handle) => resume(poller, operation, handle).await,
    }
}

/// Poll an existing handle and report, fetching the result on success
pub async fn resume<O>(poller: &Poller, operation: &O, handle: OperationHandle) -> Result<Outcome>
where
    O: LongRunningOperation + ?Sized,
{
    let verdict = poller.poll(operation, &handle).await?;
    match verdict {
        PollVerdict::Succeeded(_) => fetch(poller, operation, Some(handle)).await,
        PollVerdict::Failed { reason, .. } => Ok(Outcome::Failed {
            operation: handle,
            reason,
        }),
        PollVerdict::Escalated(_) => Ok(Outcome::Escalated { operation: handle }),
        PollVerdict::TimedOut { last_state } => Ok(Outcome::TimedOut {
            operation: handle,
            last_state,
            deadline: poller.settings().deadline,
        }),
        PollVerdict::Cancelled => Ok(Outcome::Cancelled {
            operation: Some(handle),
        }),
    }
}

async fn fetch<O>(poller: &Poller, operation: &O, handle: Option<OperationHandle>) -> Result<Outcome>
where
    O: LongRunningOperation + ?Sized,
{
    let resource = tokio::select! {
        biased;
        _ = poller.cancellation().cancelled() => {
            return Ok(Outcome::Cancelled { operation: handle });
        }
        resource = operation.fetch_result() => resource.map_err(CoreError::Fetch)?,
    };
    debug!("Fetched final state for {}", operation.describe());
    Ok(Outcome::Success {
        operation: handle,
        resource,
    })
}
