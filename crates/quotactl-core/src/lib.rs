//! # quotactl-core
//!
//! Tracking engine for long-running Azure quota operations, plus the
//! Microsoft.Quota client and profile configuration the `quotactl` CLI is
//! built on.
//!
//! ## Lifecycle
//!
//! ```text
//! submit ──► locate ──► poll (loop) ──► fetch ──► Outcome::Success
//!                          │
//!                          ├──► Outcome::Failed
//!                          ├──► Outcome::Escalated   (status URL attached)
//!                          ├──► Outcome::TimedOut    (status URL + last state)
//!                          └──► Outcome::Cancelled
//! ```
//!
//! - [`operation`]: pulls an [`OperationHandle`] out of the submit response
//! - [`poller`]: the poll loop, bounded by a deadline and driven by an
//!   injected [`Clock`] and cancellation token
//! - [`tracker`]: runs submit, locate, poll and fetch for one
//!   [`LongRunningOperation`]
//! - [`outcome`]: the caller-visible result and its [`Report`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use quotactl_core::quota::{QuotaClient, QuotaTarget, request_limit_and_wait};
//! use quotactl_core::{ArmClient, PollSettings, Poller};
//! use std::time::Duration;
//!
//! let arm = ArmClient::new("https://management.azure.com", "2023-06-01-preview", token)?;
//! let client = QuotaClient::new(arm, "my-management-group");
//! let poller = Poller::new(PollSettings::new(
//!     Duration::from_secs(30),
//!     Duration::from_secs(120),
//! ));
//!
//! let outcome = request_limit_and_wait(&client, "my-group", &QuotaTarget::default(), 50, &poller).await?;
//! println!("{}", outcome.report().message);
//! ```

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod operation;
pub mod outcome;
pub mod poller;
pub mod progress;
pub mod quota;
pub mod state;
pub mod tracker;

// Re-export main types for convenience
pub use api::{ApiError, ApiResponse, ArmClient};
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::{Config, ConfigError, CredentialStore, PollingConfig, Profile};
pub use error::{CoreError, Result};
pub use operation::{
    BodyFieldLocator, InitialResponse, OperationHandle, OperationLocator, TrailingSegmentLocator,
};
pub use outcome::{Outcome, Report};
pub use poller::{PollSession, PollSettings, PollVerdict, Poller, StatusReport, StatusSource};
pub use progress::{ProgressCallback, ProgressEvent};
pub use state::ProvisioningState;
pub use tracker::{LongRunningOperation, Submitted, resume, start, track};

pub use tokio_util::sync::CancellationToken;
