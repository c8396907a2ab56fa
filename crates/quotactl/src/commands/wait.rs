//! Shared handling for long-running commands
//!
//! Wraps the core poller with an indicatif spinner, renders the final
//! [`Outcome`] and maps it to the process exit code.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use quotactl_core::{
    LongRunningOperation, OperationHandle, Outcome, Poller, ProgressCallback, ProgressEvent,
    ProvisioningState, Submitted, start,
};
use serde_json::json;
use std::time::Duration;

use crate::cli::{OutputFormat, WaitArgs};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::{self, print_output};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_ESCALATED: i32 = 3;
pub const EXIT_TIMED_OUT: i32 = 4;
pub const EXIT_CANCELLED: i32 = 130;

/// Exit code for a finished tracking run
pub fn exit_code(outcome: &Outcome) -> i32 {
    match outcome {
        Outcome::Success { .. } => EXIT_SUCCESS,
        Outcome::Failed { .. } => EXIT_FAILURE,
        Outcome::Escalated { .. } => EXIT_ESCALATED,
        Outcome::TimedOut { .. } => EXIT_TIMED_OUT,
        Outcome::Cancelled { .. } => EXIT_CANCELLED,
    }
}

/// A poller wired to a spinner
pub struct Tracking {
    pub poller: Poller,
    spinner: ProgressBar,
}

impl Tracking {
    /// Build a poller for `profile_name` whose progress drives a spinner
    /// labelled `label`
    pub fn new(
        conn_mgr: &ConnectionManager,
        profile_name: Option<&str>,
        poll_interval: Option<u64>,
        deadline: Option<u64>,
        label: &str,
    ) -> CliResult<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message(label.to_string());

        let poller = conn_mgr
            .poller(profile_name, poll_interval, deadline)?
            .with_progress(Some(progress_callback(spinner.clone(), label.to_string())));

        Ok(Self { poller, spinner })
    }

    /// Same as [`Tracking::new`], taking the flags from [`WaitArgs`]
    pub fn from_wait_args(
        conn_mgr: &ConnectionManager,
        profile_name: Option<&str>,
        wait: &WaitArgs,
        label: &str,
    ) -> CliResult<Self> {
        Self::new(conn_mgr, profile_name, wait.poll_interval, wait.deadline, label)
    }

    /// Stop the spinner, then print the outcome and return its exit code,
    /// or pass the error on
    pub fn conclude(
        self,
        result: quotactl_core::Result<Outcome>,
        output_format: OutputFormat,
    ) -> CliResult<i32> {
        let outcome = self.settle(result)?;
        print_outcome(&outcome, output_format)?;
        Ok(exit_code(&outcome))
    }

    /// Stop the spinner and hand back the outcome without printing it
    pub fn settle(self, result: quotactl_core::Result<Outcome>) -> CliResult<Outcome> {
        match result {
            Ok(outcome) => {
                if !self.spinner.is_finished() {
                    self.spinner.finish_and_clear();
                }
                Ok(outcome)
            }
            Err(e) => {
                if !self.spinner.is_finished() {
                    self.spinner.abandon();
                }
                Err(e.into())
            }
        }
    }
}

fn progress_callback(pb: ProgressBar, label: String) -> ProgressCallback {
    Box::new(move |event: ProgressEvent| match &event {
        ProgressEvent::Started { operation_id } => {
            pb.set_message(format!("{} (operation {})", label, operation_id));
        }
        ProgressEvent::Polling {
            state,
            attempt,
            elapsed,
            ..
        } => {
            pb.set_message(format!(
                "{}: {} (check {}, {}s)",
                label,
                format_state(state),
                attempt,
                elapsed.as_secs()
            ));
        }
        ProgressEvent::Succeeded { .. } => {
            pb.finish_with_message(format!(
                "{}: {}",
                label,
                format_state(&ProvisioningState::Succeeded)
            ));
        }
        ProgressEvent::Failed { reason, .. } => {
            pb.finish_with_message(format!("{}: \u{2717} failed: {}", label, reason));
        }
        ProgressEvent::Escalated { .. } => {
            pb.finish_with_message(format!(
                "{}: {}",
                label,
                format_state(&ProvisioningState::Escalated)
            ));
        }
        ProgressEvent::TimedOut { last_state, .. } => {
            pb.finish_with_message(format!(
                "{}: still {} at deadline",
                label,
                format_state(last_state)
            ));
        }
        ProgressEvent::Cancelled { .. } => {
            pb.finish_with_message(format!("{}: \u{2298} cancelled", label));
        }
    })
}

/// Format a provisioning state for display with status icons
fn format_state(state: &ProvisioningState) -> String {
    match state {
        ProvisioningState::Succeeded => format!("\u{2713} {}", state),
        ProvisioningState::Failed => format!("\u{2717} {}", state),
        ProvisioningState::Escalated => format!("\u{26a0} {}", state),
        ProvisioningState::Accepted | ProvisioningState::InProgress => {
            format!("\u{21bb} {}", state)
        }
        _ => state.to_string(),
    }
}

/// Render an outcome in the requested format
pub fn print_outcome(outcome: &Outcome, output_format: OutputFormat) -> CliResult<()> {
    let report = outcome.report();
    match output::OutputFormat::from(output_format) {
        output::OutputFormat::Table => {
            let headline = match outcome {
                Outcome::Success { .. } => report.message.green().to_string(),
                Outcome::Failed { .. } => report.message.red().to_string(),
                _ => report.message.yellow().to_string(),
            };
            println!("{}", headline);
            if let Some(operation) = outcome.operation() {
                println!("Operation ID: {}", operation.operation_id());
            }
            if let Some(resource) = outcome.resource()
                && !resource.is_null()
            {
                print_output(resource, output::OutputFormat::Table)?;
            }
        }
        format => print_output(&report, format)?,
    }
    Ok(())
}

/// Submit without waiting and print where to check on it
///
/// `resume_hint` is the command line that resumes tracking, when the CLI
/// has one for this kind of operation.
pub async fn submit_only<O>(
    operation: &O,
    resume_hint: impl Fn(&OperationHandle) -> Option<String>,
    output_format: OutputFormat,
) -> CliResult<i32>
where
    O: LongRunningOperation + ?Sized,
{
    match start(operation).await? {
        Submitted::Completed(initial) => {
            let data = json!({
                "operation": operation.describe(),
                "completed": true,
                "status": initial.status,
            });
            match output::OutputFormat::from(output_format) {
                output::OutputFormat::Table => {
                    println!("{}", format!("{} completed", operation.describe()).green());
                }
                format => print_output(&data, format)?,
            }
        }
        Submitted::Pending(handle) => {
            let hint = resume_hint(&handle);
            match output::OutputFormat::from(output_format) {
                output::OutputFormat::Table => {
                    println!("{} accepted", operation.describe());
                    println!("Operation ID: {}", handle.operation_id());
                    println!("Status URL: {}", handle.status_url());
                    if let Some(cmd) = &hint {
                        println!("To wait for completion, run: {}", cmd);
                    }
                }
                format => {
                    let mut data = json!({
                        "operation": operation.describe(),
                        "completed": false,
                        "operation_id": handle.operation_id(),
                        "status_url": handle.status_url().as_str(),
                    });
                    if let Some(cmd) = hint {
                        data["resume"] = json!(cmd);
                    }
                    print_output(&data, format)?;
                }
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
