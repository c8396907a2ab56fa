//! End-to-end smoke run against one group quota
//!
//! Runs create-group, get-group, add-subscription, remove-subscription,
//! request-limit, get-limit, request-allocation and get-allocation in order,
//! stopping at the first step that does not succeed. The group is deleted
//! afterwards unless `--keep` is given.

use chrono::Utc;
use colored::Colorize;
use quotactl_core::quota::{
    QuotaClient, QuotaTarget, add_subscription_and_wait, create_group_quota_and_wait,
    delete_group_quota_and_wait, remove_subscription_and_wait, request_allocation_and_wait,
    request_limit_and_wait,
};
use quotactl_core::{ApiError, Outcome};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::{OutputFormat, SmokeArgs};
use crate::commands::wait::{EXIT_FAILURE, EXIT_SUCCESS, Tracking, exit_code};
use crate::connection::ConnectionManager;
use crate::error::{QuotaCtlError, Result as CliResult};
use crate::output::{self, print_output};

#[derive(Debug, Serialize)]
struct StepReport {
    step: &'static str,
    result: String,
    detail: String,
}

struct SmokeRun<'a> {
    conn_mgr: &'a ConnectionManager,
    profile_name: Option<&'a str>,
    args: &'a SmokeArgs,
    steps: Vec<StepReport>,
}

pub async fn handle_smoke_command(
    args: &SmokeArgs,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<i32> {
    let client = conn_mgr.quota_client(profile_name)?;
    let subscription_id = conn_mgr.subscription_id(profile_name, None)?;
    let target = conn_mgr.target(profile_name, &args.target)?;
    let group = args.group.clone().unwrap_or_else(default_group_name);
    info!("Smoke run against group {}", group);

    let mut run = SmokeRun {
        conn_mgr,
        profile_name,
        args,
        steps: Vec::new(),
    };

    let code = run
        .sequence(&client, &group, &subscription_id, &target)
        .await?;

    // Only clean up a group this run created
    let created = run
        .steps
        .first()
        .is_some_and(|s| s.step == "create-group" && s.result == "succeeded");
    let code = match cleanup_plan(created, args.keep, conn_mgr.is_cancelled()) {
        Cleanup::Delete => {
            let cleanup = run.cleanup(&client, &group).await?;
            if code == EXIT_SUCCESS { cleanup } else { code }
        }
        Cleanup::Interrupted => {
            run.skip_cleanup(&group);
            code
        }
        Cleanup::Nothing => code,
    };

    run.print(output_format)?;
    Ok(code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cleanup {
    Delete,
    /// Ctrl-C stopped the run; the group is left for the operator
    Interrupted,
    Nothing,
}

fn cleanup_plan(created: bool, keep: bool, cancelled: bool) -> Cleanup {
    match (created && !keep, cancelled) {
        (false, _) => Cleanup::Nothing,
        (true, true) => Cleanup::Interrupted,
        (true, false) => Cleanup::Delete,
    }
}

fn default_group_name() -> String {
    format!("quotactl-smoke-{}", Utc::now().format("%Y%m%d%H%M%S"))
}

impl SmokeRun<'_> {
    fn tracking(&self, label: &str) -> CliResult<Tracking> {
        Tracking::new(
            self.conn_mgr,
            self.profile_name,
            self.args.poll_interval,
            self.args.deadline,
            label,
        )
    }

    async fn sequence(
        &mut self,
        client: &QuotaClient,
        group: &str,
        subscription_id: &str,
        target: &QuotaTarget,
    ) -> CliResult<i32> {
        let tracking = self.tracking(&format!("Creating group quota {}", group))?;
        let result =
            create_group_quota_and_wait(client, group, group, None, &tracking.poller).await;
        if let Some(code) = self.record_lro("create-group", tracking.settle(result)) {
            return Ok(code);
        }

        if let Some(code) = self.record_read("get-group", client.get_group_quota(group).await) {
            return Ok(code);
        }

        let tracking = self.tracking(&format!("Adding subscription {}", subscription_id))?;
        let result =
            add_subscription_and_wait(client, group, subscription_id, &tracking.poller).await;
        if let Some(code) = self.record_lro("add-subscription", tracking.settle(result)) {
            return Ok(code);
        }

        let tracking = self.tracking(&format!("Removing subscription {}", subscription_id))?;
        let result =
            remove_subscription_and_wait(client, group, subscription_id, &tracking.poller).await;
        if let Some(code) = self.record_lro("remove-subscription", tracking.settle(result)) {
            return Ok(code);
        }

        let tracking = self.tracking(&format!("Requesting limit {}", self.args.limit))?;
        let result =
            request_limit_and_wait(client, group, target, self.args.limit, &tracking.poller).await;
        if let Some(code) = self.record_lro("request-limit", tracking.settle(result)) {
            return Ok(code);
        }

        if let Some(code) = self.record_read("get-limit", client.get_limit(group, target).await) {
            return Ok(code);
        }

        let tracking = self.tracking(&format!("Requesting allocation {}", self.args.allocation))?;
        let result = request_allocation_and_wait(
            client,
            subscription_id,
            group,
            target,
            self.args.allocation,
            &tracking.poller,
        )
        .await;
        if let Some(code) = self.record_lro("request-allocation", tracking.settle(result)) {
            return Ok(code);
        }

        let allocation = client.get_allocation(subscription_id, group, target).await;
        if let Some(code) = self.record_read("get-allocation", allocation) {
            return Ok(code);
        }

        Ok(EXIT_SUCCESS)
    }

    async fn cleanup(&mut self, client: &QuotaClient, group: &str) -> CliResult<i32> {
        let tracking = self.tracking(&format!("Deleting group quota {}", group))?;
        let result = delete_group_quota_and_wait(client, group, &tracking.poller).await;
        Ok(self
            .record_lro("cleanup", tracking.settle(result))
            .unwrap_or(EXIT_SUCCESS))
    }

    fn skip_cleanup(&mut self, group: &str) {
        let hint = format!("quotactl group delete {}", group);
        warn!("Cancelled before cleanup; group {} was left in place", group);
        eprintln!(
            "{} group {} was not deleted; remove it with '{}'",
            "Cancelled:".yellow(),
            group,
            hint
        );
        self.steps.push(StepReport {
            step: "cleanup",
            result: "skipped".to_string(),
            detail: format!("cancelled; run '{}'", hint),
        });
    }

    /// Record a tracked step; `Some(exit code)` when the run must stop
    fn record_lro(&mut self, step: &'static str, result: CliResult<Outcome>) -> Option<i32> {
        match result {
            Ok(outcome) => {
                let code = exit_code(&outcome);
                self.steps.push(StepReport {
                    step,
                    result: outcome.kind().to_string(),
                    detail: outcome.to_string(),
                });
                if code == EXIT_SUCCESS {
                    None
                } else {
                    warn!("Smoke step {} ended {}", step, outcome.kind());
                    Some(code)
                }
            }
            Err(e) => Some(self.record_error(step, e)),
        }
    }

    fn record_read(&mut self, step: &'static str, result: Result<Value, ApiError>) -> Option<i32> {
        match result {
            Ok(resource) => {
                let name = resource
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("resource");
                self.steps.push(StepReport {
                    step,
                    result: "succeeded".to_string(),
                    detail: format!("read {}", name),
                });
                None
            }
            Err(e) => Some(self.record_error(step, e.into())),
        }
    }

    fn record_error(&mut self, step: &'static str, err: QuotaCtlError) -> i32 {
        warn!("Smoke step {} failed: {}", step, err);
        self.steps.push(StepReport {
            step,
            result: "error".to_string(),
            detail: err.to_string(),
        });
        EXIT_FAILURE
    }

    fn print(&self, output_format: OutputFormat) -> CliResult<()> {
        match output::OutputFormat::from(output_format) {
            output::OutputFormat::Table => {
                for report in &self.steps {
                    let marker = if report.result == "succeeded" {
                        "\u{2713}".green()
                    } else {
                        "\u{2717}".red()
                    };
                    println!("{} {:<20} {}", marker, report.step, report.detail);
                }
            }
            format => print_output(&self.steps, format)?,
        }
        Ok(())
    }
}
