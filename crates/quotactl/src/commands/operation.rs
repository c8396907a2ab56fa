//! Inspect or resume limit and allocation requests by operation ID

use quotactl_core::quota::{QuotaRequest, require_segment, wait_for_request};
use serde_json::json;
use tracing::debug;

use crate::cli::{OperationCommands, OutputFormat, RequestType, TargetArgs};
use crate::commands::wait::{EXIT_SUCCESS, Tracking};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::{self, print_output};

pub async fn handle_operation_command(
    cmd: &OperationCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<i32> {
    let client = conn_mgr.quota_client(profile_name)?;

    match cmd {
        OperationCommands::Status {
            kind,
            group,
            operation_id,
            subscription_id,
        } => {
            require_segment("group name", group)?;
            require_segment("operation ID", operation_id)?;
            // Status reads never touch the target; profile defaults are enough
            let target = conn_mgr.target(profile_name, &TargetArgs::default())?;
            let request = match kind {
                RequestType::Limit => QuotaRequest::limit(&client, group.as_str(), target, 0),
                RequestType::Allocation => {
                    let sub = conn_mgr.subscription_id(profile_name, subscription_id.as_deref())?;
                    QuotaRequest::allocation(&client, sub, group.as_str(), target, 0)
                }
            };

            debug!("Reading {} request {}", request.kind(), operation_id);
            let handle = request.handle_for(operation_id)?;
            let report = request.status(operation_id).await?;

            let data = json!({
                "operation_id": operation_id,
                "status_url": handle.status_url().as_str(),
                "state": report.state,
                "terminal": report.state.is_terminal(),
                "request": report.raw,
            });
            match output::OutputFormat::from(output_format) {
                output::OutputFormat::Table => {
                    println!("Operation ID: {}", operation_id);
                    println!("State: {}", report.state);
                    if report.state == quotactl_core::ProvisioningState::Failed {
                        println!("Reason: {}", report.failure_reason());
                    }
                    println!("Status URL: {}", handle.status_url());
                }
                format => print_output(&data, format)?,
            }
            Ok(EXIT_SUCCESS)
        }
        OperationCommands::Wait {
            kind,
            group,
            operation_id,
            subscription_id,
            target,
            poll_interval,
            deadline,
        } => {
            let target = conn_mgr.target(profile_name, target)?;
            let request = match kind {
                RequestType::Limit => QuotaRequest::limit(&client, group.as_str(), target, 0),
                RequestType::Allocation => {
                    let sub = conn_mgr.subscription_id(profile_name, subscription_id.as_deref())?;
                    QuotaRequest::allocation(&client, sub, group.as_str(), target, 0)
                }
            };

            let tracking = Tracking::new(
                conn_mgr,
                profile_name,
                *poll_interval,
                *deadline,
                &format!("Waiting for {} request {}", request.kind(), operation_id),
            )?;
            let result = wait_for_request(&request, operation_id, &tracking.poller).await;
            tracking.conclude(result, output_format)
        }
    }
}
