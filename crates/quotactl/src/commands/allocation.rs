//! Subscription allocation commands

use quotactl_core::quota::{
    QuotaRequest, request_allocation_and_wait, require_segment, validate_limit,
};
use tracing::debug;

use crate::cli::{AllocationCommands, OutputFormat};
use crate::commands::limit::resume_command;
use crate::commands::wait::{EXIT_SUCCESS, Tracking, submit_only};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::{self, print_output};

pub async fn handle_allocation_command(
    cmd: &AllocationCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<i32> {
    let client = conn_mgr.quota_client(profile_name)?;

    match cmd {
        AllocationCommands::Request {
            group,
            limit,
            subscription_id,
            target,
            wait,
        } => {
            let subscription_id =
                conn_mgr.subscription_id(profile_name, subscription_id.as_deref())?;
            let target = conn_mgr.target(profile_name, target)?;
            if wait.no_wait {
                require_segment("group name", group)?;
                require_segment("subscription ID", &subscription_id)?;
                target.validate()?;
                validate_limit(*limit)?;
                let request = QuotaRequest::allocation(
                    &client,
                    subscription_id.as_str(),
                    group.as_str(),
                    target.clone(),
                    *limit,
                );
                return submit_only(
                    &request,
                    |handle| {
                        Some(resume_command(
                            "allocation",
                            group,
                            Some(&subscription_id),
                            &target,
                            handle.operation_id(),
                        ))
                    },
                    output_format,
                )
                .await;
            }

            let tracking = Tracking::from_wait_args(
                conn_mgr,
                profile_name,
                wait,
                &format!(
                    "Allocating {} {} in {} to {}",
                    limit, target.resource_name, target.region, subscription_id
                ),
            )?;
            let result = request_allocation_and_wait(
                &client,
                &subscription_id,
                group,
                &target,
                *limit,
                &tracking.poller,
            )
            .await;
            tracking.conclude(result, output_format)
        }
        AllocationCommands::Get {
            group,
            subscription_id,
            target,
        } => {
            require_segment("group name", group)?;
            let subscription_id =
                conn_mgr.subscription_id(profile_name, subscription_id.as_deref())?;
            require_segment("subscription ID", &subscription_id)?;
            let target = conn_mgr.target(profile_name, target)?;
            target.validate()?;
            debug!(
                "Reading {} allocation for {} in group {}",
                target.resource_name, subscription_id, group
            );
            let allocation = client
                .get_allocation(&subscription_id, group, &target)
                .await?;
            print_output(allocation, output::OutputFormat::from(output_format))?;
            Ok(EXIT_SUCCESS)
        }
    }
}
