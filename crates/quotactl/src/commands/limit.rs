//! Group quota limit commands

use quotactl_core::quota::{
    QuotaRequest, QuotaTarget, request_limit_and_wait, require_segment, validate_limit,
};
use tracing::debug;

use crate::cli::{LimitCommands, OutputFormat};
use crate::commands::wait::{EXIT_SUCCESS, Tracking, submit_only};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::{self, print_output};

pub async fn handle_limit_command(
    cmd: &LimitCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<i32> {
    let client = conn_mgr.quota_client(profile_name)?;

    match cmd {
        LimitCommands::Request {
            group,
            limit,
            target,
            wait,
        } => {
            let target = conn_mgr.target(profile_name, target)?;
            if wait.no_wait {
                require_segment("group name", group)?;
                target.validate()?;
                validate_limit(*limit)?;
                let request = QuotaRequest::limit(&client, group.as_str(), target.clone(), *limit);
                return submit_only(
                    &request,
                    |handle| {
                        Some(resume_command("limit", group, None, &target, handle.operation_id()))
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
                    "Requesting {} {} in {} for {}",
                    limit, target.resource_name, target.region, group
                ),
            )?;
            let result =
                request_limit_and_wait(&client, group, &target, *limit, &tracking.poller).await;
            tracking.conclude(result, output_format)
        }
        LimitCommands::Get { group, target } => {
            require_segment("group name", group)?;
            let target = conn_mgr.target(profile_name, target)?;
            target.validate()?;
            debug!(
                "Reading {} limit for group {} in {}",
                target.resource_name, group, target.region
            );
            let limit = client.get_limit(group, &target).await?;
            print_output(limit, output::OutputFormat::from(output_format))?;
            Ok(EXIT_SUCCESS)
        }
    }
}

/// Command line that resumes tracking a request submitted with `--no-wait`
pub fn resume_command(
    kind: &str,
    group: &str,
    subscription_id: Option<&str>,
    target: &QuotaTarget,
    operation_id: &str,
) -> String {
    let mut cmd = format!("quotactl operation wait {} {} {}", kind, group, operation_id);
    if let Some(sub) = subscription_id {
        cmd.push_str(&format!(" --subscription-id {}", sub));
    }
    cmd.push_str(&format!(
        " --provider {} --resource {} --region {}",
        target.provider, target.resource_name, target.region
    ));
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_command_carries_target() {
        let target = QuotaTarget::default().with_region("eastus");
        assert_eq!(
            resume_command("allocation", "g1", Some("sub-1"), &target, "req-7"),
            "quotactl operation wait allocation g1 req-7 --subscription-id sub-1 --provider Microsoft.Compute --resource cores --region eastus"
        );
    }
}
