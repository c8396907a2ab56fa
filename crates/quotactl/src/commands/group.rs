//! Group quota command implementations

use quotactl_core::quota::{
    ArmAction, ArmResourceOperation, create_group_quota_and_wait, delete_group_quota_and_wait,
    require_segment,
};
use tracing::debug;

use crate::cli::{GroupCommands, OutputFormat};
use crate::commands::wait::{EXIT_SUCCESS, Tracking, submit_only};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::{self, print_output};

pub async fn handle_group_command(
    cmd: &GroupCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<i32> {
    let client = conn_mgr.quota_client(profile_name)?;

    match cmd {
        GroupCommands::Create {
            name,
            display_name,
            billing_id,
            wait,
        } => {
            let display_name = display_name.as_deref().unwrap_or(name);
            if wait.no_wait {
                require_segment("group name", name)?;
                let operation = ArmResourceOperation::new(
                    &client,
                    ArmAction::CreateGroup {
                        group: name.clone(),
                        display_name: display_name.to_string(),
                        billing_id: billing_id.clone(),
                    },
                );
                return submit_only(&operation, |_| None, output_format).await;
            }

            let tracking = Tracking::from_wait_args(
                conn_mgr,
                profile_name,
                wait,
                &format!("Creating group quota {}", name),
            )?;
            let result = create_group_quota_and_wait(
                &client,
                name,
                display_name,
                billing_id.as_deref(),
                &tracking.poller,
            )
            .await;
            tracking.conclude(result, output_format)
        }
        GroupCommands::Get { name } => {
            require_segment("group name", name)?;
            debug!("Reading group quota {}", name);
            let group = client.get_group_quota(name).await?;
            print_output(group, output::OutputFormat::from(output_format))?;
            Ok(EXIT_SUCCESS)
        }
        GroupCommands::Delete { name, wait } => {
            if wait.no_wait {
                require_segment("group name", name)?;
                let operation = ArmResourceOperation::new(
                    &client,
                    ArmAction::DeleteGroup {
                        group: name.clone(),
                    },
                );
                return submit_only(&operation, |_| None, output_format).await;
            }

            let tracking = Tracking::from_wait_args(
                conn_mgr,
                profile_name,
                wait,
                &format!("Deleting group quota {}", name),
            )?;
            let result = delete_group_quota_and_wait(&client, name, &tracking.poller).await;
            tracking.conclude(result, output_format)
        }
    }
}
