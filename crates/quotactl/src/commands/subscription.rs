//! Group quota subscription membership commands

use quotactl_core::quota::{
    ArmAction, ArmResourceOperation, add_subscription_and_wait, remove_subscription_and_wait,
    require_segment,
};

use crate::cli::{OutputFormat, SubscriptionCommands};
use crate::commands::wait::{Tracking, submit_only};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;

pub async fn handle_subscription_command(
    cmd: &SubscriptionCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<i32> {
    let client = conn_mgr.quota_client(profile_name)?;

    match cmd {
        SubscriptionCommands::Add {
            group,
            subscription_id,
            wait,
        } => {
            let subscription_id =
                conn_mgr.subscription_id(profile_name, subscription_id.as_deref())?;
            if wait.no_wait {
                require_segment("group name", group)?;
                require_segment("subscription ID", &subscription_id)?;
                let operation = ArmResourceOperation::new(
                    &client,
                    ArmAction::AddSubscription {
                        group: group.clone(),
                        subscription_id,
                    },
                );
                return submit_only(&operation, |_| None, output_format).await;
            }

            let tracking = Tracking::from_wait_args(
                conn_mgr,
                profile_name,
                wait,
                &format!("Adding subscription {} to {}", subscription_id, group),
            )?;
            let result =
                add_subscription_and_wait(&client, group, &subscription_id, &tracking.poller).await;
            tracking.conclude(result, output_format)
        }
        SubscriptionCommands::Remove {
            group,
            subscription_id,
            wait,
        } => {
            let subscription_id =
                conn_mgr.subscription_id(profile_name, subscription_id.as_deref())?;
            if wait.no_wait {
                require_segment("group name", group)?;
                require_segment("subscription ID", &subscription_id)?;
                let operation = ArmResourceOperation::new(
                    &client,
                    ArmAction::RemoveSubscription {
                        group: group.clone(),
                        subscription_id,
                    },
                );
                return submit_only(&operation, |_| None, output_format).await;
            }

            let tracking = Tracking::from_wait_args(
                conn_mgr,
                profile_name,
                wait,
                &format!("Removing subscription {} from {}", subscription_id, group),
            )?;
            let result =
                remove_subscription_and_wait(&client, group, &subscription_id, &tracking.poller)
                    .await;
            tracking.conclude(result, output_format)
        }
    }
}
