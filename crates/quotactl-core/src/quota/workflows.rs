//! Quota workflows - submit and wait
//!
//! Each `*_and_wait` function composes submit, locate, poll and fetch into a
//! single [`Outcome`]. Timeouts, escalation and cancellation come back as
//! `Ok(Outcome::..)`; only transport and protocol errors are `Err`.

use super::client::QuotaClient;
use super::operations::{ArmAction, ArmResourceOperation, QuotaRequest};
use super::params::{QuotaTarget, require_segment, validate_limit};
use crate::error::Result;
use crate::outcome::Outcome;
use crate::poller::Poller;
use crate::tracker::{resume, track};

/// Create a group quota and wait for completion
///
/// # Arguments
///
/// * `client` - The quota client for the management group
/// * `group` - Group quota name
/// * `display_name` - Display name stored on the group
/// * `billing_id` - Optional billing ID the group is keyed on
/// * `poller` - Poll cadence, clock, cancellation and progress callback
///
/// # Example
///
/// ```rust,ignore
/// use quotactl_core::Poller;
/// use quotactl_core::quota::create_group_quota_and_wait;
///
/// let outcome = create_group_quota_and_wait(
///     &client,
///     "sdk-test-group",
///     "sdk-test-group",
///     None,
///     &Poller::default(),
/// ).await?;
///
/// println!("{}", outcome);
/// ```
pub async fn create_group_quota_and_wait(
    client: &QuotaClient,
    group: &str,
    display_name: &str,
    billing_id: Option<&str>,
    poller: &Poller,
) -> Result<Outcome> {
    require_segment("group name", group)?;
    let operation = ArmResourceOperation::new(
        client,
        ArmAction::CreateGroup {
            group: group.to_string(),
            display_name: display_name.to_string(),
            billing_id: billing_id.map(String::from),
        },
    );
    track(poller, &operation).await
}

/// Delete a group quota and wait for completion
pub async fn delete_group_quota_and_wait(
    client: &QuotaClient,
    group: &str,
    poller: &Poller,
) -> Result<Outcome> {
    require_segment("group name", group)?;
    let operation = ArmResourceOperation::new(
        client,
        ArmAction::DeleteGroup {
            group: group.to_string(),
        },
    );
    track(poller, &operation).await
}

/// Add a subscription to a group quota and wait for completion
pub async fn add_subscription_and_wait(
    client: &QuotaClient,
    group: &str,
    subscription_id: &str,
    poller: &Poller,
) -> Result<Outcome> {
    require_segment("group name", group)?;
    require_segment("subscription ID", subscription_id)?;
    let operation = ArmResourceOperation::new(
        client,
        ArmAction::AddSubscription {
            group: group.to_string(),
            subscription_id: subscription_id.to_string(),
        },
    );
    track(poller, &operation).await
}

/// Remove a subscription from a group quota and wait for completion
pub async fn remove_subscription_and_wait(
    client: &QuotaClient,
    group: &str,
    subscription_id: &str,
    poller: &Poller,
) -> Result<Outcome> {
    require_segment("group name", group)?;
    require_segment("subscription ID", subscription_id)?;
    let operation = ArmResourceOperation::new(
        client,
        ArmAction::RemoveSubscription {
            group: group.to_string(),
            subscription_id: subscription_id.to_string(),
        },
    );
    track(poller, &operation).await
}

/// Request a new group quota limit and wait for a terminal state
///
/// On success the resulting limit is read back for `target.region` and
/// returned as the outcome's resource. An escalated request is reported as
/// [`Outcome::Escalated`] with the request's status URL.
///
/// # Example
///
/// ```rust,ignore
/// use quotactl_core::{Outcome, Poller, PollSettings};
/// use quotactl_core::quota::{QuotaTarget, request_limit_and_wait};
///
/// let target = QuotaTarget::default().with_region("eastus");
/// match request_limit_and_wait(&client, "sdk-test-group", &target, 50, &Poller::default()).await? {
///     Outcome::Success { resource, .. } => println!("{}", resource),
///     other => eprintln!("{}", other),
/// }
/// ```
pub async fn request_limit_and_wait(
    client: &QuotaClient,
    group: &str,
    target: &QuotaTarget,
    limit: i64,
    poller: &Poller,
) -> Result<Outcome> {
    require_segment("group name", group)?;
    target.validate()?;
    validate_limit(limit)?;
    let request = QuotaRequest::limit(client, group, target.clone(), limit);
    track(poller, &request).await
}

/// Request a subscription allocation and wait for a terminal state
///
/// On success the subscription's allocation is read back for
/// `target.region`.
pub async fn request_allocation_and_wait(
    client: &QuotaClient,
    subscription_id: &str,
    group: &str,
    target: &QuotaTarget,
    limit: i64,
    poller: &Poller,
) -> Result<Outcome> {
    require_segment("group name", group)?;
    require_segment("subscription ID", subscription_id)?;
    target.validate()?;
    validate_limit(limit)?;
    let request = QuotaRequest::allocation(client, subscription_id, group, target.clone(), limit);
    track(poller, &request).await
}

/// Start a fresh poll session for a request submitted earlier
///
/// `request` only needs its kind, group and target; the limit is not sent.
pub async fn wait_for_request(
    request: &QuotaRequest<'_>,
    request_id: &str,
    poller: &Poller,
) -> Result<Outcome> {
    require_segment("operation ID", request_id)?;
    let handle = request.handle_for(request_id)?;
    resume(poller, request, handle).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ArmClient;
    use crate::error::CoreError;

    fn client() -> QuotaClient {
        let arm = ArmClient::new("http://127.0.0.1:9", "2023-06-01-preview", "t").unwrap();
        QuotaClient::new(arm, "mg-1")
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_before_submit() {
        let client = client();
        let poller = Poller::default();

        let err = request_limit_and_wait(&client, "g1", &QuotaTarget::default(), -5, &poller)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = add_subscription_and_wait(&client, "", "sub-1", &poller)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let request = QuotaRequest::limit(&client, "g1", QuotaTarget::default(), 0);
        let err = wait_for_request(&request, "a/b", &poller).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
