//! Long-running Microsoft.Quota operations
//!
//! Two flavours of status tracking:
//!
//! - [`QuotaRequest`]: limit and allocation requests. The submit response's
//!   status location ends in a request ID; status is re-read through the
//!   request resource (`groupQuotaRequests/{id}` or
//!   `quotaAllocationRequests/{id}`), and on success the resulting limit or
//!   allocation is read with a region filter.
//! - [`ArmResourceOperation`]: group create/delete and subscription
//!   add/remove. These follow the generic ARM pattern; the status location
//!   itself is polled, and a terminal submit response needs no polling.

use super::client::QuotaClient;
use super::params::{
    QuotaTarget, allocation_request_body, group_quota_body, limit_request_body,
};
use crate::api::ApiError;
use crate::error::Result;
use crate::operation::{InitialResponse, OperationHandle};
use crate::poller::{StatusReport, StatusSource};
use crate::state::ProvisioningState;
use crate::tracker::LongRunningOperation;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Which request resource a [`QuotaRequest`] tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// Group quota limit request
    Limit,
    /// Subscription allocation request, for this subscription
    Allocation { subscription_id: String },
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Limit => write!(f, "limit"),
            RequestKind::Allocation { .. } => write!(f, "allocation"),
        }
    }
}

/// A limit or allocation request against one group quota
#[derive(Debug, Clone)]
pub struct QuotaRequest<'a> {
    client: &'a QuotaClient,
    kind: RequestKind,
    group: String,
    target: QuotaTarget,
    limit: i64,
}

impl<'a> QuotaRequest<'a> {
    /// Request a new group quota limit
    pub fn limit(
        client: &'a QuotaClient,
        group: impl Into<String>,
        target: QuotaTarget,
        limit: i64,
    ) -> Self {
        Self {
            client,
            kind: RequestKind::Limit,
            group: group.into(),
            target,
            limit,
        }
    }

    /// Request a subscription allocation out of a group quota
    pub fn allocation(
        client: &'a QuotaClient,
        subscription_id: impl Into<String>,
        group: impl Into<String>,
        target: QuotaTarget,
        limit: i64,
    ) -> Self {
        Self {
            client,
            kind: RequestKind::Allocation {
                subscription_id: subscription_id.into(),
            },
            group: group.into(),
            target,
            limit,
        }
    }

    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    /// Handle for a request submitted earlier, rebuilt from its ID
    pub fn handle_for(&self, request_id: &str) -> Result<OperationHandle> {
        let url = self.client.url_for(&self.status_path(request_id))?;
        Ok(OperationHandle::new(url, request_id))
    }

    /// One-shot read of a request's status, without polling
    pub async fn status(&self, request_id: &str) -> std::result::Result<StatusReport, ApiError> {
        let raw = self.read_request(request_id).await?;
        Ok(StatusReport::from_body(raw, missing_state()))
    }

    fn status_path(&self, request_id: &str) -> String {
        match &self.kind {
            RequestKind::Limit => self.client.limit_request_path(&self.group, request_id),
            RequestKind::Allocation { subscription_id } => {
                self.client
                    .allocation_request_path(subscription_id, &self.group, request_id)
            }
        }
    }

    async fn read_request(&self, request_id: &str) -> std::result::Result<Value, ApiError> {
        match &self.kind {
            RequestKind::Limit => self.client.get_limit_request(&self.group, request_id).await,
            RequestKind::Allocation { subscription_id } => {
                self.client
                    .get_allocation_request(subscription_id, &self.group, request_id)
                    .await
            }
        }
    }
}

#[async_trait]
impl StatusSource for QuotaRequest<'_> {
    async fn query_status(
        &self,
        handle: &OperationHandle,
    ) -> std::result::Result<StatusReport, ApiError> {
        self.status(handle.operation_id()).await
    }
}

#[async_trait]
impl LongRunningOperation for QuotaRequest<'_> {
    fn describe(&self) -> String {
        format!(
            "{} request for {}/{} in {} (group {}, limit {})",
            self.kind,
            self.target.provider,
            self.target.resource_name,
            self.target.region,
            self.group,
            self.limit
        )
    }

    async fn submit(&self) -> std::result::Result<InitialResponse, ApiError> {
        let response = match &self.kind {
            RequestKind::Limit => {
                let body = limit_request_body(self.limit, &self.target.region);
                self.client
                    .submit_limit_request(&self.group, &self.target, &body)
                    .await?
            }
            RequestKind::Allocation { subscription_id } => {
                let body = allocation_request_body(self.limit, &self.target.region);
                self.client
                    .submit_allocation_request(subscription_id, &self.group, &self.target, &body)
                    .await?
            }
        };
        Ok(response.into())
    }

    async fn fetch_result(&self) -> std::result::Result<Value, ApiError> {
        match &self.kind {
            RequestKind::Limit => self.client.get_limit(&self.group, &self.target).await,
            RequestKind::Allocation { subscription_id } => {
                self.client
                    .get_allocation(subscription_id, &self.group, &self.target)
                    .await
            }
        }
    }
}

/// Request documents always carry a state; treat its absence as unrecognised
fn is_arm_canceled(state: &ProvisioningState) -> bool {
    matches!(
        state,
        ProvisioningState::Unknown(raw)
            if raw.eq_ignore_ascii_case("canceled") || raw.eq_ignore_ascii_case("cancelled")
    )
}

fn missing_state() -> ProvisioningState {
    ProvisioningState::Unknown("missing".to_string())
}

/// Plain ARM mutations tracked through their status location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmAction {
    CreateGroup {
        group: String,
        display_name: String,
        billing_id: Option<String>,
    },
    DeleteGroup {
        group: String,
    },
    AddSubscription {
        group: String,
        subscription_id: String,
    },
    RemoveSubscription {
        group: String,
        subscription_id: String,
    },
}

/// A group or group-subscription mutation
#[derive(Debug, Clone)]
pub struct ArmResourceOperation<'a> {
    client: &'a QuotaClient,
    action: ArmAction,
}

impl<'a> ArmResourceOperation<'a> {
    pub fn new(client: &'a QuotaClient, action: ArmAction) -> Self {
        Self { client, action }
    }

    pub fn action(&self) -> &ArmAction {
        &self.action
    }
}

#[async_trait]
impl StatusSource for ArmResourceOperation<'_> {
    /// A 202 means still running; any other success without a state field
    /// means the operation is done
    ///
    /// ARM operation documents end a cancelled operation with `Canceled`,
    /// which is read as `Failed` here; other unrecognised values keep
    /// polling.
    async fn query_status(
        &self,
        handle: &OperationHandle,
    ) -> std::result::Result<StatusReport, ApiError> {
        let response = self.client.get_status(handle.status_url()).await?;
        let missing = if response.status == 202 {
            ProvisioningState::InProgress
        } else {
            ProvisioningState::Succeeded
        };
        let mut report = StatusReport::from_body(response.body, missing);
        if is_arm_canceled(&report.state) {
            report.state = ProvisioningState::Failed;
        }
        Ok(report)
    }
}

#[async_trait]
impl LongRunningOperation for ArmResourceOperation<'_> {
    fn describe(&self) -> String {
        match &self.action {
            ArmAction::CreateGroup { group, .. } => format!("create group quota {}", group),
            ArmAction::DeleteGroup { group } => format!("delete group quota {}", group),
            ArmAction::AddSubscription {
                group,
                subscription_id,
            } => format!("add subscription {} to group {}", subscription_id, group),
            ArmAction::RemoveSubscription {
                group,
                subscription_id,
            } => format!("remove subscription {} from group {}", subscription_id, group),
        }
    }

    async fn submit(&self) -> std::result::Result<InitialResponse, ApiError> {
        let response = match &self.action {
            ArmAction::CreateGroup {
                group,
                display_name,
                billing_id,
            } => {
                let body = group_quota_body(display_name, billing_id.as_deref());
                self.client.create_group_quota(group, &body).await?
            }
            ArmAction::DeleteGroup { group } => self.client.delete_group_quota(group).await?,
            ArmAction::AddSubscription {
                group,
                subscription_id,
            } => self.client.add_subscription(group, subscription_id).await?,
            ArmAction::RemoveSubscription {
                group,
                subscription_id,
            } => self.client.remove_subscription(group, subscription_id).await?,
        };
        Ok(response.into())
    }

    /// Deletions have nothing left to read and yield `null`
    async fn fetch_result(&self) -> std::result::Result<Value, ApiError> {
        match &self.action {
            ArmAction::CreateGroup { group, .. } => self.client.get_group_quota(group).await,
            ArmAction::AddSubscription {
                group,
                subscription_id,
            } => self.client.get_subscription(group, subscription_id).await,
            ArmAction::DeleteGroup { .. } | ArmAction::RemoveSubscription { .. } => {
                Ok(Value::Null)
            }
        }
    }

    fn allows_synchronous_completion(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ArmClient;

    fn client() -> QuotaClient {
        let arm = ArmClient::new("https://management.azure.com", "2023-06-01-preview", "t")
            .unwrap();
        QuotaClient::new(arm, "mg-1")
    }

    #[test]
    fn test_limit_handle_for_request_id() {
        let client = client();
        let request = QuotaRequest::limit(&client, "g1", QuotaTarget::default(), 50);
        let handle = request.handle_for("req-42").unwrap();

        assert_eq!(handle.operation_id(), "req-42");
        assert!(
            handle
                .status_url()
                .path()
                .ends_with("/groupQuotas/g1/groupQuotaRequests/req-42")
        );
    }

    #[test]
    fn test_allocation_handle_for_request_id() {
        let client = client();
        let request =
            QuotaRequest::allocation(&client, "sub-1", "g1", QuotaTarget::default(), 10);
        let handle = request.handle_for("alloc-1").unwrap();

        assert!(
            handle
                .status_url()
                .path()
                .ends_with("/subscriptions/sub-1/providers/Microsoft.Quota/groupQuotas/g1/quotaAllocationRequests/alloc-1")
        );
        assert_eq!(request.kind().to_string(), "allocation");
    }

    #[test]
    fn test_only_arm_canceled_is_read_as_terminal() {
        assert!(is_arm_canceled(&ProvisioningState::parse("Canceled")));
        assert!(is_arm_canceled(&ProvisioningState::parse("cancelled")));
        assert!(!is_arm_canceled(&ProvisioningState::parse("Running")));
        assert!(!is_arm_canceled(&ProvisioningState::Failed));
    }

    #[test]
    fn test_describe() {
        let client = client();
        let request = QuotaRequest::limit(&client, "g1", QuotaTarget::default(), 50);
        assert_eq!(
            request.describe(),
            "limit request for Microsoft.Compute/cores in westus2 (group g1, limit 50)"
        );

        let op = ArmResourceOperation::new(
            &client,
            ArmAction::RemoveSubscription {
                group: "g1".to_string(),
                subscription_id: "sub-1".to_string(),
            },
        );
        assert_eq!(op.describe(), "remove subscription sub-1 from group g1");
        assert!(op.allows_synchronous_completion());
        assert!(!request.allows_synchronous_completion());
    }
}
