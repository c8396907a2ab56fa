//! Microsoft.Quota REST calls scoped to one management group
//!
//! Every method is a single request. Polling and result fetching are layered
//! on top in [`super::operations`].

use super::params::QuotaTarget;
use crate::api::{ApiError, ApiResponse, ArmClient};
use serde_json::Value;
use url::Url;

const QUOTA_PROVIDER: &str = "providers/Microsoft.Quota";

/// Client for group quota, subscription, limit and allocation resources
#[derive(Debug, Clone)]
pub struct QuotaClient {
    arm: ArmClient,
    management_group_id: String,
}

impl QuotaClient {
    pub fn new(arm: ArmClient, management_group_id: impl Into<String>) -> Self {
        Self {
            arm,
            management_group_id: management_group_id.into(),
        }
    }

    pub fn arm(&self) -> &ArmClient {
        &self.arm
    }

    pub fn management_group_id(&self) -> &str {
        &self.management_group_id
    }

    // ------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------

    fn management_group_path(&self) -> String {
        format!(
            "/providers/Microsoft.Management/managementGroups/{}",
            self.management_group_id
        )
    }

    pub fn group_path(&self, group: &str) -> String {
        format!(
            "{}/{}/groupQuotas/{}",
            self.management_group_path(),
            QUOTA_PROVIDER,
            group
        )
    }

    /// Subscription-scoped view of a group quota
    pub fn group_subscription_path(&self, group: &str, subscription_id: &str) -> String {
        format!(
            "{}/subscriptions/{}/{}/groupQuotas/{}",
            self.management_group_path(),
            subscription_id,
            QUOTA_PROVIDER,
            group
        )
    }

    pub fn limit_request_submit_path(&self, group: &str, target: &QuotaTarget) -> String {
        format!(
            "{}/resourceProviders/{}/groupQuotaLimitsRequests/{}",
            self.group_path(group),
            target.provider,
            target.resource_name
        )
    }

    pub fn limit_request_path(&self, group: &str, request_id: &str) -> String {
        format!("{}/groupQuotaRequests/{}", self.group_path(group), request_id)
    }

    pub fn limit_path(&self, group: &str, target: &QuotaTarget) -> String {
        format!(
            "{}/resourceProviders/{}/groupQuotaLimits/{}",
            self.group_path(group),
            target.provider,
            target.resource_name
        )
    }

    pub fn allocation_request_submit_path(
        &self,
        subscription_id: &str,
        group: &str,
        target: &QuotaTarget,
    ) -> String {
        format!(
            "{}/resourceProviders/{}/quotaAllocationRequests/{}",
            self.group_subscription_path(group, subscription_id),
            target.provider,
            target.resource_name
        )
    }

    pub fn allocation_request_path(
        &self,
        subscription_id: &str,
        group: &str,
        request_id: &str,
    ) -> String {
        format!(
            "{}/quotaAllocationRequests/{}",
            self.group_subscription_path(group, subscription_id),
            request_id
        )
    }

    pub fn allocation_path(
        &self,
        subscription_id: &str,
        group: &str,
        target: &QuotaTarget,
    ) -> String {
        format!(
            "{}/resourceProviders/{}/quotaAllocations/{}",
            self.group_subscription_path(group, subscription_id),
            target.provider,
            target.resource_name
        )
    }

    /// Absolute URL for a resource path, as used for status handles
    pub fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        self.arm.resource_url(path, &[])
    }

    // ------------------------------------------------------------------
    // Group quotas
    // ------------------------------------------------------------------

    pub async fn create_group_quota(
        &self,
        group: &str,
        body: &Value,
    ) -> Result<ApiResponse, ApiError> {
        self.arm.put(&self.group_path(group), body).await
    }

    pub async fn get_group_quota(&self, group: &str) -> Result<Value, ApiError> {
        Ok(self.arm.get(&self.group_path(group), &[]).await?.body)
    }

    pub async fn delete_group_quota(&self, group: &str) -> Result<ApiResponse, ApiError> {
        self.arm.delete(&self.group_path(group)).await
    }

    // ------------------------------------------------------------------
    // Group subscriptions
    // ------------------------------------------------------------------

    pub async fn add_subscription(
        &self,
        group: &str,
        subscription_id: &str,
    ) -> Result<ApiResponse, ApiError> {
        let path = self.group_subscription_path(group, subscription_id);
        self.arm.put(&path, &Value::Object(Default::default())).await
    }

    pub async fn get_subscription(
        &self,
        group: &str,
        subscription_id: &str,
    ) -> Result<Value, ApiError> {
        let path = self.group_subscription_path(group, subscription_id);
        Ok(self.arm.get(&path, &[]).await?.body)
    }

    pub async fn remove_subscription(
        &self,
        group: &str,
        subscription_id: &str,
    ) -> Result<ApiResponse, ApiError> {
        let path = self.group_subscription_path(group, subscription_id);
        self.arm.delete(&path).await
    }

    // ------------------------------------------------------------------
    // Group quota limits
    // ------------------------------------------------------------------

    pub async fn submit_limit_request(
        &self,
        group: &str,
        target: &QuotaTarget,
        body: &Value,
    ) -> Result<ApiResponse, ApiError> {
        self.arm
            .put(&self.limit_request_submit_path(group, target), body)
            .await
    }

    pub async fn get_limit_request(
        &self,
        group: &str,
        request_id: &str,
    ) -> Result<Value, ApiError> {
        let path = self.limit_request_path(group, request_id);
        Ok(self.arm.get(&path, &[]).await?.body)
    }

    pub async fn get_limit(&self, group: &str, target: &QuotaTarget) -> Result<Value, ApiError> {
        let filter = target.location_filter();
        let path = self.limit_path(group, target);
        Ok(self.arm.get(&path, &[("$filter", &filter)]).await?.body)
    }

    // ------------------------------------------------------------------
    // Subscription allocations
    // ------------------------------------------------------------------

    pub async fn submit_allocation_request(
        &self,
        subscription_id: &str,
        group: &str,
        target: &QuotaTarget,
        body: &Value,
    ) -> Result<ApiResponse, ApiError> {
        let path = self.allocation_request_submit_path(subscription_id, group, target);
        self.arm.put(&path, body).await
    }

    pub async fn get_allocation_request(
        &self,
        subscription_id: &str,
        group: &str,
        request_id: &str,
    ) -> Result<Value, ApiError> {
        let path = self.allocation_request_path(subscription_id, group, request_id);
        Ok(self.arm.get(&path, &[]).await?.body)
    }

    pub async fn get_allocation(
        &self,
        subscription_id: &str,
        group: &str,
        target: &QuotaTarget,
    ) -> Result<Value, ApiError> {
        let filter = target.location_filter();
        let path = self.allocation_path(subscription_id, group, target);
        Ok(self.arm.get(&path, &[("$filter", &filter)]).await?.body)
    }

    // ------------------------------------------------------------------
    // Status locations
    // ------------------------------------------------------------------

    /// GET a status URL handed out by a submit response
    pub async fn get_status(&self, status_url: &Url) -> Result<ApiResponse, ApiError> {
        self.arm.get_url(status_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> QuotaClient {
        let arm = ArmClient::new(
            "https://management.azure.com",
            "2023-06-01-preview",
            "token",
        )
        .unwrap();
        QuotaClient::new(arm, "mg-1")
    }

    #[test]
    fn test_group_path() {
        assert_eq!(
            client().group_path("g1"),
            "/providers/Microsoft.Management/managementGroups/mg-1/providers/Microsoft.Quota/groupQuotas/g1"
        );
    }

    #[test]
    fn test_group_subscription_path() {
        assert_eq!(
            client().group_subscription_path("g1", "sub-1"),
            "/providers/Microsoft.Management/managementGroups/mg-1/subscriptions/sub-1/providers/Microsoft.Quota/groupQuotas/g1"
        );
    }

    #[test]
    fn test_limit_paths() {
        let c = client();
        let target = QuotaTarget::default();
        assert!(
            c.limit_request_submit_path("g1", &target)
                .ends_with("/groupQuotas/g1/resourceProviders/Microsoft.Compute/groupQuotaLimitsRequests/cores")
        );
        assert!(
            c.limit_request_path("g1", "req-1")
                .ends_with("/groupQuotas/g1/groupQuotaRequests/req-1")
        );
        assert!(
            c.limit_path("g1", &target)
                .ends_with("/groupQuotas/g1/resourceProviders/Microsoft.Compute/groupQuotaLimits/cores")
        );
    }

    #[test]
    fn test_allocation_paths() {
        let c = client();
        let target = QuotaTarget::default();
        assert!(
            c.allocation_request_path("sub-1", "g1", "alloc-1")
                .ends_with("/subscriptions/sub-1/providers/Microsoft.Quota/groupQuotas/g1/quotaAllocationRequests/alloc-1")
        );
        assert!(
            c.allocation_path("sub-1", "g1", &target)
                .ends_with("/subscriptions/sub-1/providers/Microsoft.Quota/groupQuotas/g1/resourceProviders/Microsoft.Compute/quotaAllocations/cores")
        );
    }

    #[test]
    fn test_url_for_adds_api_version() {
        let url = client().url_for(&client().limit_request_path("g1", "req-1")).unwrap();
        assert_eq!(url.query(), Some("api-version=2023-06-01-preview"));
        assert_eq!(url.path_segments().and_then(|mut s| s.next_back()), Some("req-1"));
    }
}
