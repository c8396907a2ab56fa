//! Request parameters and payload builders for Microsoft.Quota resources
//!
//! Payloads are built as plain JSON documents; the engine only ever reads
//! `provisioningState` back out of them.

use crate::error::{CoreError, Result};
use serde_json::{Value, json};

/// Default resource provider namespace
pub const DEFAULT_PROVIDER: &str = "Microsoft.Compute";

/// Default quota resource name
pub const DEFAULT_RESOURCE_NAME: &str = "cores";

/// Default region
pub const DEFAULT_REGION: &str = "westus2";

/// Which quota a limit or allocation request targets
///
/// # Example
///
/// ```rust
/// use quotactl_core::quota::QuotaTarget;
///
/// let target = QuotaTarget::default()
///     .with_resource_name("standardDSv3Family")
///     .with_region("eastus");
/// assert_eq!(target.provider, "Microsoft.Compute");
/// assert_eq!(target.location_filter(), "location eq eastus");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaTarget {
    /// Resource provider namespace, e.g. `Microsoft.Compute`
    pub provider: String,
    /// Quota resource name, e.g. `cores` or a VM family
    pub resource_name: String,
    /// Azure region the limit applies to
    pub region: String,
}

impl Default for QuotaTarget {
    fn default() -> Self {
        Self::new(DEFAULT_PROVIDER, DEFAULT_RESOURCE_NAME, DEFAULT_REGION)
    }
}

impl QuotaTarget {
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        resource_name: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            resource_name: resource_name.into(),
            region: region.into(),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    #[must_use]
    pub fn with_resource_name(mut self, resource_name: impl Into<String>) -> Self {
        self.resource_name = resource_name.into();
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// OData filter selecting this target's region
    pub fn location_filter(&self) -> String {
        format!("location eq {}", self.region)
    }

    pub fn validate(&self) -> Result<()> {
        require_segment("provider", &self.provider)?;
        require_segment("resource name", &self.resource_name)?;
        require_segment("region", &self.region)
    }
}

/// Validate a value that becomes one path segment of a resource URL
pub fn require_segment(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{} must not be empty", what)));
    }
    if value.contains('/') {
        return Err(CoreError::Validation(format!(
            "{} '{}' must not contain '/'",
            what, value
        )));
    }
    Ok(())
}

/// Body for creating or updating a group quota
///
/// `billing_id` groups the quota under a billing identifier; pass `None` to
/// leave grouping to the service.
pub fn group_quota_body(display_name: &str, billing_id: Option<&str>) -> Value {
    let mut properties = json!({ "displayName": display_name });
    if let Some(id) = billing_id {
        properties["additionalAttributes"] = json!({
            "groupId": {
                "groupingIdType": "BillingId",
                "value": id,
            }
        });
    }
    json!({ "properties": properties })
}

/// Body for a group quota limit request
pub fn limit_request_body(limit: i64, region: &str) -> Value {
    requested_resource(limit, region)
}

/// Body for a subscription allocation request
pub fn allocation_request_body(limit: i64, region: &str) -> Value {
    requested_resource(limit, region)
}

fn requested_resource(limit: i64, region: &str) -> Value {
    json!({
        "properties": {
            "requestedResource": {
                "properties": {
                    "limit": limit,
                    "region": region,
                }
            }
        }
    })
}

/// Reject negative limits before anything is sent
pub fn validate_limit(limit: i64) -> Result<()> {
    if limit < 0 {
        return Err(CoreError::Validation(format!(
            "limit must be zero or positive, got {}",
            limit
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_target_defaults() {
        let target = QuotaTarget::default();
        assert_eq!(target.provider, "Microsoft.Compute");
        assert_eq!(target.resource_name, "cores");
        assert_eq!(target.region, "westus2");
        assert!(target.validate().is_ok());
    }

    #[test]
    fn test_target_validation() {
        let target = QuotaTarget::default().with_region("");
        assert!(matches!(target.validate(), Err(CoreError::Validation(_))));

        let target = QuotaTarget::default().with_resource_name("a/b");
        let err = target.validate().unwrap_err();
        assert!(err.to_string().contains("must not contain '/'"));
    }

    #[test]
    fn test_group_quota_body_with_billing_id() {
        let body = group_quota_body("test-group", Some("E7EC67B3"));
        assert_eq!(body["properties"]["displayName"], "test-group");
        assert_eq!(
            body["properties"]["additionalAttributes"]["groupId"]["groupingIdType"],
            "BillingId"
        );
        assert_eq!(
            body["properties"]["additionalAttributes"]["groupId"]["value"],
            "E7EC67B3"
        );
    }

    #[test]
    fn test_group_quota_body_without_billing_id() {
        let body = group_quota_body("test-group", None);
        assert!(body["properties"].get("additionalAttributes").is_none());
    }

    #[test]
    fn test_limit_request_body() {
        let body = limit_request_body(50, "westus2");
        assert_eq!(
            body,
            json!({
                "properties": {
                    "requestedResource": {
                        "properties": { "limit": 50, "region": "westus2" }
                    }
                }
            })
        );
    }

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(0).is_ok());
        assert!(validate_limit(100).is_ok());
        assert!(validate_limit(-1).is_err());
    }
}
