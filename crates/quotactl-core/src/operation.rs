//! Operation location: turning a submit response into a trackable handle
//!
//! The Quota API answers a mutating request with `202 Accepted` and a
//! `Location` header pointing at the request's status resource. The status
//! resource is addressable by an opaque trailing ID, so
//! [`TrailingSegmentLocator`] takes the final non-empty path segment as the
//! operation ID. That is a contract with the remote service, not something
//! this crate controls; APIs that return the ID explicitly can plug in
//! [`BodyFieldLocator`] or their own [`OperationLocator`] without touching
//! the poller.

use crate::api::ApiResponse;
use crate::error::{CoreError, Result};
use crate::state::ProvisioningState;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use url::Url;

/// Raw result of a submit call
#[derive(Debug, Clone, Default)]
pub struct InitialResponse {
    /// HTTP status of the submit call
    pub status: u16,
    /// Status location header (`Location`, else `Azure-AsyncOperation`)
    pub status_location: Option<String>,
    /// Response body, opaque except for `provisioningState`
    pub body: Value,
}

impl InitialResponse {
    /// Provisioning state reported inline by the submit response, if any
    pub fn reported_state(&self) -> Option<ProvisioningState> {
        provisioning_state_of(&self.body)
    }

    /// True when the submit call finished synchronously: no status location,
    /// a non-202 status and no non-terminal state in the body
    pub fn completed_synchronously(&self) -> bool {
        self.status_location.is_none()
            && self.status != 202
            && self
                .reported_state()
                .is_none_or(|s| s == ProvisioningState::Succeeded)
    }
}

impl From<ApiResponse> for InitialResponse {
    fn from(response: ApiResponse) -> Self {
        Self {
            status: response.status,
            status_location: response.location.or(response.async_operation),
            body: response.body,
        }
    }
}

/// Read `provisioningState` (or ARM async-operation `status`) from a body
pub fn provisioning_state_of(body: &Value) -> Option<ProvisioningState> {
    body.pointer("/properties/provisioningState")
        .or_else(|| body.get("provisioningState"))
        .or_else(|| body.get("status"))
        .and_then(Value::as_str)
        .map(ProvisioningState::parse)
}

/// Where to re-check an in-flight operation
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationHandle {
    status_url: Url,
    operation_id: String,
}

impl OperationHandle {
    pub fn new(status_url: Url, operation_id: impl Into<String>) -> Self {
        Self {
            status_url,
            operation_id: operation_id.into(),
        }
    }

    pub fn status_url(&self) -> &Url {
        &self.status_url
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.operation_id, self.status_url)
    }
}

/// Extracts an [`OperationHandle`] from a submit response
pub trait OperationLocator: Send + Sync {
    fn locate(&self, response: &InitialResponse) -> Result<OperationHandle>;
}

/// Operation ID = final non-empty path segment of the status location
#[derive(Debug, Clone, Copy, Default)]
pub struct TrailingSegmentLocator;

impl OperationLocator for TrailingSegmentLocator {
    fn locate(&self, response: &InitialResponse) -> Result<OperationHandle> {
        let url = parse_status_location(response)?;
        let operation_id = trailing_segment(&url).ok_or_else(|| {
            CoreError::InvalidOperationLocation {
                location: url.to_string(),
                reason: "no path segment to use as operation ID".to_string(),
            }
        })?;
        Ok(OperationHandle::new(url, operation_id))
    }
}

/// Operation ID read from a JSON body field (e.g. `/name`); the status URL
/// still comes from the response header
#[derive(Debug, Clone)]
pub struct BodyFieldLocator {
    pointer: String,
}

impl BodyFieldLocator {
    /// `pointer` is a JSON pointer such as `/name` or `/properties/requestId`
    pub fn new(pointer: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
        }
    }
}

impl OperationLocator for BodyFieldLocator {
    fn locate(&self, response: &InitialResponse) -> Result<OperationHandle> {
        let url = parse_status_location(response)?;
        let operation_id = response
            .body
            .pointer(&self.pointer)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoreError::InvalidOperationLocation {
                location: url.to_string(),
                reason: format!("response body has no '{}' field", self.pointer),
            })?;
        Ok(OperationHandle::new(url, operation_id))
    }
}

fn parse_status_location(response: &InitialResponse) -> Result<Url> {
    let location = response
        .status_location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or(CoreError::MissingOperationLocation)?;

    Url::parse(location).map_err(|e| CoreError::InvalidOperationLocation {
        location: location.to_string(),
        reason: e.to_string(),
    })
}

fn trailing_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .rev()
        .find(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response_with(location: Option<&str>) -> InitialResponse {
        InitialResponse {
            status: 202,
            status_location: location.map(String::from),
            body: Value::Null,
        }
    }

    #[test]
    fn test_trailing_segment_is_operation_id() {
        let response = response_with(Some(
            "https://management.azure.com/providers/Microsoft.Management/managementGroups/mg/providers/Microsoft.Quota/groupQuotas/g1/groupQuotaLimitsRequests/requestId1?api-version=2023-06-01-preview",
        ));

        let handle = TrailingSegmentLocator.locate(&response).unwrap();

        assert_eq!(handle.operation_id(), "requestId1");
        assert!(handle.status_url().as_str().ends_with("api-version=2023-06-01-preview"));
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let response = response_with(Some("https://x/ops/op-123/"));
        let handle = TrailingSegmentLocator.locate(&response).unwrap();
        assert_eq!(handle.operation_id(), "op-123");
    }

    #[test]
    fn test_missing_location_is_hard_error() {
        let err = TrailingSegmentLocator
            .locate(&response_with(None))
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingOperationLocation));

        let err = TrailingSegmentLocator
            .locate(&response_with(Some("   ")))
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingOperationLocation));
    }

    #[test]
    fn test_unparseable_location_is_invalid() {
        let err = TrailingSegmentLocator
            .locate(&response_with(Some("/relative/op-1")))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperationLocation { .. }));
    }

    #[test]
    fn test_location_without_path_is_invalid() {
        let err = TrailingSegmentLocator
            .locate(&response_with(Some("https://x/")))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperationLocation { .. }));
    }

    #[test]
    fn test_body_field_locator() {
        let mut response = response_with(Some("https://x/operations/status"));
        response.body = json!({"name": "req-42", "properties": {}});

        let handle = BodyFieldLocator::new("/name").locate(&response).unwrap();
        assert_eq!(handle.operation_id(), "req-42");
        assert_eq!(handle.status_url().as_str(), "https://x/operations/status");

        let err = BodyFieldLocator::new("/properties/requestId")
            .locate(&response)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperationLocation { .. }));
    }

    #[test]
    fn test_initial_response_prefers_location_header() {
        let response = InitialResponse::from(ApiResponse {
            status: 202,
            location: Some("https://x/a/loc".to_string()),
            async_operation: Some("https://x/a/async".to_string()),
            retry_after: None,
            body: Value::Null,
        });
        assert_eq!(response.status_location.as_deref(), Some("https://x/a/loc"));

        let response = InitialResponse::from(ApiResponse {
            status: 201,
            location: None,
            async_operation: Some("https://x/a/async".to_string()),
            retry_after: None,
            body: Value::Null,
        });
        assert_eq!(
            response.status_location.as_deref(),
            Some("https://x/a/async")
        );
    }

    #[test]
    fn test_synchronous_completion_detection() {
        let done = InitialResponse {
            status: 200,
            status_location: None,
            body: json!({"properties": {"provisioningState": "Succeeded"}}),
        };
        assert!(done.completed_synchronously());

        let pending = InitialResponse {
            status: 201,
            status_location: None,
            body: json!({"properties": {"provisioningState": "Accepted"}}),
        };
        assert!(!pending.completed_synchronously());

        assert!(!response_with(None).completed_synchronously());
    }
}
