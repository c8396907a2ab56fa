//! Thin REST transport for the Azure Resource Manager endpoint
//!
//! Handles bearer auth, the `api-version` query parameter and status-code to
//! error mapping. Resource-specific paths live in [`crate::quota`].

use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

/// User agent sent with every request
const QUOTACTL_USER_AGENT: &str = concat!("quotactl/", env!("CARGO_PKG_VERSION"));

/// Header carrying the async-operation status URL on some ARM resources
pub const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Errors returned by the REST transport
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Authentication failed: {message}")]
    Unauthorized { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            ApiError::Timeout(_) => true,
            ApiError::Request(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if this error is potentially retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimited { .. } | ApiError::ServerError { .. } => true,
            ApiError::Request(e) => e.is_timeout() || e.is_connect(),
            ApiError::Timeout(_) => true,
            _ => false,
        }
    }

    fn from_status(status: StatusCode, body: &str) -> Self {
        let message = error_message(body);
        match status.as_u16() {
            400 => ApiError::BadRequest { message },
            401 | 403 => ApiError::Unauthorized { message },
            404 => ApiError::NotFound { message },
            409 | 412 => ApiError::Conflict { message },
            429 => ApiError::RateLimited { message },
            code @ 500..=599 => ApiError::ServerError {
                status: code,
                message,
            },
            code => ApiError::UnexpectedStatus {
                status: code,
                message,
            },
        }
    }
}

/// Pull `error.message` out of an ARM error document, falling back to the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// A successful response with the headers the LRO engine cares about
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// `Location` header, if present
    pub location: Option<String>,
    /// `Azure-AsyncOperation` header, if present
    pub async_operation: Option<String>,
    /// `Retry-After` in seconds, if present and numeric
    pub retry_after: Option<u64>,
    /// Parsed JSON body; `Value::Null` for empty bodies
    pub body: Value,
}

impl ApiResponse {
    fn from_parts(status: StatusCode, headers: &HeaderMap, text: &str) -> Result<Self, ApiError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text)?
        };
        Ok(Self {
            status: status.as_u16(),
            location: header(LOCATION.as_str()),
            async_operation: header(AZURE_ASYNC_OPERATION),
            retry_after: header(RETRY_AFTER.as_str()).and_then(|v| v.parse().ok()),
            body,
        })
    }
}

/// Authenticated client for one ARM endpoint
#[derive(Debug, Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    base_url: Url,
    api_version: String,
    token: String,
}

impl ArmClient {
    /// Create a client for `endpoint` (e.g. `https://management.azure.com`)
    pub fn new(
        endpoint: &str,
        api_version: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(endpoint).map_err(|source| ApiError::InvalidUrl {
            url: endpoint.to_string(),
            source,
        })?;
        let http = reqwest::Client::builder()
            .user_agent(QUOTACTL_USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_version: api_version.into(),
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Resolve a resource path against the endpoint, adding `api-version`
    /// and any extra query pairs
    pub fn resource_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.join(path).map_err(|source| ApiError::InvalidUrl {
            url: path.to_string(),
            source,
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", &self.api_version);
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse, ApiError> {
        let url = self.resource_url(path, query)?;
        self.send(Method::GET, url, None).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        let url = self.resource_url(path, &[])?;
        self.send(Method::PUT, url, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        let url = self.resource_url(path, &[])?;
        self.send(Method::DELETE, url, None).await
    }

    /// GET an absolute URL handed out by the service (e.g. a status location)
    pub async fn get_url(&self, url: &Url) -> Result<ApiResponse, ApiError> {
        self.send(Method::GET, url.clone(), None).await
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        debug!("{} {}", method, url);
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&self.token);
        if let Some(body) = body {
            trace!("Request body: {}", body);
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;
        trace!("Response {}: {}", status, text);

        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }
        ApiResponse::from_parts(status, &headers, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(ApiError::from_status(StatusCode::NOT_FOUND, "").is_not_found());
        assert!(ApiError::from_status(StatusCode::FORBIDDEN, "").is_unauthorized());
        assert!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(ApiError::from_status(StatusCode::BAD_GATEWAY, "").is_retryable());
        assert!(!ApiError::from_status(StatusCode::BAD_REQUEST, "").is_retryable());
    }

    #[test]
    fn test_error_message_prefers_arm_error_document() {
        let body = r#"{"error":{"code":"QuotaExceeded","message":"Limit too high"}}"#;
        assert_eq!(error_message(body), "Limit too high");
        assert_eq!(error_message("plain failure\n"), "plain failure");
    }

    #[test]
    fn test_resource_url_appends_api_version_and_filter() {
        let client =
            ArmClient::new("https://management.azure.com", "2023-06-01-preview", "t").unwrap();
        let url = client
            .resource_url(
                "/providers/Microsoft.Quota/groupQuotas/g1",
                &[("$filter", "location eq westus2")],
            )
            .unwrap();

        assert_eq!(url.path(), "/providers/Microsoft.Quota/groupQuotas/g1");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            query,
            vec![
                ("api-version".to_string(), "2023-06-01-preview".to_string()),
                ("$filter".to_string(), "location eq westus2".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let err = ArmClient::new("not a url", "v", "t").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { .. }));
    }
}
