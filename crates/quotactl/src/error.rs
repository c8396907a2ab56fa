//! Error types for quotactl
//!
//! Defines structured error types using thiserror for better error handling and user experience.

use colored::Colorize;
use quotactl_core::{ApiError, ConfigError, CoreError};
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Profile 'corp' is missing 'subscription_id'
///
///   tip: set a default subscription on the profile:
///       quotactl profile set corp --subscription-id <id>
/// ```
pub struct CliDiagnostic {
    message: String,
    detail: Option<String>,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    /// Start a new error diagnostic with the given message.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            detail: None,
            tips: Vec::new(),
        }
    }

    /// Add a detail line below the error message.
    pub fn detail(mut self, text: &str) -> Self {
        self.detail = Some(text.to_string());
        self
    }

    /// Add a tip with optional example commands.
    pub fn tip(mut self, description: &str, commands: &[&str]) -> Self {
        self.tips.push((
            description.to_string(),
            commands.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        if let Some(detail) = &self.detail {
            eprintln!("  {}", detail);
        }

        for (description, commands) in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
            for cmd in commands {
                eprintln!("      {}", cmd);
            }
        }
    }
}

/// Main error type for the quotactl application
#[derive(Error, Debug)]
pub enum QuotaCtlError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profile configured. Use 'quotactl profile set' to configure a profile.")]
    NoProfileConfigured,

    #[error("Profile '{profile}' is missing '{field}'")]
    MissingProfileField { profile: String, field: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("API error: {message}")]
    ApiError { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Operation error: {message}")]
    Operation {
        message: String,
        status_url: Option<String>,
    },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for quotactl operations
pub type Result<T> = std::result::Result<T, QuotaCtlError>;

impl QuotaCtlError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            QuotaCtlError::ProfileNotFound { name } => vec![
                "List available profiles: quotactl profile list".to_string(),
                format!(
                    "Create profile '{}': quotactl profile set {} --management-group-id <id>",
                    name, name
                ),
                "Check profile name spelling".to_string(),
            ],
            QuotaCtlError::NoProfileConfigured => vec![
                "Create a profile: quotactl profile set <name> --management-group-id <id> --subscription-id <id>".to_string(),
                "View profile documentation: quotactl profile --help".to_string(),
            ],
            QuotaCtlError::MissingProfileField { profile, field } if field == "access_token" => vec![
                format!("Store a token: quotactl profile set {} --access-token <token>", profile),
                "Or export QUOTACTL_ACCESS_TOKEN, e.g. from 'az account get-access-token --query accessToken -o tsv'".to_string(),
            ],
            QuotaCtlError::MissingProfileField { profile, field } => vec![
                format!(
                    "Set it on the profile: quotactl profile set {} --{} <value>",
                    profile,
                    field.replace('_', "-")
                ),
                "Or pass it on the command line (see --help)".to_string(),
            ],
            QuotaCtlError::AuthenticationFailed { .. } => vec![
                "Access tokens expire after about an hour; fetch a fresh one".to_string(),
                "Check the profile: quotactl profile show <profile>".to_string(),
                "Ensure the identity has Microsoft.Quota permissions on the management group".to_string(),
            ],
            QuotaCtlError::ConnectionError { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify the endpoint is correct: quotactl profile show <profile>".to_string(),
            ],
            QuotaCtlError::ApiError { message } if message.contains("not found") || message.contains("404") => vec![
                "Verify the group, subscription and management group IDs".to_string(),
                "Check that you're using the correct profile".to_string(),
            ],
            QuotaCtlError::InvalidInput { .. } => vec![
                "Check the command syntax: quotactl <command> --help".to_string(),
            ],
            QuotaCtlError::Operation {
                status_url: Some(url),
                ..
            } => vec![format!("Check the request status with a GET on {}", url)],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&format!("{}", self));

        if let QuotaCtlError::Operation {
            status_url: Some(url),
            ..
        } = self
        {
            diag = diag.detail(&format!("status: {}", url));
        }

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion, &[]);
        }

        diag.print();
    }
}

impl From<ApiError> for QuotaCtlError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized { message } => QuotaCtlError::AuthenticationFailed { message },
            ApiError::Request(e) if e.is_connect() => QuotaCtlError::ConnectionError {
                message: e.to_string(),
            },
            ApiError::BadRequest { message } => QuotaCtlError::InvalidInput { message },
            _ => QuotaCtlError::ApiError {
                message: err.to_string(),
            },
        }
    }
}

impl From<ConfigError> for QuotaCtlError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => QuotaCtlError::ProfileNotFound { name },
            ConfigError::NoProfiles => QuotaCtlError::NoProfileConfigured,
            ConfigError::MissingField { profile, field } => {
                QuotaCtlError::MissingProfileField { profile, field }
            }
            _ => QuotaCtlError::Configuration(err.to_string()),
        }
    }
}

impl From<CoreError> for QuotaCtlError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(message) => QuotaCtlError::InvalidInput { message },
            CoreError::Config(e) => QuotaCtlError::from(e),
            CoreError::Api(e) => QuotaCtlError::from(e),
            CoreError::Submission(ApiError::Unauthorized { message })
            | CoreError::StatusQuery(ApiError::Unauthorized { message }) => {
                QuotaCtlError::AuthenticationFailed { message }
            }
            other => QuotaCtlError::Operation {
                status_url: other.status_url().map(str::to_string),
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for QuotaCtlError {
    fn from(err: serde_json::Error) -> Self {
        QuotaCtlError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for QuotaCtlError {
    fn from(err: std::io::Error) -> Self {
        QuotaCtlError::OutputError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<anyhow::Error> for QuotaCtlError {
    fn from(err: anyhow::Error) -> Self {
        QuotaCtlError::Configuration(err.to_string())
    }
}
