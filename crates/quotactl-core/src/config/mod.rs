//! Configuration and profile management
//!
//! Each profile names one management group, the endpoint and API version to
//! reach it, a bearer token (optionally kept in the OS keyring), defaults for
//! region/provider/resource, and the poll cadence for long-running requests.

// Allow nested config module - this is intentional for the config subsystem
#![allow(clippy::module_inception)]

pub mod config;
pub mod credential;
pub mod error;
pub mod polling;

// Re-export main types for convenience
pub use config::{ACCESS_TOKEN_ENV, Config, Profile};
pub use credential::CredentialStore;
pub use error::{ConfigError, Result};
pub use polling::PollingConfig;
