//! Access-token resolution with optional OS keyring support
//!
//! A profile's `access_token` is one of:
//! - a plaintext bearer token
//! - `keyring:<entry>`, looked up in the OS keyring (feature `secure-storage`)
//!
//! An environment variable, when given and set, overrides both.

use super::error::{ConfigError, Result};
use std::env;

/// Prefix that marks a value as a keyring reference
const KEYRING_PREFIX: &str = "keyring:";

/// Service name for keyring entries
#[cfg(feature = "secure-storage")]
const SERVICE_NAME: &str = "quotactl";

/// Resolves stored credential values into usable secrets
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialStore;

impl CredentialStore {
    pub fn new() -> Self {
        Self
    }

    /// Check if a value is a keyring reference
    pub fn is_keyring_reference(value: &str) -> bool {
        value.starts_with(KEYRING_PREFIX)
    }

    /// Resolve a stored value
    ///
    /// Resolution order:
    /// 1. environment variable `env_var`, if provided and set
    /// 2. keyring lookup for `keyring:` references
    /// 3. the value itself
    pub fn resolve(&self, value: &str, env_var: Option<&str>) -> Result<String> {
        if let Some(var) = env_var
            && let Ok(from_env) = env::var(var)
        {
            return Ok(from_env);
        }

        match value.strip_prefix(KEYRING_PREFIX) {
            Some(entry) => Self::read_keyring(entry),
            None => Ok(value.to_string()),
        }
    }

    /// Store `secret` under `entry` and return the reference to save in the config
    #[cfg(feature = "secure-storage")]
    pub fn store(&self, entry: &str, secret: &str) -> Result<String> {
        keyring::Entry::new(SERVICE_NAME, entry)
            .and_then(|e| e.set_password(secret))
            .map_err(|e| ConfigError::KeyringError(format!("Failed to store '{}': {}", entry, e)))?;
        Ok(format!("{}{}", KEYRING_PREFIX, entry))
    }

    #[cfg(feature = "secure-storage")]
    fn read_keyring(entry: &str) -> Result<String> {
        keyring::Entry::new(SERVICE_NAME, entry)
            .and_then(|e| e.get_password())
            .map_err(|e| {
                ConfigError::KeyringError(format!("Failed to read '{}' from keyring: {}", entry, e))
            })
    }

    #[cfg(not(feature = "secure-storage"))]
    fn read_keyring(entry: &str) -> Result<String> {
        Err(ConfigError::CredentialError(format!(
            "'{}{}' needs the secure-storage feature",
            KEYRING_PREFIX, entry
        )))
    }
}
