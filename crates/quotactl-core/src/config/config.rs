//! Configuration management for quotactl
//!
//! Handles configuration loading from files and environment variables.
//! Configuration is stored in TOML format with support for multiple named profiles.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::credential::CredentialStore;
use super::error::{ConfigError, Result};
use super::polling::PollingConfig;

/// Environment variable that overrides every profile's access token
pub const ACCESS_TOKEN_ENV: &str = "QUOTACTL_ACCESS_TOKEN";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Profile used when `--profile` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// One management-group target and the credentials to reach it
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Profile {
    /// Resource Manager endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Microsoft.Quota API version
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Management group that owns the group quotas
    pub management_group_id: String,
    /// Subscription added to groups and receiving allocations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    /// Bearer token, or a `keyring:` reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Default region for limit and allocation commands
    #[serde(default = "default_location")]
    pub location: String,
    /// Default resource provider namespace
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Default quota resource name
    #[serde(default = "default_resource_name")]
    pub resource_name: String,
    /// Poll cadence and deadline
    #[serde(default)]
    pub polling: PollingConfig,
}

impl Profile {
    /// Profile for `management_group_id` with every other field defaulted
    pub fn new(management_group_id: impl Into<String>) -> Self {
        Self {
            endpoint: default_endpoint(),
            api_version: default_api_version(),
            management_group_id: management_group_id.into(),
            subscription_id: None,
            access_token: None,
            location: default_location(),
            provider: default_provider(),
            resource_name: default_resource_name(),
            polling: PollingConfig::default(),
        }
    }

    /// Resolve the bearer token (env override, keyring, plaintext)
    pub fn resolve_access_token(&self, profile_name: &str) -> Result<String> {
        let store = CredentialStore::new();
        match &self.access_token {
            Some(token) => store.resolve(token, Some(ACCESS_TOKEN_ENV)),
            None => std::env::var(ACCESS_TOKEN_ENV).map_err(|_| ConfigError::MissingField {
                profile: profile_name.to_string(),
                field: "access_token".to_string(),
            }),
        }
    }

    /// Subscription ID, required by subscription and allocation commands
    pub fn require_subscription(&self, profile_name: &str) -> Result<&str> {
        self.subscription_id
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField {
                profile: profile_name.to_string(),
                field: "subscription_id".to_string(),
            })
    }
}

impl Config {
    /// Resolve which profile to use
    ///
    /// Order: explicit name, `default_profile`, first profile alphabetically.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(name) = explicit {
            return Ok(name.to_string());
        }
        if let Some(ref default) = self.default_profile {
            return Ok(default.clone());
        }
        self.list_profiles()
            .first()
            .map(|(name, _)| (*name).clone())
            .ok_or(ConfigError::NoProfiles)
    }

    /// Resolve and look up the profile to use
    pub fn resolve_profile(&self, explicit: Option<&str>) -> Result<(String, &Profile)> {
        let name = self.resolve_profile_name(explicit)?;
        let profile = self
            .profiles
            .get(&name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.clone() })?;
        Ok((name, profile))
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path; a missing file is an empty config
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);
        let config: Config = toml::from_str(&expanded_content)?;
        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// On Linux: ~/.config/quotactl/config.toml
    /// On macOS: ~/Library/Application Support/io.quotactl.quotactl/config.toml
    /// On Windows: %APPDATA%\quotactl\quotactl\config\config.toml
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("io", "quotactl", "quotactl").ok_or(ConfigError::ConfigDirError)?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand `${VAR}` and `${VAR:-default}` references
    ///
    /// Unset variables without a default are left as-is so that profiles which
    /// are not in use do not break loading.
    fn expand_env_vars(content: &str) -> String {
        shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok()).to_string()
    }
}

fn default_endpoint() -> String {
    "https://management.azure.com".to_string()
}

fn default_api_version() -> String {
    "2023-06-01-preview".to_string()
}

fn default_location() -> String {
    "westus2".to_string()
}

fn default_provider() -> String {
    "Microsoft.Compute".to_string()
}

fn default_resource_name() -> String {
    "cores".to_string()
}
