//! Connection management for the Microsoft.Quota client
//!
//! Turns the selected profile plus command-line overrides into a
//! [`QuotaClient`], a [`Poller`] and the request targets.

use crate::cli::TargetArgs;
use crate::error::Result as CliResult;
use anyhow::Context;
use quotactl_core::quota::{QuotaClient, QuotaTarget};
use quotactl_core::{ArmClient, CancellationToken, Config, Poller, Profile};
use std::path::PathBuf;
use tracing::{debug, info, trace};

/// Connection manager for creating authenticated clients
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    cancel: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
            cancel: CancellationToken::new(),
        }
    }

    /// Token every poller built here watches; cancelled on Ctrl-C
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Whether Ctrl-C has been pressed
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Save the configuration to the appropriate location
    pub fn save_config(&self) -> CliResult<()> {
        if let Some(ref path) = self.config_path {
            self.config
                .save_to_path(path)
                .context("Failed to save configuration")?;
        } else {
            self.config.save().context("Failed to save configuration")?;
        }
        Ok(())
    }

    /// Resolve the profile for this command
    pub fn profile(&self, profile_name: Option<&str>) -> CliResult<(String, &Profile)> {
        let (name, profile) = self.config.resolve_profile(profile_name)?;
        trace!("Resolved profile '{}' (explicit: {:?})", name, profile_name);
        Ok((name, profile))
    }

    /// Create a quota client from profile credentials
    pub fn quota_client(&self, profile_name: Option<&str>) -> CliResult<QuotaClient> {
        let (name, profile) = self.profile(profile_name)?;
        info!(
            "Using profile '{}' (management group {})",
            name, profile.management_group_id
        );

        let token = profile.resolve_access_token(&name)?;
        let arm = ArmClient::new(&profile.endpoint, profile.api_version.clone(), token)?;
        debug!(
            "Created ARM client for {} (api-version {})",
            profile.endpoint, profile.api_version
        );
        Ok(QuotaClient::new(arm, profile.management_group_id.clone()))
    }

    /// Build a poller from the profile's polling table and flag overrides
    pub fn poller(
        &self,
        profile_name: Option<&str>,
        poll_interval: Option<u64>,
        deadline: Option<u64>,
    ) -> CliResult<Poller> {
        let (_, profile) = self.profile(profile_name)?;
        let settings = profile
            .polling
            .clone()
            .with_overrides(poll_interval, deadline)
            .to_settings()?;
        debug!(
            "Poll settings: interval {:?}, deadline {:?}",
            settings.interval, settings.deadline
        );
        Ok(Poller::new(settings).with_cancellation(self.cancel.clone()))
    }

    /// Subscription from the flag, falling back to the profile
    pub fn subscription_id(
        &self,
        profile_name: Option<&str>,
        explicit: Option<&str>,
    ) -> CliResult<String> {
        if let Some(id) = explicit {
            return Ok(id.to_string());
        }
        let (name, profile) = self.profile(profile_name)?;
        Ok(profile.require_subscription(&name)?.to_string())
    }

    /// Quota target from the flags, falling back to the profile defaults
    pub fn target(&self, profile_name: Option<&str>, args: &TargetArgs) -> CliResult<QuotaTarget> {
        let (_, profile) = self.profile(profile_name)?;
        Ok(QuotaTarget::new(
            args.provider.as_deref().unwrap_or(&profile.provider),
            args.resource.as_deref().unwrap_or(&profile.resource_name),
            args.region.as_deref().unwrap_or(&profile.location),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn manager() -> ConnectionManager {
        let mut profile = Profile::new("mg-1");
        profile.subscription_id = Some("sub-default".to_string());
        profile.location = "eastus".to_string();
        profile.polling.deadline_secs = 300;

        let mut config = Config::default();
        config.set_profile("corp".to_string(), profile);
        ConnectionManager::with_config_path(config, None)
    }

    #[test]
    fn test_target_prefers_flags_over_profile() {
        let mgr = manager();
        let args = TargetArgs {
            resource: Some("standardDSv3Family".to_string()),
            ..TargetArgs::default()
        };
        let target = mgr.target(None, &args).unwrap();

        assert_eq!(target.provider, "Microsoft.Compute");
        assert_eq!(target.resource_name, "standardDSv3Family");
        assert_eq!(target.region, "eastus");
    }

    #[test]
    fn test_subscription_fallback() {
        let mgr = manager();
        assert_eq!(mgr.subscription_id(None, None).unwrap(), "sub-default");
        assert_eq!(
            mgr.subscription_id(None, Some("sub-flag")).unwrap(),
            "sub-flag"
        );
    }

    #[test]
    fn test_poller_applies_overrides() {
        let mgr = manager();
        let poller = mgr.poller(Some("corp"), Some(5), None).unwrap();

        assert_eq!(poller.settings().interval, Duration::from_secs(5));
        assert_eq!(poller.settings().deadline, Duration::from_secs(300));
    }

    #[test]
    fn test_poller_shares_cancellation() {
        let cancel = CancellationToken::new();
        let mgr = manager().with_cancellation(cancel.clone());
        let poller = mgr.poller(None, None, None).unwrap();

        cancel.cancel();
        assert!(poller.cancellation().is_cancelled());
    }
}
