//! Profile management command implementations

use crate::cli::{OutputFormat, ProfileCommands};
use crate::commands::wait::EXIT_SUCCESS;
use crate::connection::ConnectionManager;
use crate::error::{QuotaCtlError, Result as CliResult};
use crate::output::{self, print_output};
use comfy_table::Table;
use quotactl_core::{Config, CredentialStore, Profile};
use serde_json::json;
use tracing::{debug, info, trace};

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &mut ConnectionManager,
    output_format: OutputFormat,
) -> CliResult<i32> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format)?,
        Path => handle_path(conn_mgr, output_format)?,
        Show { name } => handle_show(conn_mgr, name.as_deref(), output_format)?,
        Set {
            name,
            management_group_id,
            subscription_id,
            access_token,
            #[cfg(feature = "secure-storage")]
            use_keyring,
            endpoint,
            api_version,
            location,
            provider,
            resource,
            poll_interval,
            deadline,
            default,
        } => {
            #[cfg(not(feature = "secure-storage"))]
            let use_keyring = &false;

            let update = ProfileUpdate {
                management_group_id: management_group_id.as_deref(),
                subscription_id: subscription_id.as_deref(),
                access_token: access_token.as_deref(),
                use_keyring: *use_keyring,
                endpoint: endpoint.as_deref(),
                api_version: api_version.as_deref(),
                location: location.as_deref(),
                provider: provider.as_deref(),
                resource: resource.as_deref(),
                poll_interval: *poll_interval,
                deadline: *deadline,
            };
            handle_set(conn_mgr, name, update, *default)?
        }
        Remove { name } => handle_remove(conn_mgr, name)?,
    }
    Ok(EXIT_SUCCESS)
}

fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    debug!("Listing all configured profiles");
    let profiles = conn_mgr.config.list_profiles();
    trace!("Found {} profiles", profiles.len());
    let default = conn_mgr.config.resolve_profile_name(None).ok();

    match output::OutputFormat::from(output_format) {
        output::OutputFormat::Table => {
            if profiles.is_empty() {
                println!("No profiles configured.");
                println!("Use 'quotactl profile set' to create a profile.");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_header(vec!["", "Name", "Management group", "Subscription", "Location"]);
            for (name, profile) in &profiles {
                let marker = if default.as_deref() == Some(name.as_str()) {
                    "*"
                } else {
                    ""
                };
                table.add_row(vec![
                    marker.to_string(),
                    name.to_string(),
                    profile.management_group_id.clone(),
                    profile.subscription_id.clone().unwrap_or_default(),
                    profile.location.clone(),
                ]);
            }
            println!("{}", table);
        }
        format => {
            let list: Vec<_> = profiles
                .iter()
                .map(|(name, profile)| {
                    json!({
                        "name": name,
                        "is_default": default.as_deref() == Some(name.as_str()),
                        "management_group_id": profile.management_group_id,
                        "subscription_id": profile.subscription_id,
                        "location": profile.location,
                    })
                })
                .collect();
            print_output(json!({ "profiles": list }), format)?;
        }
    }
    Ok(())
}

fn config_path(conn_mgr: &ConnectionManager) -> CliResult<std::path::PathBuf> {
    match &conn_mgr.config_path {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::config_path()?),
    }
}

fn handle_path(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let path = config_path(conn_mgr)?;

    match output::OutputFormat::from(output_format) {
        output::OutputFormat::Table => println!("{}", path.display()),
        format => print_output(json!({ "config_path": path.to_string_lossy() }), format)?,
    }
    Ok(())
}

/// Shown instead of the stored token
fn token_summary(profile: &Profile) -> &'static str {
    match profile.access_token.as_deref() {
        Some(t) if CredentialStore::is_keyring_reference(t) => "keyring",
        Some(_) => "plaintext",
        None => "not set (QUOTACTL_ACCESS_TOKEN)",
    }
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (name, profile) = conn_mgr.profile(name)?;
    let default = conn_mgr.config.resolve_profile_name(None).ok();
    let is_default = default.as_deref() == Some(name.as_str());

    let data = json!({
        "name": name,
        "is_default": is_default,
        "endpoint": profile.endpoint,
        "api_version": profile.api_version,
        "management_group_id": profile.management_group_id,
        "subscription_id": profile.subscription_id,
        "access_token": token_summary(profile),
        "location": profile.location,
        "provider": profile.provider,
        "resource_name": profile.resource_name,
        "poll_interval_secs": profile.polling.interval_secs,
        "deadline_secs": profile.polling.deadline_secs,
    });

    print_output(data, output::OutputFormat::from(output_format))?;
    Ok(())
}

/// Fields `profile set` may change; `None` keeps the current value
struct ProfileUpdate<'a> {
    management_group_id: Option<&'a str>,
    subscription_id: Option<&'a str>,
    access_token: Option<&'a str>,
    use_keyring: bool,
    endpoint: Option<&'a str>,
    api_version: Option<&'a str>,
    location: Option<&'a str>,
    provider: Option<&'a str>,
    resource: Option<&'a str>,
    poll_interval: Option<u64>,
    deadline: Option<u64>,
}

fn handle_set(
    conn_mgr: &mut ConnectionManager,
    name: &str,
    update: ProfileUpdate<'_>,
    make_default: bool,
) -> CliResult<()> {
    debug!("Setting profile: {}", name);

    let mut profile = match conn_mgr.config.profiles.get(name) {
        Some(existing) => existing.clone(),
        None => {
            let mg = update.management_group_id.ok_or_else(|| QuotaCtlError::InvalidInput {
                message: format!(
                    "--management-group-id is required when creating profile '{}'",
                    name
                ),
            })?;
            Profile::new(mg)
        }
    };

    if let Some(mg) = update.management_group_id {
        profile.management_group_id = mg.to_string();
    }
    if let Some(sub) = update.subscription_id {
        profile.subscription_id = Some(sub.to_string());
    }
    if let Some(token) = update.access_token {
        profile.access_token = Some(store_token(name, token, update.use_keyring)?);
    }
    if let Some(endpoint) = update.endpoint {
        profile.endpoint = endpoint.to_string();
    }
    if let Some(api_version) = update.api_version {
        profile.api_version = api_version.to_string();
    }
    if let Some(location) = update.location {
        profile.location = location.to_string();
    }
    if let Some(provider) = update.provider {
        profile.provider = provider.to_string();
    }
    if let Some(resource) = update.resource {
        profile.resource_name = resource.to_string();
    }
    profile.polling = profile
        .polling
        .clone()
        .with_overrides(update.poll_interval, update.deadline);

    let first = conn_mgr.config.profiles.is_empty();
    conn_mgr.config.set_profile(name.to_string(), profile);
    if make_default || first {
        conn_mgr.config.default_profile = Some(name.to_string());
    }
    conn_mgr.save_config()?;

    info!("Saved profile '{}'", name);
    println!("Profile '{}' saved successfully.", name);
    if make_default || first {
        println!("'{}' is now the default profile.", name);
    }
    Ok(())
}

#[cfg(feature = "secure-storage")]
fn store_token(profile_name: &str, token: &str, use_keyring: bool) -> CliResult<String> {
    if use_keyring {
        let entry = format!("{}-access-token", profile_name);
        return Ok(CredentialStore::new().store(&entry, token)?);
    }
    Ok(token.to_string())
}

#[cfg(not(feature = "secure-storage"))]
fn store_token(_profile_name: &str, token: &str, _use_keyring: bool) -> CliResult<String> {
    Ok(token.to_string())
}

fn handle_remove(conn_mgr: &mut ConnectionManager, name: &str) -> CliResult<()> {
    debug!("Removing profile: {}", name);

    let was_default = conn_mgr.config.default_profile.as_deref() == Some(name);
    if conn_mgr.config.remove_profile(name).is_none() {
        return Err(QuotaCtlError::ProfileNotFound {
            name: name.to_string(),
        });
    }
    conn_mgr.save_config()?;

    println!("Profile '{}' removed successfully.", name);
    if was_default {
        println!("Default profile cleared.");
    }
    Ok(())
}
