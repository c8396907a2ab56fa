use anyhow::Result;
use clap::Parser;
use quotactl_core::{CancellationToken, Config};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands};
use commands::wait::EXIT_FAILURE;
use connection::ConnectionManager;
use error::QuotaCtlError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    // Load configuration from specified path or default location
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        let config = Config::load_from_path(&path)?;
        (config, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };

    // Ctrl-C stops any wait in progress; the poller reports it as cancelled
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let mut conn_mgr =
        ConnectionManager::with_config_path(config, config_path).with_cancellation(cancel);

    let code = match execute_command(&cli, &mut conn_mgr).await {
        Ok(code) => code,
        Err(e) => {
            e.print_diagnostic();
            EXIT_FAILURE
        }
    };

    std::process::exit(code);
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "quotactl=warn,quotactl_core=warn",
            1 => "quotactl=info,quotactl_core=info",
            2 => "quotactl=debug,quotactl_core=debug",
            _ => "quotactl=trace,quotactl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(
    cli: &Cli,
    conn_mgr: &mut ConnectionManager,
) -> Result<i32, QuotaCtlError> {
    info!("Command: {}", format_command(&cli.command));

    let profile = cli.profile.as_deref();
    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Group(cmd) => {
            commands::group::handle_group_command(cmd, conn_mgr, profile, cli.output).await
        }
        Commands::Subscription(cmd) => {
            commands::subscription::handle_subscription_command(cmd, conn_mgr, profile, cli.output)
                .await
        }
        Commands::Limit(cmd) => {
            commands::limit::handle_limit_command(cmd, conn_mgr, profile, cli.output).await
        }
        Commands::Allocation(cmd) => {
            commands::allocation::handle_allocation_command(cmd, conn_mgr, profile, cli.output)
                .await
        }
        Commands::Operation(cmd) => {
            commands::operation::handle_operation_command(cmd, conn_mgr, profile, cli.output)
                .await
        }
        Commands::Smoke(args) => {
            commands::smoke::handle_smoke_command(args, conn_mgr, profile, cli.output).await
        }
        Commands::Profile(cmd) => {
            debug!("Executing profile command");
            commands::profile::handle_profile_command(cmd, conn_mgr, cli.output).await
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(code) => info!("Command completed with exit code {} in {:?}", code, duration),
        Err(e) => error!("Command failed after {:?}: {}", duration, e),
    }

    result
}

/// Format command for human-readable logging (without sensitive data)
fn format_command(command: &Commands) -> String {
    match command {
        Commands::Profile(cmd) => {
            use cli::ProfileCommands::*;
            match cmd {
                List => "profile list".to_string(),
                Path => "profile path".to_string(),
                Show { name } => format!("profile show {}", name.as_deref().unwrap_or("")),
                Set { name, .. } => format!("profile set {} [credentials redacted]", name),
                Remove { name } => format!("profile remove {}", name),
            }
        }
        Commands::Group(cmd) => format!("group {:?}", cmd),
        Commands::Subscription(cmd) => format!("subscription {:?}", cmd),
        Commands::Limit(cmd) => format!("limit {:?}", cmd),
        Commands::Allocation(cmd) => format!("allocation {:?}", cmd),
        Commands::Operation(cmd) => format!("operation {:?}", cmd),
        Commands::Smoke(args) => format!("smoke {:?}", args),
    }
}
