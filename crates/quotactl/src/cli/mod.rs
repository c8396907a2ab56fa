//! CLI structure and command definitions
//!
//! Resource commands (`group`, `subscription`, `limit`, `allocation`) submit
//! a request and, unless `--no-wait` is given, track it to a terminal state.
//! `operation` re-checks or resumes requests submitted earlier.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Azure group quota CLI with long-running request tracking
#[derive(Parser, Debug)]
#[command(name = "quotactl")]
#[command(version, about = "Azure group quota management CLI")]
#[command(long_about = "
Azure group quota management CLI

Manages Microsoft.Quota group quotas under a management group and tracks
long-running requests until they succeed, fail, are escalated for manual
approval, or run past the wait deadline.

EXAMPLES:
    # Set up a profile
    quotactl profile set corp --management-group-id MG --subscription-id SUB --access-token TOKEN

    # Create a group quota and wait for it
    quotactl group create my-group

    # Request a higher limit, waiting up to 10 minutes
    quotactl limit request my-group --limit 64 --region westus2 --deadline 600

    # Resume tracking a request that timed out
    quotactl operation wait limit my-group <operation-id>

For more help on a specific command, run:
    quotactl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "QUOTACTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "QUOTACTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Automatically choose format based on command and context
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Human-readable table format
    Table,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Group quota operations
    #[command(subcommand, visible_alias = "grp")]
    Group(GroupCommands),

    /// Group quota subscription membership
    #[command(subcommand, visible_alias = "sub")]
    Subscription(SubscriptionCommands),

    /// Group quota limit requests
    #[command(subcommand)]
    Limit(LimitCommands),

    /// Subscription allocation requests
    #[command(subcommand, visible_alias = "alloc")]
    Allocation(AllocationCommands),

    /// Inspect or resume requests submitted earlier
    #[command(subcommand, visible_alias = "op")]
    Operation(OperationCommands),

    /// Run the full create/add/request/cleanup sequence against one group
    Smoke(SmokeArgs),

    /// Profile management
    #[command(subcommand, visible_alias = "prof")]
    Profile(ProfileCommands),
}

/// How long-running commands wait
#[derive(Args, Debug, Clone, Default)]
pub struct WaitArgs {
    /// Seconds between status checks (profile default: 30)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: Option<u64>,

    /// Seconds to wait for a terminal state (profile default: 120)
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Submit and print the operation handle without waiting
    #[arg(long, conflicts_with_all = ["poll_interval", "deadline"])]
    pub no_wait: bool,
}

/// Quota a limit or allocation command targets
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Resource provider namespace (profile default: Microsoft.Compute)
    #[arg(long)]
    pub provider: Option<String>,

    /// Quota resource name (profile default: cores)
    #[arg(long)]
    pub resource: Option<String>,

    /// Azure region (profile default: westus2)
    #[arg(long)]
    pub region: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommands {
    /// Create or update a group quota
    Create {
        /// Group quota name
        name: String,
        /// Display name (defaults to the group name)
        #[arg(long)]
        display_name: Option<String>,
        /// Billing ID to group the quota under
        #[arg(long)]
        billing_id: Option<String>,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Show a group quota
    Get {
        /// Group quota name
        name: String,
    },
    /// Delete a group quota
    Delete {
        /// Group quota name
        name: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum SubscriptionCommands {
    /// Add a subscription to a group quota
    Add {
        /// Group quota name
        group: String,
        /// Subscription ID (profile default when omitted)
        #[arg(long)]
        subscription_id: Option<String>,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Remove a subscription from a group quota
    Remove {
        /// Group quota name
        group: String,
        /// Subscription ID (profile default when omitted)
        #[arg(long)]
        subscription_id: Option<String>,
        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum LimitCommands {
    /// Request a new group quota limit
    Request {
        /// Group quota name
        group: String,
        /// Requested limit
        #[arg(long)]
        limit: i64,
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Show the current group quota limit for a region
    Get {
        /// Group quota name
        group: String,
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum AllocationCommands {
    /// Request quota for a subscription out of a group quota
    Request {
        /// Group quota name
        group: String,
        /// Requested allocation
        #[arg(long)]
        limit: i64,
        /// Subscription ID (profile default when omitted)
        #[arg(long)]
        subscription_id: Option<String>,
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Show a subscription's allocation for a region
    Get {
        /// Group quota name
        group: String,
        /// Subscription ID (profile default when omitted)
        #[arg(long)]
        subscription_id: Option<String>,
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Which request resource an operation ID belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RequestType {
    /// Group quota limit request
    Limit,
    /// Subscription allocation request
    Allocation,
}

#[derive(Subcommand, Debug)]
pub enum OperationCommands {
    /// Read a request's current state once
    Status {
        #[arg(value_enum)]
        kind: RequestType,
        /// Group quota name
        group: String,
        /// Operation ID printed by the submitting command
        operation_id: String,
        /// Subscription ID for allocation requests (profile default when omitted)
        #[arg(long)]
        subscription_id: Option<String>,
    },
    /// Poll a request until it is terminal or the deadline passes
    Wait {
        #[arg(value_enum)]
        kind: RequestType,
        /// Group quota name
        group: String,
        /// Operation ID printed by the submitting command
        operation_id: String,
        /// Subscription ID for allocation requests (profile default when omitted)
        #[arg(long)]
        subscription_id: Option<String>,
        #[command(flatten)]
        target: TargetArgs,
        /// Seconds between status checks (profile default: 30)
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        poll_interval: Option<u64>,
        /// Seconds to wait for a terminal state (profile default: 120)
        #[arg(long, value_name = "SECS")]
        deadline: Option<u64>,
    },
}

#[derive(Args, Debug)]
pub struct SmokeArgs {
    /// Group quota name (defaults to a timestamped name)
    #[arg(long)]
    pub group: Option<String>,

    /// Limit to request for the group
    #[arg(long, default_value = "64")]
    pub limit: i64,

    /// Allocation to request for the subscription
    #[arg(long, default_value = "10")]
    pub allocation: i64,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Seconds between status checks (profile default: 30)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: Option<u64>,

    /// Seconds to wait for each step (profile default: 120)
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Leave the group in place after the run
    #[arg(long)]
    pub keep: bool,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all profiles
    #[command(visible_alias = "ls")]
    List,

    /// Show the path to the configuration file
    Path,

    /// Show profile details
    #[command(visible_alias = "get")]
    Show {
        /// Profile name (resolved default when omitted)
        name: Option<String>,
    },

    /// Create or update a profile
    #[command(visible_alias = "add")]
    Set {
        /// Profile name
        name: String,
        /// Management group that owns the group quotas
        #[arg(long)]
        management_group_id: Option<String>,
        /// Default subscription for subscription and allocation commands
        #[arg(long)]
        subscription_id: Option<String>,
        /// Bearer token, or `keyring:<entry>`
        #[arg(long)]
        access_token: Option<String>,
        /// Store the access token in the OS keyring
        #[cfg(feature = "secure-storage")]
        #[arg(long, requires = "access_token")]
        use_keyring: bool,
        /// Resource Manager endpoint
        #[arg(long)]
        endpoint: Option<String>,
        /// Microsoft.Quota API version
        #[arg(long)]
        api_version: Option<String>,
        /// Default region
        #[arg(long)]
        location: Option<String>,
        /// Default resource provider
        #[arg(long)]
        provider: Option<String>,
        /// Default quota resource name
        #[arg(long)]
        resource: Option<String>,
        /// Default seconds between status checks
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        poll_interval: Option<u64>,
        /// Default wait deadline in seconds
        #[arg(long)]
        deadline: Option<u64>,
        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// Remove a profile
    #[command(visible_alias = "rm")]
    Remove {
        /// Profile name
        name: String,
    },
}
