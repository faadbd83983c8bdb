//! Clap derive structures for the `nftui` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::net::Ipv4Addr;

use clap::{Args, Parser, Subcommand, ValueEnum};

use nftui_core::Protocol;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nftui -- manage nft-ui bandwidth quotas and port forwarding
#[derive(Debug, Parser)]
#[command(
    name = "nftui",
    version,
    about = "Manage nft-ui bandwidth quotas and port forwarding from the command line",
    long_about = "A CLI for administering an nft-ui service.\n\n\
        Lists and edits per-port bandwidth quotas, the allowed-port set,\n\
        and DNAT port-forwarding rules, or watches quota usage live.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "NFTUI_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Service URL (overrides profile)
    #[arg(long, short = 's', env = "NFTUI_SERVER", global = true)]
    pub server: Option<String>,

    /// Username for HTTP basic auth (password from NFTUI_PASSWORD or keyring)
    #[arg(long, short = 'u', env = "NFTUI_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NFTUI_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "NFTUI_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "NFTUI_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage per-port bandwidth quotas
    #[command(alias = "q")]
    Quotas(QuotasArgs),

    /// Manage the allowed-port set
    #[command(alias = "p")]
    Ports(PortsArgs),

    /// Manage DNAT port-forwarding rules
    #[command(alias = "fwd")]
    Forwarding(ForwardingArgs),

    /// Continuously display quota usage until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  QUOTAS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct QuotasArgs {
    #[command(subcommand)]
    pub command: QuotasCommand,
}

#[derive(Debug, Subcommand)]
pub enum QuotasCommand {
    /// List quotas, exceeded first then by usage
    #[command(alias = "ls")]
    List,

    /// Reset a quota's usage counter to zero
    Reset {
        /// Quota ID
        id: String,
    },

    /// Reset several quotas in one batch
    ResetAll {
        /// Quota IDs
        #[arg(required_unless_present = "exceeded")]
        ids: Vec<String>,

        /// Select every exceeded quota
        #[arg(long, conflicts_with = "ids")]
        exceeded: bool,
    },

    /// Change a quota's limit
    Set {
        /// Quota ID
        id: String,

        /// New limit (bytes, or a size like 10GiB)
        #[arg(value_parser = parse_bytes)]
        bytes: u64,
    },

    /// Create a quota for a port
    Add {
        /// Port number
        port: u16,

        /// Limit (bytes, or a size like 500MB)
        #[arg(value_parser = parse_bytes)]
        bytes: u64,

        /// Free-form comment
        #[arg(long, short = 'c', default_value = "")]
        comment: String,
    },

    /// Delete a quota
    #[command(alias = "rm")]
    Delete {
        /// Quota ID
        id: String,
    },
}

/// Accept plain byte counts or human sizes (`10GiB`, `500 MB`).
fn parse_bytes(raw: &str) -> Result<u64, String> {
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(n);
    }
    raw.parse::<bytesize::ByteSize>()
        .map(|b| b.as_u64())
        .map_err(|e| format!("invalid size '{raw}': {e}"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PORTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PortsArgs {
    #[command(subcommand)]
    pub command: PortsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PortsCommand {
    /// List allowed ports
    #[command(alias = "ls")]
    List,

    /// Allow a port
    Add {
        /// Port number
        port: u16,
    },

    /// Remove an allowed port
    #[command(alias = "rm")]
    Delete {
        /// Port number
        port: u16,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FORWARDING
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ForwardingArgs {
    #[command(subcommand)]
    pub command: ForwardingCommand,
}

#[derive(Debug, Subcommand)]
pub enum ForwardingCommand {
    /// List forwarding rules, enabled first then by source port
    #[command(alias = "ls")]
    List,

    /// Create a forwarding rule
    Add {
        /// Port on this host
        src_port: u16,

        /// Destination IPv4 address
        dst_ip: Ipv4Addr,

        /// Destination port
        dst_port: u16,

        #[command(flatten)]
        opts: RuleOpts,
    },

    /// Change a forwarding rule (unset options keep their current value)
    Edit {
        /// Rule ID
        id: String,

        /// Destination IPv4 address
        #[arg(long)]
        dst_ip: Option<Ipv4Addr>,

        /// Destination port
        #[arg(long)]
        dst_port: Option<u16>,

        /// Transport protocol
        #[arg(long, value_parser = parse_protocol)]
        protocol: Option<Protocol>,

        /// Free-form comment
        #[arg(long, short = 'c')]
        comment: Option<String>,

        /// Rate limit in Mbit/s (0 = unlimited)
        #[arg(long)]
        limit_mbps: Option<u32>,
    },

    /// Delete a forwarding rule
    #[command(alias = "rm")]
    Delete {
        /// Rule ID
        id: String,
    },

    /// Enable a forwarding rule
    Enable {
        /// Rule ID
        id: String,
    },

    /// Disable a forwarding rule
    Disable {
        /// Rule ID
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct RuleOpts {
    /// Transport protocol
    #[arg(long, default_value = "tcp", value_parser = parse_protocol)]
    pub protocol: Protocol,

    /// Free-form comment
    #[arg(long, short = 'c', default_value = "")]
    pub comment: String,

    /// Rate limit in Mbit/s (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub limit_mbps: u32,
}

fn parse_protocol(raw: &str) -> Result<Protocol, String> {
    raw.parse::<Protocol>()
        .map_err(|_| format!("expected tcp, udp or both, got '{raw}'"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only refresh quotas, not forwarding rules
    #[arg(long)]
    pub quotas_only: bool,

    /// Refresh interval in seconds, used while the service reports none
    #[arg(long)]
    pub interval: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
