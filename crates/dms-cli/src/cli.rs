//! Clap derive structures for the `dms` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// dms -- inspect and operate a management system through its gateway
#[derive(Debug, Parser)]
#[command(
    name = "dms",
    version,
    about = "Manage agents, elements and views of a DMS from the command line",
    long_about = "Command-line access to a management system through its \
        message gateway.\n\n\
        Lists and inspects agents, elements, views, services and protocols, \
        changes element state and edits element descriptions.",
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
    /// Profile to use
    #[arg(long, short = 'p', env = "DMS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Gateway URL (overrides profile)
    #[arg(long, short = 'u', env = "DMS_URL", global = true)]
    pub url: Option<String>,

    /// Username for basic auth (overrides profile)
    #[arg(long, env = "DMS_USERNAME", global = true)]
    pub username: Option<String>,

    /// Password for basic auth
    #[arg(long, env = "DMS_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DMS_OUTPUT",
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

    /// Confirm destructive operations
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "DMS_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "DMS_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
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

#[derive(Debug, Clone, ValueEnum)]
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
    /// List and inspect agents
    #[command(alias = "dma")]
    Agents(AgentsArgs),

    /// Inspect and operate elements
    #[command(alias = "el", alias = "e")]
    Elements(ElementsArgs),

    /// Browse and manage the view tree
    #[command(alias = "v")]
    Views(ViewsArgs),

    /// Inspect services
    #[command(alias = "svc")]
    Services(ServicesArgs),

    /// List and inspect protocols
    Protocols(ProtocolsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Agents ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AgentsArgs {
    #[command(subcommand)]
    pub command: AgentsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AgentsCommand {
    /// List every agent of the system
    #[command(alias = "ls")]
    List,

    /// Show one agent, including its build version
    Show {
        /// Agent id
        id: i32,
    },
}

// ── Elements ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ElementsArgs {
    #[command(subcommand)]
    pub command: ElementsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ElementsCommand {
    /// List elements
    #[command(alias = "ls")]
    List {
        /// Only elements hosted by this agent
        #[arg(long, short = 'a')]
        agent: Option<i32>,
    },

    /// Show one element
    Show {
        /// Element id ("agent/element") or name
        element: String,
    },

    /// Start an element
    Start {
        /// Element id ("agent/element") or name
        element: String,
    },

    /// Stop an element
    Stop {
        /// Element id ("agent/element") or name
        element: String,
    },

    /// Pause an element
    Pause {
        /// Element id ("agent/element") or name
        element: String,
    },

    /// Restart an element
    Restart {
        /// Element id ("agent/element") or name
        element: String,
    },

    /// Delete an element (requires --yes)
    Delete {
        /// Element id ("agent/element") or name
        element: String,
    },

    /// Change the description of an element
    SetDescription {
        /// Element id ("agent/element") or name
        element: String,

        /// New description
        description: String,
    },

    /// Read a standalone parameter or a table cell
    Param {
        /// Element id ("agent/element") or name
        element: String,

        /// Parameter id (column parameter id for table cells)
        parameter: i32,

        /// Row key, for table cells
        #[arg(long, short = 'k')]
        key: Option<String>,
    },
}

// ── Views ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ViewsArgs {
    #[command(subcommand)]
    pub command: ViewsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ViewsCommand {
    /// List every view
    #[command(alias = "ls")]
    List,

    /// Show one view with its children and elements
    Show {
        /// View id
        #[arg(allow_negative_numbers = true)]
        id: i32,
    },

    /// Create a view
    Create {
        /// View name
        name: String,

        /// Parent view id (defaults to the root view)
        #[arg(long, default_value = "-1", allow_negative_numbers = true)]
        parent: i32,
    },

    /// Rename a view
    Rename {
        /// View id
        #[arg(allow_negative_numbers = true)]
        id: i32,

        /// New name
        name: String,
    },

    /// Delete a view (requires --yes)
    Delete {
        /// View id
        id: i32,
    },
}

// ── Services ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServicesArgs {
    #[command(subcommand)]
    pub command: ServicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServicesCommand {
    /// List services
    #[command(alias = "ls")]
    List {
        /// Only services hosted by this agent
        #[arg(long, short = 'a')]
        agent: Option<i32>,
    },

    /// Show one service with its inclusions
    Show {
        /// Service id ("agent/service")
        id: String,
    },
}

// ── Protocols ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProtocolsArgs {
    #[command(subcommand)]
    pub command: ProtocolsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProtocolsCommand {
    /// List every installed protocol version
    #[command(alias = "ls")]
    List,

    /// Show one protocol version with its connections
    Show {
        /// Protocol name
        name: String,

        /// Protocol version ("Production" for the production version)
        #[arg(default_value = "Production")]
        version: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or replace a profile
    Init {
        /// Gateway URL
        #[arg(long)]
        url: String,

        /// Username for basic auth
        #[arg(long)]
        username: Option<String>,

        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,
    },

    /// Display the resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a password in the system keyring (read from stdin)
    SetPassword {
        /// Profile name (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
