//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, render, validate), and their associated argument
//! structs. Flags used inside the operator pod have environment variable
//! equivalents.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "studio-operator",
    version,
    about = "Operator for the FINOS Legend Studio workload",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        studio-operator validate options.yaml                   Check options\n  \
        studio-operator render -c options.yaml -s state.json    Preview the Studio config\n  \
        studio-operator run --container-root ./rootfs < events  Dispatch events locally"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch host events (newline-delimited JSON) to the operator
    Run(Box<RunArgs>),

    /// Print the Studio configuration documents for given options and state
    Render(RenderArgs),

    /// Validate an options file
    Validate(ValidateArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        studio-operator run --state-file /var/lib/studio/state.json      Pebble in the pod\n  \
        studio-operator run --container-root ./rootfs --events ev.jsonl  Local container root")]
pub struct RunArgs {
    /// Options file (.yaml, .json)
    #[arg(short, long, env = "OPTIONS_FILE")]
    pub config: Option<PathBuf>,

    /// Read events from this file instead of stdin
    #[arg(short, long, env = "EVENTS_FILE")]
    pub events: Option<PathBuf>,

    /// Durable relation data cache (kept in memory when omitted)
    #[arg(short, long, env = "STATE_FILE")]
    pub state_file: Option<PathBuf>,

    // -- Workload --
    /// Pebble socket of the workload container
    #[arg(long, env = "PEBBLE_SOCKET", help_heading = "Workload")]
    pub pebble_socket: Option<PathBuf>,

    /// Use a local directory as the container root instead of Pebble
    #[arg(
        long,
        env = "CONTAINER_ROOT",
        conflicts_with = "pebble_socket",
        help_heading = "Workload"
    )]
    pub container_root: Option<PathBuf>,

    // -- Unit --
    /// Application name (ingress service name, fallback address)
    #[arg(
        long,
        env = "APP_NAME",
        default_value = "legend-studio",
        help_heading = "Unit"
    )]
    pub app_name: String,

    /// Address peers reach this unit on
    #[arg(long, env = "UNIT_ADDRESS", help_heading = "Unit")]
    pub unit_address: Option<String>,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Observability --
    /// Sentry DSN (enables error tracking)
    #[cfg(feature = "sentry-integration")]
    #[arg(long, env = "SENTRY_DSN", help_heading = "Observability")]
    pub sentry_dsn: Option<String>,

    /// Sentry environment tag
    #[cfg(feature = "sentry-integration")]
    #[arg(long, env = "SENTRY_ENVIRONMENT", help_heading = "Observability")]
    pub sentry_environment: Option<String>,
}

#[derive(Args)]
pub struct RenderArgs {
    /// Options file (.yaml, .json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// State file written by `run`
    #[arg(short, long)]
    pub state_file: PathBuf,

    /// Which document to print
    #[arg(short, long, default_value = "both")]
    pub document: DocumentKind,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Options file to validate
    #[arg(default_value = "options.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DocumentKind {
    Http,
    Ui,
    Both,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
