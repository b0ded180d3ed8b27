//! CLI struct definitions for the `taskdb` command-line interface.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "taskdb",
    version = env!("CARGO_PKG_VERSION"),
    about = "Create, inspect and upgrade a local task database."
)]
pub(crate) struct Cli {
    /// Configuration file (defaults to ./taskdb.toml when present).
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Database file; overrides `[database] path` from the config.
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,
    /// Output format.
    #[clap(long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create the database if needed and bring it to the target version
    Init,
    /// Show the current version and pending upgrade steps (read-only)
    Status,
    /// Upgrade the database
    Upgrade {
        /// Target version (defaults to the configured target, else latest).
        #[clap(long)]
        to: Option<u32>,
    },
    /// List the built-in upgrade steps
    Steps,
}
