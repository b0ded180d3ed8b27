//! taskdb: versioned schema migration for a local task store
//!
//! A task store carries one integer schema version. When software expecting a
//! newer version opens an older store, the [`MigrationEngine`] applies the
//! registered upgrade steps covering `[current, target)` in ascending order,
//! inside a single exclusive session, and stamps the target version in that
//! same session.
//!
//! # Guarantees
//!
//! - **Forward-only**: asking for a lower version fails with
//!   `DowngradeNotSupported`; the store is untouched.
//! - **Complete paths**: a gap in the registry fails with
//!   `MissingUpgradePath(v)` before any session is opened.
//! - **Atomic**: a failing step aborts the session; no step effects and no
//!   version change survive.
//! - **Idempotent steps**: re-running a step over its own output is a no-op.
//!
//! # Architecture
//!
//! ## Stores
//!
//! - [`SqliteStore`](core::sqlite::SqliteStore): the on-disk store; version in
//!   `PRAGMA user_version`, sessions are `BEGIN EXCLUSIVE` transactions.
//! - [`MemoryStore`](core::memory::MemoryStore): copy-on-write tables for tests
//!   and embedders.
//!
//! ## Steps
//!
//! One module per transition under [`steps`], registered in
//! [`steps::all_steps`] and validated once into the built-in
//! [`StepRegistry`](core::migration::StepRegistry).
//!
//! ## Opening a database
//!
//! [`TaskDatabase::open`](core::database::TaskDatabase::open) creates the file
//! if needed, runs the engine once, notifies an optional listener and appends
//! an event to the JSONL audit log.
//!
//! # Examples
//!
//! ```bash
//! # Create and upgrade ./tasks.db to the latest version
//! taskdb init
//!
//! # What would an upgrade do?
//! taskdb --db ~/tasks.db status
//!
//! # Stop at a specific version
//! taskdb upgrade --to 20 --format json
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: store abstraction, stores, engine, config, audit
//! - [`steps`]: the built-in upgrade steps

mod cli;
pub mod core;
pub mod steps;

pub use crate::core::error::{MigrationError, StoreError};
pub use crate::core::migration::{MigrationEngine, upgrade};

use anyhow::{Context, bail};
use clap::Parser;
use cli::{Cli, Command, OutputFormat};
use crate::core::config::{CONFIG_FILE_NAME, TaskDbConfig};
use crate::core::database::{self, DatabaseListener, TaskDatabase};
use crate::core::migration::{UpgradeStep, builtin_registry};
use crate::core::time::CommandEnvelope;
use serde::Serialize;
use std::cell::Cell;
use std::path::PathBuf;

/// Records what an open did, for reporting.
#[derive(Default)]
struct OpenReport {
    created: Cell<bool>,
    upgraded_from: Cell<Option<u32>>,
}

impl DatabaseListener for OpenReport {
    fn on_created(&self, _version: u32) {
        self.created.set(true);
    }

    fn on_upgraded(&self, from: u32, _to: u32) {
        self.upgraded_from.set(Some(from));
    }
}

#[derive(Serialize)]
struct OpenBody {
    created: bool,
    from_version: Option<u32>,
    version: u32,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct StepSummary {
    from: u32,
    to: u32,
    description: &'static str,
}

impl From<&UpgradeStep> for StepSummary {
    fn from(step: &UpgradeStep) -> Self {
        Self {
            from: step.from_version,
            to: step.to_version,
            description: step.description,
        }
    }
}

#[derive(Serialize)]
struct StatusBody {
    current_version: u32,
    target_version: u32,
    latest_version: u32,
    pending: Vec<StepSummary>,
}

#[derive(Serialize)]
struct StepsBody {
    latest_version: Option<u32>,
    steps: Vec<StepSummary>,
}

fn load_config(cli: &Cli) -> anyhow::Result<TaskDbConfig> {
    let path = match &cli.config {
        Some(explicit) => {
            if !explicit.exists() {
                bail!("config file not found: {}", explicit.display());
            }
            explicit.clone()
        }
        None => PathBuf::from(CONFIG_FILE_NAME),
    };
    let mut config = TaskDbConfig::load(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    Ok(config)
}

fn open_and_report(config: &TaskDbConfig, cmd: &str, format: OutputFormat) -> anyhow::Result<()> {
    use colored::Colorize;

    let report = OpenReport::default();
    let opened = TaskDatabase::open(config, Some(&report));
    let db = match opened {
        Ok(db) => db,
        Err(e) => {
            if format == OutputFormat::Json {
                let env = CommandEnvelope::error(
                    cmd,
                    Some(config.database.path.as_path()),
                    ErrorBody {
                        error: e.to_string(),
                    },
                );
                println!("{}", env.to_json_pretty()?);
            }
            return Err(e)
                .with_context(|| format!("cannot open {}", config.database.path.display()));
        }
    };

    match format {
        OutputFormat::Json => {
            let env = CommandEnvelope::ok(
                cmd,
                Some(db.path()),
                OpenBody {
                    created: report.created.get(),
                    from_version: report.upgraded_from.get(),
                    version: db.version(),
                },
            );
            println!("{}", env.to_json_pretty()?);
        }
        OutputFormat::Text => {
            if report.created.get() {
                println!(
                    "{} Created {}",
                    "✓".bright_green(),
                    db.path().display().to_string().bright_cyan()
                );
            }
            match report.upgraded_from.get() {
                Some(from) => println!(
                    "{} Upgraded from version {} to {}",
                    "✓".bright_green(),
                    from.to_string().bright_yellow(),
                    db.version().to_string().bright_green()
                ),
                None => println!(
                    "{} Already at version {}",
                    "✓".bright_green(),
                    db.version().to_string().bright_green()
                ),
            }
        }
    }
    Ok(())
}

fn print_status(config: &TaskDbConfig, format: OutputFormat) -> anyhow::Result<()> {
    use colored::Colorize;

    let status = database::inspect(config)
        .with_context(|| format!("cannot inspect {}", config.database.path.display()))?;
    match format {
        OutputFormat::Json => {
            let env = CommandEnvelope::ok(
                "status",
                Some(status.path.as_path()),
                StatusBody {
                    current_version: status.current_version,
                    target_version: status.target_version,
                    latest_version: status.latest_version,
                    pending: status.pending.iter().map(StepSummary::from).collect(),
                },
            );
            println!("{}", env.to_json_pretty()?);
        }
        OutputFormat::Text => {
            println!("{} {}", "Database:".bold(), status.path.display());
            println!(
                "{} {} (latest {})",
                "Version:".bold(),
                status.current_version,
                status.latest_version
            );
            if status.is_current() {
                println!("{} Up to date", "✓".bright_green());
            } else {
                println!(
                    "{} {} pending step(s) to version {}:",
                    "▸".bright_cyan(),
                    status.pending.len(),
                    status.target_version
                );
                for step in &status.pending {
                    println!(
                        "  {:>2} → {:<2}  {}",
                        step.from_version, step.to_version, step.description
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_steps(format: OutputFormat) -> anyhow::Result<()> {
    let registry = builtin_registry()?;
    match format {
        OutputFormat::Json => {
            let env = CommandEnvelope::ok(
                "steps",
                None,
                StepsBody {
                    latest_version: registry.latest_version(),
                    steps: registry.steps().iter().map(StepSummary::from).collect(),
                },
            );
            println!("{}", env.to_json_pretty()?);
        }
        OutputFormat::Text => {
            for step in registry.steps() {
                println!(
                    "{:>2} → {:<2}  {}",
                    step.from_version, step.to_version, step.description
                );
            }
        }
    }
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Init => open_and_report(&config, "init", cli.format),
        Command::Status => print_status(&config, cli.format),
        Command::Upgrade { to } => {
            if to.is_some() {
                config.migration.target_version = to;
            }
            open_and_report(&config, "upgrade", cli.format)
        }
        Command::Steps => print_steps(cli.format),
    }
}
