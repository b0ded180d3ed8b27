//! `taskdb.toml` configuration.
//!
//! ```toml
//! [database]
//! path = "tasks.db"
//! busy_timeout_secs = 5
//!
//! [migration]
//! target_version = 22
//! audit_log = "migrations.events.jsonl"
//! ```
//!
//! A missing file means defaults; unknown keys are rejected.

use crate::core::error::StoreError;
use crate::core::schemas;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "taskdb.toml";

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDbConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// Version to upgrade to on open; latest when absent.
    #[serde(default)]
    pub target_version: Option<u32>,
    /// JSONL file receiving one event per upgrade attempt.
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(schemas::TASKS_DB_NAME)
}

fn default_busy_timeout_secs() -> u64 {
    5
}

impl TaskDbConfig {
    pub fn parse(content: &str) -> Result<Self, StoreError> {
        toml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Relative paths in a config file are relative to that file.
    fn resolve_relative_to(&mut self, base: &Path) {
        if self.database.path.is_relative() {
            self.database.path = base.join(&self.database.path);
        }
        if let Some(audit) = self.migration.audit_log.as_mut() {
            if audit.is_relative() {
                *audit = base.join(&*audit);
            }
        }
    }

    pub fn target_version(&self) -> u32 {
        self.migration
            .target_version
            .unwrap_or(schemas::LATEST_VERSION)
    }
}
