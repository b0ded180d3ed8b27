//! Append-only JSONL log of upgrade attempts.
//!
//! One line per call to the coordinator, whether it migrated, found the store
//! current, or failed.

use crate::core::error::StoreError;
use crate::core::time::EventStamp;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeStatus {
    Noop,
    Success,
    Error,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MigrationEvent {
    #[serde(flatten)]
    pub stamp: EventStamp,
    pub db_id: String,
    pub from_version: u32,
    pub to_version: u32,
    pub status: UpgradeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MigrationEvent {
    pub fn new(db_path: &Path, from_version: u32, to_version: u32, status: UpgradeStatus) -> Self {
        Self {
            stamp: EventStamp::now(),
            db_id: db_id(db_path),
            from_version,
            to_version,
            status,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

fn db_id(db_path: &Path) -> String {
    db_path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

pub struct MigrationAudit {
    path: PathBuf,
}

impl MigrationAudit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, event: &MigrationEvent) -> Result<(), StoreError> {
        // Appends from concurrent opens in one process stay whole lines.
        static AUDIT_LOCK: Mutex<()> = Mutex::new(());
        let _lock = AUDIT_LOCK
            .lock()
            .map_err(|_| StoreError::Audit("audit lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(event).map_err(|e| StoreError::Audit(e.to_string()))?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    /// Every event recorded so far, oldest first. A missing log is empty.
    pub fn read_all(&self) -> Result<Vec<MigrationEvent>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(|e| StoreError::Audit(e.to_string())))
            .collect()
    }
}
