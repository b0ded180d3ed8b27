//! Opening the task database: create, upgrade, audit.

use crate::core::audit::{MigrationAudit, MigrationEvent, UpgradeStatus};
use crate::core::config::TaskDbConfig;
use crate::core::error::{MigrationError, StoreError};
use crate::core::migration::{MigrationEngine, UpgradeStep, builtin_registry};
use crate::core::schemas;
use crate::core::sqlite::SqliteStore;
use crate::core::store::VersionedStore;
use std::path::{Path, PathBuf};

/// Callbacks fired by [`TaskDatabase::open`]. Both default to no-ops.
pub trait DatabaseListener {
    /// A new store was initialized at `version`.
    fn on_created(&self, _version: u32) {}

    /// A migration moved the store from `from` to `to`.
    fn on_upgraded(&self, _from: u32, _to: u32) {}
}

/// An open, current task database.
pub struct TaskDatabase {
    store: SqliteStore,
    path: PathBuf,
    version: u32,
}

impl TaskDatabase {
    /// Open the configured database, creating and upgrading it as needed.
    ///
    /// Runs the migration engine exactly once. When an audit log is
    /// configured, the attempt is recorded there whatever its outcome; a
    /// failure to write the log is logged and does not change the result.
    pub fn open(
        config: &TaskDbConfig,
        listener: Option<&dyn DatabaseListener>,
    ) -> Result<Self, MigrationError> {
        let path = config.database.path.clone();
        let mut store = SqliteStore::open(&path, config.database.busy_timeout_secs)?;

        if store.initialize()? {
            if let Some(l) = listener {
                l.on_created(schemas::BASE_VERSION);
            }
        }

        let from = store.current_version()?;
        let target = config.target_version();
        let result = builtin_registry()
            .and_then(|registry| MigrationEngine::new(registry).upgrade(&mut store, target));

        if let Some(audit_path) = &config.migration.audit_log {
            let event = match &result {
                Ok(()) if from == target => {
                    MigrationEvent::new(&path, from, target, UpgradeStatus::Noop)
                }
                Ok(()) => MigrationEvent::new(&path, from, target, UpgradeStatus::Success),
                Err(e) => {
                    MigrationEvent::new(&path, from, target, UpgradeStatus::Error).with_error(e)
                }
            };
            // The audit trail never overrides the migration outcome.
            if let Err(audit_err) = MigrationAudit::new(audit_path).record(&event) {
                tracing::warn!(
                    audit_log = %audit_path.display(),
                    error = %audit_err,
                    "failed to record migration audit event"
                );
            }
        }

        if let Err(e) = result {
            tracing::error!(
                path = %path.display(),
                from,
                to = target,
                error = %e,
                "task database upgrade failed"
            );
            return Err(e);
        }
        if from != target {
            if let Some(l) = listener {
                l.on_upgraded(from, target);
            }
        }

        Ok(Self {
            store,
            path,
            version: target,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&mut self) -> &mut SqliteStore {
        &mut self.store
    }

    pub fn into_store(self) -> SqliteStore {
        self.store
    }
}

/// Read-only view of where a database stands relative to the built-in chain.
#[derive(Debug, Clone)]
pub struct DatabaseStatus {
    pub path: PathBuf,
    pub current_version: u32,
    pub target_version: u32,
    pub latest_version: u32,
    pub pending: Vec<UpgradeStep>,
}

impl DatabaseStatus {
    pub fn is_current(&self) -> bool {
        self.current_version == self.target_version
    }
}

/// Inspect an existing database without writing to it.
///
/// The file is opened read-only. A file that was never initialized (schema
/// version 0) is reported as [`StoreError::Uninitialized`].
pub fn inspect(config: &TaskDbConfig) -> Result<DatabaseStatus, MigrationError> {
    let path = config.database.path.clone();
    let store = SqliteStore::open_read_only(&path, config.database.busy_timeout_secs)?;
    let current_version = store.current_version()?;
    if current_version == 0 {
        return Err(StoreError::Uninitialized(path.display().to_string()).into());
    }
    let target_version = config.target_version();
    let registry = builtin_registry()?;
    let pending = MigrationEngine::new(registry)
        .pending_steps(current_version, target_version)?
        .into_iter()
        .copied()
        .collect();
    Ok(DatabaseStatus {
        path,
        current_version,
        target_version,
        latest_version: registry.latest_version().unwrap_or(schemas::BASE_VERSION),
        pending,
    })
}
