//! Version tracking and ordered, atomic schema migration.
//!
//! A store is stamped with an integer schema version. Upgrading means
//! applying the registered [`UpgradeStep`]s whose version ranges tile
//! `[current, target)`, in ascending order, inside one exclusive session,
//! then stamping `target` in that same session.
//!
//! - **Forward only**: a target below the current version is rejected.
//! - **Planned first**: a gap in the registry is reported before any session
//!   is opened, so the store is never touched.
//! - **All or nothing**: if any step fails the session is dropped, which
//!   discards the effects of every step applied in the same call, and the
//!   version stays where it was.
//! - **Idempotent steps**: re-applying a step whose postcondition already
//!   holds is a successful no-op, so retrying a failed upgrade is always safe.

use crate::core::error::{MigrationError, StoreError};
use crate::core::store::{Session, VersionedStore};
use crate::steps;
use std::fmt;
use std::sync::OnceLock;

/// Transformation applied by a step.
pub type ApplyFn = fn(&mut dyn Session) -> Result<(), StoreError>;

/// One registered transformation from `from_version` to `to_version`.
///
/// Steps own no state; they are data in the registry.
#[derive(Clone, Copy)]
pub struct UpgradeStep {
    pub from_version: u32,
    pub to_version: u32,
    /// Human-readable description for logging
    pub description: &'static str,
    pub apply: ApplyFn,
}

impl UpgradeStep {
    pub const fn new(
        from_version: u32,
        to_version: u32,
        description: &'static str,
        apply: ApplyFn,
    ) -> Self {
        Self {
            from_version,
            to_version,
            description,
            apply,
        }
    }

    pub fn run(&self, session: &mut dyn Session) -> Result<(), StoreError> {
        (self.apply)(session)
    }
}

impl fmt::Debug for UpgradeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeStep")
            .field("from_version", &self.from_version)
            .field("to_version", &self.to_version)
            .field("description", &self.description)
            .finish()
    }
}

/// Ordered, validated set of upgrade steps.
///
/// Sorted by `from_version`; no two steps cover the same version.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    steps: Vec<UpgradeStep>,
}

impl StepRegistry {
    pub fn new(mut steps: Vec<UpgradeStep>) -> Result<Self, MigrationError> {
        if let Some(bad) = steps.iter().find(|s| s.to_version <= s.from_version) {
            return Err(MigrationError::InvalidStepRange {
                from: bad.from_version,
                to: bad.to_version,
            });
        }
        steps.sort_by_key(|s| s.from_version);
        // Sorted ranges overlap anywhere only if some adjacent pair overlaps.
        if let Some(pair) = steps
            .windows(2)
            .find(|pair| pair[1].from_version < pair[0].to_version)
        {
            return Err(MigrationError::ConflictingUpgradeSteps(pair[1].from_version));
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[UpgradeStep] {
        &self.steps
    }

    /// The step starting exactly at `version`, if any.
    pub fn step_from(&self, version: u32) -> Option<&UpgradeStep> {
        self.steps
            .binary_search_by_key(&version, |s| s.from_version)
            .ok()
            .map(|idx| &self.steps[idx])
    }

    /// Highest version reachable through the registry.
    pub fn latest_version(&self) -> Option<u32> {
        self.steps.last().map(|s| s.to_version)
    }

    /// Steps that exactly tile `[from, to)`, in application order.
    ///
    /// Fails with `MissingUpgradePath(v)` at the first version `v` where no
    /// step starts, or where the only step starting there overshoots `to`.
    pub fn plan(&self, from: u32, to: u32) -> Result<Vec<&UpgradeStep>, MigrationError> {
        let mut plan = Vec::new();
        let mut cursor = from;
        while cursor < to {
            let step = self
                .step_from(cursor)
                .filter(|s| s.to_version <= to)
                .ok_or(MigrationError::MissingUpgradePath(cursor))?;
            plan.push(step);
            cursor = step.to_version;
        }
        Ok(plan)
    }
}

/// The built-in registry, validated once per process.
pub fn builtin_registry() -> Result<&'static StepRegistry, MigrationError> {
    static REGISTRY: OnceLock<StepRegistry> = OnceLock::new();
    if let Some(registry) = REGISTRY.get() {
        return Ok(registry);
    }
    let built = StepRegistry::new(steps::all_steps())?;
    Ok(REGISTRY.get_or_init(|| built))
}

/// Applies registry steps to a store.
#[derive(Debug, Clone, Copy)]
pub struct MigrationEngine<'r> {
    registry: &'r StepRegistry,
}

impl<'r> MigrationEngine<'r> {
    pub fn new(registry: &'r StepRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r StepRegistry {
        self.registry
    }

    /// Steps an upgrade from `current` to `target` would apply. Empty when
    /// the store is already current.
    pub fn pending_steps(
        &self,
        current: u32,
        target: u32,
    ) -> Result<Vec<&'r UpgradeStep>, MigrationError> {
        if current > target {
            return Err(MigrationError::DowngradeNotSupported { current, target });
        }
        self.registry.plan(current, target)
    }

    /// Bring `store` to `to_version`.
    ///
    /// The store is unchanged when this returns an error.
    pub fn upgrade<S: VersionedStore>(
        &self,
        store: &mut S,
        to_version: u32,
    ) -> Result<(), MigrationError> {
        let from = store.current_version()?;
        if from == to_version {
            tracing::debug!(version = from, "store already current");
            return Ok(());
        }

        let plan = self.pending_steps(from, to_version)?;
        tracing::info!(
            from,
            to = to_version,
            steps = plan.len(),
            "upgrading task store"
        );

        let mut session = store.begin_exclusive_session()?;
        for step in &plan {
            tracing::info!(
                from = step.from_version,
                to = step.to_version,
                description = step.description,
                "applying upgrade step"
            );
            if let Err(cause) = step.run(&mut session) {
                tracing::warn!(
                    from = step.from_version,
                    to = step.to_version,
                    error = %cause,
                    "upgrade step failed; discarding session"
                );
                drop(session);
                return Err(MigrationError::StepFailed {
                    from: step.from_version,
                    to: step.to_version,
                    description: step.description,
                    cause,
                });
            }
        }
        session.set_version(to_version)?;
        session.commit()?;

        tracing::info!(version = to_version, "task store upgrade complete");
        Ok(())
    }
}

/// Upgrade `store` to `to_version` using the built-in registry.
pub fn upgrade<S: VersionedStore>(store: &mut S, to_version: u32) -> Result<(), MigrationError> {
    MigrationEngine::new(builtin_registry()?).upgrade(store, to_version)
}
