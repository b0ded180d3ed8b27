//! Migration v20 → v22: per-task version counter.

use crate::core::error::StoreError;
use crate::core::schemas::{TASKS, tasks};
use crate::core::store::{ColumnSpec, Session};

use super::ensure_column;

pub(crate) fn apply(session: &mut dyn Session) -> Result<(), StoreError> {
    // the column may already exist; only add it when missing
    ensure_column(
        session,
        TASKS,
        &ColumnSpec::integer(tasks::VERSION).with_default(0i64),
    )?;
    Ok(())
}
