//! Migration v3 → v6: task hierarchy, alarm flag and sorting key columns.

use crate::core::error::StoreError;
use crate::core::schemas::{TASKS, tasks};
use crate::core::store::{ColumnSpec, Session};

use super::ensure_column;

pub(crate) fn apply(session: &mut dyn Session) -> Result<(), StoreError> {
    for column in [
        ColumnSpec::integer(tasks::PARENT_ID),
        ColumnSpec::integer(tasks::HAS_ALARMS),
        ColumnSpec::text(tasks::SORTING),
    ] {
        ensure_column(session, TASKS, &column)?;
    }
    Ok(())
}
