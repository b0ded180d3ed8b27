//! Migration v8 → v11: task uid, pinned flag and has-properties flag.

use crate::core::error::StoreError;
use crate::core::schemas::{TASKS, tasks};
use crate::core::store::{ColumnSpec, Session};

use super::ensure_column;

pub(crate) fn apply(session: &mut dyn Session) -> Result<(), StoreError> {
    for column in [
        ColumnSpec::text(tasks::UID),
        ColumnSpec::integer(tasks::PINNED),
        ColumnSpec::integer(tasks::HAS_PROPERTIES),
    ] {
        ensure_column(session, TASKS, &column)?;
    }
    Ok(())
}
