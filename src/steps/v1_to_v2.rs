//! Migration v1 → v2: derive `is_new` and `is_closed` from task status.

use crate::core::error::StoreError;
use crate::core::schemas::{TASKS, tasks};
use crate::core::store::{ColumnSpec, Predicate, Session};
use rusqlite::types::Value;

use super::{ensure_column, set_if_changed};

pub(crate) fn apply(session: &mut dyn Session) -> Result<(), StoreError> {
    ensure_column(session, TASKS, &ColumnSpec::integer(tasks::IS_NEW))?;
    ensure_column(session, TASKS, &ColumnSpec::integer(tasks::IS_CLOSED))?;

    for row in session.select_rows(TASKS, &Predicate::is_not_null(tasks::STATUS))? {
        // non-numeric status carries no information to derive from
        let Some(status) = row.get_i64(tasks::STATUS) else {
            continue;
        };
        let is_new = i64::from(status == tasks::STATUS_NEEDS_ACTION);
        let is_closed = i64::from(status > tasks::STATUS_IN_PROCESS);
        set_if_changed(session, TASKS, &row, tasks::IS_NEW, Value::Integer(is_new))?;
        set_if_changed(session, TASKS, &row, tasks::IS_CLOSED, Value::Integer(is_closed))?;
    }
    Ok(())
}
