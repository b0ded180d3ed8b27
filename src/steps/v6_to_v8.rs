//! Migration v6 → v8: priority 0 means "undefined" and is stored as NULL so
//! undefined priorities sort last.

use crate::core::error::StoreError;
use crate::core::schemas::{TASKS, tasks};
use crate::core::store::{Predicate, Session};
use rusqlite::types::Value;

pub(crate) fn apply(session: &mut dyn Session) -> Result<(), StoreError> {
    let rows = session.select_rows(TASKS, &Predicate::eq(tasks::PRIORITY, 0i64))?;
    for row in &rows {
        session.update_column(TASKS, row.id, tasks::PRIORITY, Value::Null)?;
    }
    tracing::debug!(rows = rows.len(), "cleared zero priorities");
    Ok(())
}
