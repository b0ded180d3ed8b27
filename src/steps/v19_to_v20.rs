//! Migration v19 → v20: all-day tasks carry no time zone.
//!
//! Every task row is visited. Rows whose `is_allday` decodes to
//! [`AllDayFlag::Yes`] get `tz` set to NULL; every other row is left exactly
//! as stored, whatever its `tz`.

use crate::core::error::StoreError;
use crate::core::schemas::{TASKS, tasks};
use crate::core::store::{Predicate, Session};
use crate::core::task::AllDayFlag;
use rusqlite::types::Value;

pub(crate) fn apply(session: &mut dyn Session) -> Result<(), StoreError> {
    let rows = session.select_rows(TASKS, &Predicate::All)?;
    let mut cleared = 0usize;
    for row in &rows {
        if !AllDayFlag::from_stored(row.get(tasks::IS_ALLDAY)).is_all_day() {
            continue;
        }
        if matches!(row.get(tasks::TZ), Value::Null) {
            continue;
        }
        session.update_column(TASKS, row.id, tasks::TZ, Value::Null)?;
        cleared += 1;
    }
    tracing::debug!(rows = rows.len(), cleared, "normalized all-day time zones");
    Ok(())
}
