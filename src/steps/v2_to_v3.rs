//! Migration v2 → v3: sortable copies of instance start and due.

use crate::core::error::StoreError;
use crate::core::schemas::{INSTANCES, instances};
use crate::core::store::{ColumnSpec, Predicate, Session};

use super::{ensure_column, set_if_changed};

pub(crate) fn apply(session: &mut dyn Session) -> Result<(), StoreError> {
    ensure_column(
        session,
        INSTANCES,
        &ColumnSpec::integer(instances::INSTANCE_START_SORTING),
    )?;
    ensure_column(
        session,
        INSTANCES,
        &ColumnSpec::integer(instances::INSTANCE_DUE_SORTING),
    )?;

    for row in session.select_rows(INSTANCES, &Predicate::All)? {
        let start = row.get(instances::INSTANCE_START).clone();
        let due = row.get(instances::INSTANCE_DUE).clone();
        set_if_changed(session, INSTANCES, &row, instances::INSTANCE_START_SORTING, start)?;
        set_if_changed(session, INSTANCES, &row, instances::INSTANCE_DUE_SORTING, due)?;
    }
    Ok(())
}
