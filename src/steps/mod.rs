//! Built-in upgrade steps.
//!
//! Each step lives in its own `vN_to_vM` module and is registered in
//! [`all_steps`]. Steps must be idempotent: guard structural changes with
//! existence checks and derive data rewrites from the current row state, so a
//! re-run over an already-upgraded store changes nothing.
//!
//! # Adding a step
//!
//! 1. Create `vN_to_vM.rs` with `pub(crate) fn apply(session: &mut dyn Session)`.
//! 2. Register it below.
//! 3. Bump `schemas::LATEST_VERSION` to `M` if it extends the chain.

mod v11_to_v12;
mod v12_to_v14;
mod v14_to_v19;
mod v19_to_v20;
mod v1_to_v2;
mod v20_to_v22;
mod v2_to_v3;
mod v3_to_v6;
mod v6_to_v8;
mod v8_to_v11;

use crate::core::error::StoreError;
use crate::core::migration::UpgradeStep;
use crate::core::store::{ColumnSpec, RowView, Session};
use rusqlite::types::Value;

/// Registry of all built-in steps, in version order.
pub fn all_steps() -> Vec<UpgradeStep> {
    vec![
        UpgradeStep::new(1, 2, "Add is_new/is_closed task flags", v1_to_v2::apply),
        UpgradeStep::new(2, 3, "Add instance sorting columns", v2_to_v3::apply),
        UpgradeStep::new(3, 6, "Add task hierarchy and alarm columns", v3_to_v6::apply),
        UpgradeStep::new(6, 8, "Replace priority 0 by NULL", v6_to_v8::apply),
        UpgradeStep::new(8, 11, "Add task uid, pinned and properties columns", v8_to_v11::apply),
        UpgradeStep::new(11, 12, "Rename the local account type", v11_to_v12::apply),
        UpgradeStep::new(12, 14, "Add sync state table", v12_to_v14::apply),
        UpgradeStep::new(14, 19, "Add instance ordering columns and indexes", v14_to_v19::apply),
        UpgradeStep::new(19, 20, "Clear time zones of all-day tasks", v19_to_v20::apply),
        UpgradeStep::new(20, 22, "Add task version column", v20_to_v22::apply),
    ]
}

/// Add `column` to `table` unless it is already there. Returns whether it was added.
pub(crate) fn ensure_column(
    session: &mut dyn Session,
    table: &str,
    column: &ColumnSpec,
) -> Result<bool, StoreError> {
    if session.has_column(table, column.name)? {
        return Ok(false);
    }
    session.add_column(table, column)?;
    Ok(true)
}

/// Write `value` into `row.column` only when it differs from what is stored.
pub(crate) fn set_if_changed(
    session: &mut dyn Session,
    table: &str,
    row: &RowView,
    column: &str,
    value: Value,
) -> Result<bool, StoreError> {
    if row.get(column) == &value {
        return Ok(false);
    }
    session.update_column(table, row.id, column, value)?;
    Ok(true)
}
