//! Migration v14 → v19: instance ordering support.
//!
//! Indexes on the sorting columns, the original instance time used to match
//! overrides, and the distance of each instance from the current one.

use crate::core::error::StoreError;
use crate::core::schemas::{INSTANCES, instances};
use crate::core::store::{ColumnSpec, IndexSpec, Session};

use super::ensure_column;

pub(crate) fn apply(session: &mut dyn Session) -> Result<(), StoreError> {
    session.create_index(&IndexSpec::new(
        INSTANCES,
        &[instances::INSTANCE_START_SORTING],
        false,
    ))?;
    session.create_index(&IndexSpec::new(
        INSTANCES,
        &[instances::INSTANCE_DUE_SORTING],
        false,
    ))?;

    ensure_column(
        session,
        INSTANCES,
        &ColumnSpec::integer(instances::INSTANCE_ORIGINAL_TIME).with_default(0i64),
    )?;
    session.create_index(&IndexSpec::new(
        INSTANCES,
        &[instances::INSTANCE_ORIGINAL_TIME],
        false,
    ))?;

    ensure_column(
        session,
        INSTANCES,
        &ColumnSpec::integer(instances::DISTANCE_FROM_CURRENT).with_default(0i64),
    )?;
    Ok(())
}
