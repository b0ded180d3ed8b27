//! Migration v12 → v14: sync state table, one row per account.

use crate::core::error::StoreError;
use crate::core::schemas::{self, SYNCSTATE, syncstate};
use crate::core::store::{IndexSpec, Session};

pub(crate) fn apply(session: &mut dyn Session) -> Result<(), StoreError> {
    session.create_table(&schemas::syncstate_table())?;
    session.create_index(&IndexSpec::new(
        SYNCSTATE,
        &[syncstate::ACCOUNT_NAME, syncstate::ACCOUNT_TYPE],
        true,
    ))?;
    Ok(())
}
