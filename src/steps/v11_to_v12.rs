//! Migration v11 → v12: local lists move to the namespaced account type.

use crate::core::error::StoreError;
use crate::core::schemas::{LISTS, lists};
use crate::core::store::{Predicate, Session};
use rusqlite::types::Value;

pub(crate) fn apply(session: &mut dyn Session) -> Result<(), StoreError> {
    let legacy = Predicate::eq(
        lists::ACCOUNT_TYPE,
        lists::LEGACY_LOCAL_ACCOUNT_TYPE.to_string(),
    );
    for row in session.select_rows(LISTS, &legacy)? {
        session.update_column(
            LISTS,
            row.id,
            lists::ACCOUNT_TYPE,
            Value::Text(lists::LOCAL_ACCOUNT_TYPE.to_string()),
        )?;
    }
    Ok(())
}
