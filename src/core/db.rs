use crate::core::error::StoreError;
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Open a task database with the pragmas every session expects.
pub fn db_connect(db_path: &Path, busy_timeout_secs: u64) -> Result<Connection, StoreError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;
    configure(&conn, busy_timeout_secs)?;
    Ok(conn)
}

/// Open an existing database read-only.
///
/// Nothing is created and no pragma that persists in the file (such as the
/// journal mode) is touched.
pub fn db_connect_existing(db_path: &Path, busy_timeout_secs: u64) -> Result<Connection, StoreError> {
    if !db_path.exists() {
        return Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("database not found: {}", db_path.display()),
        )));
    }
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(Duration::from_secs(busy_timeout_secs))?;
    Ok(conn)
}

pub(crate) fn configure(conn: &Connection, busy_timeout_secs: u64) -> Result<(), StoreError> {
    conn.busy_timeout(Duration::from_secs(busy_timeout_secs))?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(())
}
