//! SQLite-backed [`VersionedStore`].
//!
//! The schema version lives in `PRAGMA user_version`, which is part of the
//! database header and therefore commits or rolls back with the enclosing
//! transaction. A session is one `BEGIN EXCLUSIVE` transaction.

use crate::core::db;
use crate::core::error::StoreError;
use crate::core::schemas;
use crate::core::store::{
    ColumnSpec, IndexSpec, Predicate, RowView, Session, TableSpec, VersionedStore, quote_ident,
    validate_ident,
};
use rusqlite::types::Value;
use rusqlite::{Connection, Transaction, TransactionBehavior, params, params_from_iter};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path`.
    pub fn open(path: &Path, busy_timeout_secs: u64) -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::db_connect(path, busy_timeout_secs)?,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an existing database file read-only; never creates one.
    ///
    /// Reads work as usual. Opening a session on the returned store fails.
    pub fn open_read_only(path: &Path, busy_timeout_secs: u64) -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::db_connect_existing(path, busy_timeout_secs)?,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        db::configure(&conn, 1)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the first-ever schema on a store at version 0 and stamp
    /// [`schemas::BASE_VERSION`]. Returns `false` when the store was already
    /// initialized.
    pub fn initialize(&mut self) -> Result<bool, StoreError> {
        let mut session = self.begin_exclusive_session()?;
        if session.version()? != 0 {
            return Ok(false);
        }
        for table in schemas::base_schema() {
            session.create_table(&table)?;
        }
        session.set_version(schemas::BASE_VERSION)?;
        session.commit()?;
        tracing::info!(
            path = ?self.path,
            version = schemas::BASE_VERSION,
            "initialized task store"
        );
        Ok(true)
    }
}

fn read_user_version(conn: &Connection) -> Result<u32, StoreError> {
    let raw: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    u32::try_from(raw)
        .map_err(|_| StoreError::ConstraintViolation(format!("invalid schema version {raw}")))
}

impl VersionedStore for SqliteStore {
    type Session<'s> = SqliteSession<'s>;

    fn current_version(&self) -> Result<u32, StoreError> {
        read_user_version(&self.conn)
    }

    fn begin_exclusive_session(&mut self) -> Result<SqliteSession<'_>, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)?;
        Ok(SqliteSession { tx })
    }
}

/// One exclusive transaction. Dropping it without `commit` rolls back.
pub struct SqliteSession<'conn> {
    tx: Transaction<'conn>,
}

impl SqliteSession<'_> {
    fn require_table(&mut self, table: &str) -> Result<(), StoreError> {
        if self.has_table(table)? {
            Ok(())
        } else {
            Err(StoreError::UnknownTable(table.to_string()))
        }
    }

    fn require_column(&mut self, table: &str, column: &str) -> Result<(), StoreError> {
        self.require_table(table)?;
        if self.has_column(table, column)? {
            Ok(())
        } else {
            Err(StoreError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
    }
}

impl Session for SqliteSession<'_> {
    fn version(&mut self) -> Result<u32, StoreError> {
        read_user_version(&self.tx)
    }

    fn has_table(&mut self, table: &str) -> Result<bool, StoreError> {
        validate_ident(table)?;
        let count: i64 = self.tx.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn has_column(&mut self, table: &str, column: &str) -> Result<bool, StoreError> {
        validate_ident(table)?;
        validate_ident(column)?;
        let count: i64 = self.tx.query_row(
            "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
            params![table, column],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn create_table(&mut self, spec: &TableSpec) -> Result<(), StoreError> {
        self.tx.execute(&spec.to_sql()?, [])?;
        Ok(())
    }

    fn add_column(&mut self, table: &str, column: &ColumnSpec) -> Result<(), StoreError> {
        self.require_table(table)?;
        if self.has_column(table, column.name)? {
            return Err(StoreError::DuplicateColumn {
                table: table.to_string(),
                column: column.name.to_string(),
            });
        }
        check_addable(table, column)?;
        let sql = format!("ALTER TABLE {} ADD COLUMN {}", quote_ident(table)?, column.to_sql()?);
        self.tx.execute(&sql, [])?;
        Ok(())
    }

    fn create_index(&mut self, spec: &IndexSpec) -> Result<(), StoreError> {
        for column in &spec.columns {
            self.require_column(spec.table, column)?;
        }
        self.tx.execute(&spec.to_sql()?, [])?;
        Ok(())
    }

    fn select_rows(
        &mut self,
        table: &str,
        predicate: &Predicate,
    ) -> Result<Vec<RowView>, StoreError> {
        self.require_table(table)?;
        let mut bound = Vec::new();
        let where_sql = predicate.to_sql(&mut bound)?;
        let sql = format!(
            "SELECT * FROM {} WHERE {} ORDER BY {}",
            quote_ident(table)?,
            where_sql,
            quote_ident(schemas::ROW_ID)?
        );
        let mut stmt = self.tx.prepare(&sql)?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mapped = stmt.query_map(params_from_iter(bound.iter()), |row| {
            let mut values = BTreeMap::new();
            for (idx, name) in names.iter().enumerate() {
                values.insert(name.clone(), row.get::<_, Value>(idx)?);
            }
            Ok(values)
        })?;

        let mut rows = Vec::new();
        for values in mapped {
            let values = values?;
            let id = match values.get(schemas::ROW_ID) {
                Some(Value::Integer(id)) => *id,
                other => {
                    return Err(StoreError::ConstraintViolation(format!(
                        "row in {table} has non-integer {}: {other:?}",
                        schemas::ROW_ID
                    )));
                }
            };
            rows.push(RowView { id, values });
        }
        Ok(rows)
    }

    fn update_column(
        &mut self,
        table: &str,
        row_id: i64,
        column: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.require_column(table, column)?;
        let sql = format!(
            "UPDATE {} SET {} = ?1 WHERE {} = ?2",
            quote_ident(table)?,
            quote_ident(column)?,
            quote_ident(schemas::ROW_ID)?
        );
        let changed = self.tx.execute(&sql, params![value, row_id])?;
        if changed == 0 {
            return Err(StoreError::UnknownRow {
                table: table.to_string(),
                id: row_id,
            });
        }
        Ok(())
    }

    fn insert_row(&mut self, table: &str, values: &[(&str, Value)]) -> Result<i64, StoreError> {
        self.require_table(table)?;
        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table)?)
        } else {
            let mut columns = Vec::with_capacity(values.len());
            let mut slots = Vec::with_capacity(values.len());
            for (idx, (column, _)) in values.iter().enumerate() {
                columns.push(quote_ident(column)?);
                slots.push(format!("?{}", idx + 1));
            }
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table)?,
                columns.join(", "),
                slots.join(", ")
            )
        };
        self.tx
            .execute(&sql, params_from_iter(values.iter().map(|(_, v)| v)))?;
        Ok(self.tx.last_insert_rowid())
    }

    fn set_version(&mut self, version: u32) -> Result<(), StoreError> {
        self.tx
            .execute_batch(&format!("PRAGMA user_version = {version};"))?;
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }
}

/// Columns added to existing tables cannot be keys and need a default when
/// they are required.
pub(crate) fn check_addable(table: &str, column: &ColumnSpec) -> Result<(), StoreError> {
    if column.primary_key {
        return Err(StoreError::ConstraintViolation(format!(
            "cannot add primary key column {} to {table}",
            column.name
        )));
    }
    if column.not_null && column.default.is_none() {
        return Err(StoreError::ConstraintViolation(format!(
            "cannot add NOT NULL column {} to {table} without a default",
            column.name
        )));
    }
    Ok(())
}
