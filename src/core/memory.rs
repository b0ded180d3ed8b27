//! In-memory [`VersionedStore`] for tests and embedders without a file.
//!
//! A session works on a private copy of the whole store state; `commit`
//! swaps the copy in, dropping the session throws it away.
//!
//! Stored and compared values follow SQLite's column affinity so both stores
//! hold and select the same cells.

use crate::core::error::StoreError;
use crate::core::schemas;
use crate::core::sqlite::check_addable;
use crate::core::store::{
    ColumnSpec, ColumnType, IndexSpec, Predicate, RowView, Session, TableSpec, VersionedStore,
    validate_ident,
};
use rusqlite::types::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct MemTable {
    columns: Vec<ColumnSpec>,
    rows: BTreeMap<i64, BTreeMap<String, Value>>,
    next_id: i64,
}

impl MemTable {
    fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Default)]
struct MemState {
    version: u32,
    tables: BTreeMap<String, MemTable>,
    indexes: BTreeMap<String, IndexSpec>,
    row_writes: u64,
}

impl MemState {
    fn table(&self, name: &str) -> Result<&MemTable, StoreError> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemTable, StoreError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: MemState,
    sessions_opened: u64,
}

impl MemoryStore {
    /// Store initialized with the first-ever schema at [`schemas::BASE_VERSION`].
    pub fn new() -> Self {
        let mut state = MemState {
            version: schemas::BASE_VERSION,
            ..MemState::default()
        };
        for table in schemas::base_schema() {
            state.tables.insert(table.name.to_string(), new_table(&table));
        }
        Self {
            state,
            sessions_opened: 0,
        }
    }

    /// Unversioned store with no tables (version 0).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of exclusive sessions opened so far.
    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened
    }

    /// Committed row inserts and updates so far.
    pub fn row_writes(&self) -> u64 {
        self.state.row_writes
    }

    pub fn index_names(&self) -> Vec<String> {
        self.state.indexes.keys().cloned().collect()
    }
}

fn new_table(spec: &TableSpec) -> MemTable {
    MemTable {
        columns: spec.columns.clone(),
        rows: BTreeMap::new(),
        next_id: 1,
    }
}

impl VersionedStore for MemoryStore {
    type Session<'s> = MemorySession<'s>;

    fn current_version(&self) -> Result<u32, StoreError> {
        Ok(self.state.version)
    }

    fn begin_exclusive_session(&mut self) -> Result<MemorySession<'_>, StoreError> {
        self.sessions_opened += 1;
        let working = self.state.clone();
        Ok(MemorySession {
            store: self,
            working,
        })
    }
}

pub struct MemorySession<'s> {
    store: &'s mut MemoryStore,
    working: MemState,
}

impl Session for MemorySession<'_> {
    fn version(&mut self) -> Result<u32, StoreError> {
        Ok(self.working.version)
    }

    fn has_table(&mut self, table: &str) -> Result<bool, StoreError> {
        validate_ident(table)?;
        Ok(self.working.tables.contains_key(table))
    }

    fn has_column(&mut self, table: &str, column: &str) -> Result<bool, StoreError> {
        validate_ident(table)?;
        validate_ident(column)?;
        Ok(self
            .working
            .tables
            .get(table)
            .is_some_and(|t| t.column(column).is_some()))
    }

    fn create_table(&mut self, spec: &TableSpec) -> Result<(), StoreError> {
        validate_ident(spec.name)?;
        for column in &spec.columns {
            validate_ident(column.name)?;
        }
        self.working
            .tables
            .entry(spec.name.to_string())
            .or_insert_with(|| new_table(spec));
        Ok(())
    }

    fn add_column(&mut self, table: &str, column: &ColumnSpec) -> Result<(), StoreError> {
        validate_ident(column.name)?;
        let target = self.working.table_mut(table)?;
        if target.column(column.name).is_some() {
            return Err(StoreError::DuplicateColumn {
                table: table.to_string(),
                column: column.name.to_string(),
            });
        }
        check_addable(table, column)?;
        let fill = column.default.clone().unwrap_or(Value::Null);
        for row in target.rows.values_mut() {
            row.insert(column.name.to_string(), fill.clone());
        }
        target.columns.push(column.clone());
        Ok(())
    }

    fn create_index(&mut self, spec: &IndexSpec) -> Result<(), StoreError> {
        let target = self.working.table(spec.table)?;
        for column in &spec.columns {
            if target.column(column).is_none() {
                return Err(StoreError::UnknownColumn {
                    table: spec.table.to_string(),
                    column: column.to_string(),
                });
            }
        }
        let name = spec.name();
        validate_ident(&name)?;
        self.working.indexes.entry(name).or_insert_with(|| spec.clone());
        Ok(())
    }

    fn select_rows(
        &mut self,
        table: &str,
        predicate: &Predicate,
    ) -> Result<Vec<RowView>, StoreError> {
        let source = self.working.table(table)?;
        for column in predicate.columns() {
            validate_ident(column)?;
            if source.column(column).is_none() {
                return Err(StoreError::UnknownColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
        }
        let kind_of = |column: &str| -> Option<ColumnType> {
            source.column(column).map(|c| c.kind)
        };
        let predicate = predicate.with_affinity(&kind_of);
        Ok(source
            .rows
            .iter()
            .filter(|(_, values)| predicate.matches(values))
            .map(|(id, values)| RowView {
                id: *id,
                values: values.clone(),
            })
            .collect())
    }

    fn update_column(
        &mut self,
        table: &str,
        row_id: i64,
        column: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let target = self.working.table_mut(table)?;
        let spec = target.column(column).ok_or_else(|| StoreError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        })?;
        if spec.primary_key {
            return Err(StoreError::ConstraintViolation(format!(
                "primary key {column} of {table} is immutable"
            )));
        }
        let value = spec.kind.apply_affinity(value);
        if spec.not_null && matches!(value, Value::Null) {
            return Err(StoreError::ConstraintViolation(format!(
                "NOT NULL constraint failed: {table}.{column}"
            )));
        }
        let row = target
            .rows
            .get_mut(&row_id)
            .ok_or_else(|| StoreError::UnknownRow {
                table: table.to_string(),
                id: row_id,
            })?;
        row.insert(column.to_string(), value);
        self.working.row_writes += 1;
        Ok(())
    }

    fn insert_row(&mut self, table: &str, values: &[(&str, Value)]) -> Result<i64, StoreError> {
        let target = self.working.table_mut(table)?;
        let mut row = BTreeMap::new();
        for column in &target.columns {
            row.insert(
                column.name.to_string(),
                column.default.clone().unwrap_or(Value::Null),
            );
        }
        for (column, value) in values {
            let spec = target.column(column).ok_or_else(|| StoreError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })?;
            row.insert(column.to_string(), spec.kind.apply_affinity(value.clone()));
        }

        let pk = target.columns.iter().find(|c| c.primary_key).map(|c| c.name);
        let id = match pk.and_then(|name| row.get(name)) {
            Some(Value::Integer(explicit)) => *explicit,
            Some(Value::Null) | None => target.next_id,
            Some(other) => {
                return Err(StoreError::ConstraintViolation(format!(
                    "non-integer primary key in {table}: {other:?}"
                )));
            }
        };
        if target.rows.contains_key(&id) {
            return Err(StoreError::ConstraintViolation(format!(
                "UNIQUE constraint failed: {table} row {id}"
            )));
        }
        if let Some(name) = pk {
            row.insert(name.to_string(), Value::Integer(id));
        }
        for column in target.columns.iter().filter(|c| c.not_null) {
            if matches!(row.get(column.name), Some(Value::Null) | None) {
                return Err(StoreError::ConstraintViolation(format!(
                    "NOT NULL constraint failed: {table}.{}",
                    column.name
                )));
            }
        }

        target.next_id = target.next_id.max(id + 1);
        target.rows.insert(id, row);
        self.working.row_writes += 1;
        Ok(id)
    }

    fn set_version(&mut self, version: u32) -> Result<(), StoreError> {
        self.working.version = version;
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        let MemorySession { store, working } = self;
        store.state = working;
        Ok(())
    }
}
