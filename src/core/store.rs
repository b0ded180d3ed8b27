//! Store abstraction the migration engine runs against.
//!
//! A store exposes one integer schema version and table-shaped rows. All
//! writes happen inside a [`Session`], which is exclusive for its lifetime and
//! atomic: either `commit` publishes every effect, or dropping the session
//! discards all of them.
//!
//! Two implementations ship with the crate:
//! - [`SqliteStore`](crate::core::sqlite::SqliteStore): the on-disk store, version kept in
//!   `PRAGMA user_version`.
//! - [`MemoryStore`](crate::core::memory::MemoryStore): an in-memory table store for tests
//!   and embedders without a database file.

use crate::core::error::StoreError;
use regex::Regex;
use rusqlite::types::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Persistent store carrying a schema version.
pub trait VersionedStore {
    type Session<'s>: Session
    where
        Self: 's;

    /// Version stamped by the last successful migration or by initialization.
    fn current_version(&self) -> Result<u32, StoreError>;

    /// Acquire sole write access. The returned session rolls back on drop
    /// unless [`Session::commit`] is called.
    fn begin_exclusive_session(&mut self) -> Result<Self::Session<'_>, StoreError>;
}

/// Exclusive, atomic unit of work against a store.
///
/// Object safe so upgrade steps can be plain `fn(&mut dyn Session)` values.
pub trait Session {
    /// Version as seen inside this session (reflects an uncommitted `set_version`).
    fn version(&mut self) -> Result<u32, StoreError>;

    fn has_table(&mut self, table: &str) -> Result<bool, StoreError>;

    fn has_column(&mut self, table: &str, column: &str) -> Result<bool, StoreError>;

    /// Create a table unless it already exists.
    fn create_table(&mut self, spec: &TableSpec) -> Result<(), StoreError>;

    /// Add a column to an existing table. Existing rows receive the column
    /// default (or NULL). Fails with `DuplicateColumn` if the column exists.
    fn add_column(&mut self, table: &str, column: &ColumnSpec) -> Result<(), StoreError>;

    /// Create an index unless one with the same name exists.
    fn create_index(&mut self, spec: &IndexSpec) -> Result<(), StoreError>;

    /// Rows matching `predicate`, ordered by primary key.
    fn select_rows(&mut self, table: &str, predicate: &Predicate)
    -> Result<Vec<RowView>, StoreError>;

    fn update_column(
        &mut self,
        table: &str,
        row_id: i64,
        column: &str,
        value: Value,
    ) -> Result<(), StoreError>;

    /// Insert a row and return its store-assigned id.
    fn insert_row(&mut self, table: &str, values: &[(&str, Value)]) -> Result<i64, StoreError>;

    fn set_version(&mut self, version: u32) -> Result<(), StoreError>;

    /// Publish every effect of this session.
    fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized;
}

/// Row filter understood by every store.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    All,
    Eq(String, Value),
    IsNull(String),
    IsNotNull(String),
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::Eq(column.to_string(), value.into())
    }

    pub fn is_null(column: &str) -> Self {
        Self::IsNull(column.to_string())
    }

    pub fn is_not_null(column: &str) -> Self {
        Self::IsNotNull(column.to_string())
    }

    /// Columns referenced anywhere in the predicate.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::All => Vec::new(),
            Self::Eq(column, _) | Self::IsNull(column) | Self::IsNotNull(column) => {
                vec![column.as_str()]
            }
            Self::And(parts) => parts.iter().flat_map(|p| p.columns()).collect(),
        }
    }

    /// Copy of the predicate with every compared value coerced to the
    /// affinity of its column, as SQLite does for `column = ?`. Columns
    /// `kind_of` does not know are left untouched.
    pub fn with_affinity(&self, kind_of: &dyn Fn(&str) -> Option<ColumnType>) -> Self {
        match self {
            Self::Eq(column, value) => match kind_of(column) {
                Some(kind) => Self::Eq(column.clone(), kind.apply_affinity(value.clone())),
                None => self.clone(),
            },
            Self::And(parts) => Self::And(parts.iter().map(|p| p.with_affinity(kind_of)).collect()),
            other => other.clone(),
        }
    }

    /// Evaluate against an in-memory row. Absent columns read as NULL.
    ///
    /// Values compare exactly; callers holding column types apply
    /// [`Predicate::with_affinity`] first.
    pub fn matches(&self, values: &BTreeMap<String, Value>) -> bool {
        let get = |column: &str| values.get(column).unwrap_or(&Value::Null);
        match self {
            Self::All => true,
            Self::Eq(column, expected) => {
                !matches!(expected, Value::Null) && get(column) == expected
            }
            Self::IsNull(column) => matches!(get(column), Value::Null),
            Self::IsNotNull(column) => !matches!(get(column), Value::Null),
            Self::And(parts) => parts.iter().all(|p| p.matches(values)),
        }
    }

    /// Render as a SQL `WHERE` expression, pushing bound values onto `params`.
    pub fn to_sql(&self, params: &mut Vec<Value>) -> Result<String, StoreError> {
        Ok(match self {
            Self::All => "1".to_string(),
            Self::Eq(column, value) => {
                params.push(value.clone());
                format!("{} = ?{}", quote_ident(column)?, params.len())
            }
            Self::IsNull(column) => format!("{} IS NULL", quote_ident(column)?),
            Self::IsNotNull(column) => format!("{} IS NOT NULL", quote_ident(column)?),
            Self::And(parts) if parts.is_empty() => "1".to_string(),
            Self::And(parts) => {
                let mut rendered = Vec::with_capacity(parts.len());
                for part in parts {
                    rendered.push(format!("({})", part.to_sql(params)?));
                }
                rendered.join(" AND ")
            }
        })
    }
}

/// Snapshot of one row as read inside a session.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: i64,
    pub values: BTreeMap<String, Value>,
}

impl RowView {
    /// Column value; columns the row does not carry read as NULL.
    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&Value::Null)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column) {
            Value::Integer(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_text(&self, column: &str) -> Option<&str> {
        match self.get(column) {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
        }
    }

    /// Coerce `value` the way SQLite does when storing it in, or comparing
    /// it against, a column of this type.
    ///
    /// INTEGER columns turn well-formed numeric text into an integer (or a
    /// real when it is not integral) and integral reals into integers. TEXT
    /// columns render numbers as text. Anything else is kept as given.
    pub fn apply_affinity(self, value: Value) -> Value {
        match (self, value) {
            (Self::Integer, Value::Text(text)) => match numeric_text(&text) {
                Some(number) => number,
                None => Value::Text(text),
            },
            (Self::Integer, Value::Real(v)) => integral(v).map_or(Value::Real(v), Value::Integer),
            (Self::Text, Value::Integer(v)) => Value::Text(v.to_string()),
            (_, other) => other,
        }
    }
}

fn numeric_text(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(Value::Integer(v));
    }
    let looks_numeric = trimmed.bytes().any(|b| b.is_ascii_digit())
        && trimmed
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !looks_numeric {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    Some(integral(v).map_or(Value::Real(v), Value::Integer))
}

fn integral(v: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict bound.
    (v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64)
        .then_some(v as i64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnType,
    pub primary_key: bool,
    pub not_null: bool,
    pub default: Option<Value>,
}

impl ColumnSpec {
    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnType::Integer,
            primary_key: false,
            not_null: false,
            default: None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnType::Text,
            primary_key: false,
            not_null: false,
            default: None,
        }
    }

    /// `INTEGER PRIMARY KEY AUTOINCREMENT` row id column.
    pub const fn row_id(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnType::Integer,
            primary_key: true,
            not_null: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn to_sql(&self) -> Result<String, StoreError> {
        let mut sql = format!("{} {}", quote_ident(self.name)?, self.kind.sql());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&sql_literal(default)?);
        }
        Ok(sql)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn primary_key(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.primary_key)
    }

    pub fn to_sql(&self) -> Result<String, StoreError> {
        let mut columns = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            columns.push(column.to_sql()?);
        }
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(self.name)?,
            columns.join(", ")
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub table: &'static str,
    pub columns: Vec<&'static str>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(table: &'static str, columns: &[&'static str], unique: bool) -> Self {
        Self {
            table,
            columns: columns.to_vec(),
            unique,
        }
    }

    /// Derived name: `<table>_<col>_<col>_idx`.
    pub fn name(&self) -> String {
        format!("{}_{}_idx", self.table, self.columns.join("_"))
    }

    pub fn to_sql(&self) -> Result<String, StoreError> {
        let mut columns = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            columns.push(quote_ident(column)?);
        }
        Ok(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if self.unique { "UNIQUE " } else { "" },
            quote_ident(&self.name())?,
            quote_ident(self.table)?,
            columns.join(", ")
        ))
    }
}

fn ident_regex() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

/// Reject anything that is not a plain SQL identifier.
pub fn validate_ident(name: &str) -> Result<(), StoreError> {
    if ident_regex().is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Validate and double-quote an identifier for SQL.
pub fn quote_ident(name: &str) -> Result<String, StoreError> {
    validate_ident(name)?;
    Ok(format!("\"{name}\""))
}

fn sql_literal(value: &Value) -> Result<String, StoreError> {
    match value {
        Value::Null => Ok("NULL".to_string()),
        Value::Integer(v) => Ok(v.to_string()),
        Value::Real(v) => Ok(v.to_string()),
        Value::Text(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
        Value::Blob(_) => Err(StoreError::ConstraintViolation(
            "blob column defaults are not supported".to_string(),
        )),
    }
}
