//! Typed views over task columns whose stored encoding is looser than their meaning.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// The `is_allday` column, decoded.
///
/// Stored as the text markers `"1"` / `"0"` (SQLite's INTEGER affinity may
/// turn them into integers), or NULL when never set. Unset and unrecognised
/// values are falsy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllDayFlag {
    Yes,
    No,
    Unset,
}

impl AllDayFlag {
    pub fn from_stored(value: &Value) -> Self {
        match value {
            Value::Null => Self::Unset,
            Value::Integer(1) => Self::Yes,
            Value::Text(s) if s == "1" => Self::Yes,
            _ => Self::No,
        }
    }

    pub fn to_stored(self) -> Value {
        match self {
            Self::Yes => Value::Text("1".to_string()),
            Self::No => Value::Text("0".to_string()),
            Self::Unset => Value::Null,
        }
    }

    pub fn is_all_day(self) -> bool {
        self == Self::Yes
    }
}

impl From<Option<bool>> for AllDayFlag {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Yes,
            Some(false) => Self::No,
            None => Self::Unset,
        }
    }
}
