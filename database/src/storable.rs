//! The capability every persisted entity provides to the generic store.

use chrono::{DateTime, Utc};
use sqlx::error::BoxDynError;
use sqlx::sqlite::{Sqlite, SqliteRow, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, FromRow, Type};
use std::fmt;

/// SQL expression evaluated by the database when the row is written.
pub const COMMIT_TIMESTAMP_SQL: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// A single column value as handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    /// Filled in by the database at write time, never from the client clock.
    CommitTimestamp,
    Null,
}

impl Value {
    /// The SQL fragment this value occupies in a write statement.
    pub(crate) fn placeholder(&self) -> &'static str {
        match self {
            Value::CommitTimestamp => COMMIT_TIMESTAMP_SQL,
            _ => "?",
        }
    }

    pub(crate) fn is_bound(&self) -> bool {
        !matches!(self, Value::CommitTimestamp)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Value::CommitTimestamp => f.write_str("<commit>"),
            Value::Null => f.write_str("NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<ObserveTime> for Value {
    fn from(v: ObserveTime) -> Self {
        match v {
            ObserveTime::Commit => Value::CommitTimestamp,
            ObserveTime::At(at) => Value::Timestamp(at),
        }
    }
}

/// Primary key (or key prefix) of an entity, one value per key column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Key(Vec<Value>);

impl Key {
    pub fn new(parts: Vec<Value>) -> Self {
        Self(parts)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parts(&self) -> &[Value] {
        &self.0
    }

    /// The `index`th part, or `Null` when the key is shorter.
    pub fn part(&self, index: usize) -> Value {
        self.0.get(index).cloned().unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{part}")?;
        }
        f.write_str(")")
    }
}

/// Build a [`Key`] from anything convertible into [`Value`].
#[macro_export]
macro_rules! key {
    () => {
        $crate::Key::empty()
    };
    ($($part:expr),+ $(,)?) => {
        $crate::Key::new(vec![$($crate::Value::from($part)),+])
    };
}

/// A query with positional `?` parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into(), params: Vec::new() }
    }

    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// When a row was observed. Entities are written with [`ObserveTime::Commit`] and read back with
/// the timestamp the database assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObserveTime {
    #[default]
    Commit,
    At(DateTime<Utc>),
}

impl ObserveTime {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            ObserveTime::Commit => None,
            ObserveTime::At(at) => Some(*at),
        }
    }
}

impl Type<Sqlite> for ObserveTime {
    fn type_info() -> SqliteTypeInfo {
        <DateTime<Utc> as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <DateTime<Utc> as Type<Sqlite>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Sqlite> for ObserveTime {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        <DateTime<Utc> as Decode<'r, Sqlite>>::decode(value).map(ObserveTime::At)
    }
}

/// Anything the store can persist: a table, its columns, a primary key and a listing query.
///
/// `values()` must return one value per entry of `COLUMNS`, in the same order. Rows are read back
/// through `FromRow`, so field names have to match the column names.
pub trait Storable: for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const KEY_COLUMNS: &'static [&'static str];

    fn key(&self) -> Key;

    fn values(&self) -> Vec<Value>;

    /// The canonical listing query for this table. `prefix` narrows the listing to rows sharing
    /// leading key parts; entities that list globally ignore it.
    fn list(prefix: &Key, limit: i64, offset: i64) -> Statement;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_key_macro_and_display() {
        let key = key!["abc", 7i64];
        assert_eq!(key.len(), 2);
        assert_eq!(key.part(0), Value::Text("abc".into()));
        assert_eq!(key.part(1), Value::Integer(7));
        assert_eq!(key.part(2), Value::Null);
        assert_eq!(key.to_string(), "(\"abc\", 7)");
        assert!(key![].is_empty());
    }

    #[test]
    fn test_commit_timestamp_is_rendered_not_bound() {
        assert_eq!(Value::CommitTimestamp.placeholder(), COMMIT_TIMESTAMP_SQL);
        assert!(!Value::CommitTimestamp.is_bound());
        assert_eq!(Value::Integer(1).placeholder(), "?");
        assert!(Value::Null.is_bound());
    }

    #[test]
    fn test_observe_time_conversion() {
        let at = Utc.with_ymd_and_hms(2022, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(Value::from(ObserveTime::Commit), Value::CommitTimestamp);
        assert_eq!(Value::from(ObserveTime::At(at)), Value::Timestamp(at));
        assert_eq!(ObserveTime::At(at).timestamp(), Some(at));
        assert_eq!(ObserveTime::default(), ObserveTime::Commit);
    }

    #[test]
    fn test_optional_values() {
        assert_eq!(Value::from(Some(true)), Value::Bool(true));
        assert_eq!(Value::from(None::<bool>), Value::Null);
    }
}
