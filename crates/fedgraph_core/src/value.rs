use serde::{Deserialize, Serialize};

use crate::{StoreError, StoreResult};

/// A single scalar as it appears in a raw result row or a bound parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Integer(_) => "integer",
            SqlValue::Real(_) => "real",
            SqlValue::Text(_) => "text",
            SqlValue::Blob(_) => "blob",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

/// Storage class declared for a column.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Integer,
    Boolean,
}

/// Conversion between a record field and its stored scalar.
pub trait SqlField: Sized {
    const KIND: ColumnKind;
    const NULLABLE: bool = false;

    fn from_sql(value: SqlValue) -> Result<Self, String>;

    fn to_sql(&self) -> SqlValue;
}

impl SqlField for String {
    const KIND: ColumnKind = ColumnKind::Text;

    fn from_sql(value: SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Text(text) => Ok(text),
            other => Err(format!("expected text, found {}", other.type_name())),
        }
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl SqlField for i64 {
    const KIND: ColumnKind = ColumnKind::Integer;

    fn from_sql(value: SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Integer(int) => Ok(int),
            other => Err(format!("expected integer, found {}", other.type_name())),
        }
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Integer(*self)
    }
}

impl SqlField for bool {
    const KIND: ColumnKind = ColumnKind::Boolean;

    fn from_sql(value: SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Integer(int) => Ok(int != 0),
            other => Err(format!("expected boolean, found {}", other.type_name())),
        }
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Integer(i64::from(*self))
    }
}

impl<T: SqlField> SqlField for Option<T> {
    const KIND: ColumnKind = T::KIND;
    const NULLABLE: bool = true;

    fn from_sql(value: SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql(other).map(Some),
        }
    }

    fn to_sql(&self) -> SqlValue {
        match self {
            Some(inner) => inner.to_sql(),
            None => SqlValue::Null,
        }
    }
}

/// Decodes one positional value, naming the table and column on failure.
pub fn decode_field<T: SqlField>(table: &str, column: &str, value: SqlValue) -> StoreResult<T> {
    T::from_sql(value).map_err(|reason| StoreError::shape(format!("{table}.{column}: {reason}")))
}
