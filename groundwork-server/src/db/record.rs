//! Record shapes and caller-supplied field sets
//!
//! A [`Record`] names its table, primary key and the columns callers may
//! touch. [`Fields`] carries loosely-typed input (e.g. a deserialized JSON
//! body) that the repository filters against that column list before any SQL
//! is composed.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Encode, FromRow, Postgres, QueryBuilder, Type};
use uuid::Uuid;

use super::DbError;

/// A row shape the generic repository can read and write.
///
/// ```ignore
/// #[derive(sqlx::FromRow)]
/// struct Widget { id: i64, name: String, note: Option<String> }
///
/// impl Record for Widget {
///     type Key = i64;
///     const TABLE: &'static str = "widgets";
///     const COLUMNS: &'static [&'static str] = &["id", "name", "note"];
/// }
/// ```
pub trait Record: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static {
    /// Primary key type, bound as a query parameter
    type Key: for<'q> Encode<'q, Postgres> + Type<Postgres> + Clone + Send + Sync + fmt::Debug + 'static;

    /// Table name, optionally schema-qualified
    const TABLE: &'static str;

    /// Primary key column
    const PRIMARY_KEY: &'static str = "id";

    /// Columns callers may write, including the primary key
    const COLUMNS: &'static [&'static str];

    /// SQL types for columns whose values need an explicit cast on write,
    /// e.g. `("ref_id", "uuid")`. Text from JSON input is cast to these.
    const COLUMN_TYPES: &'static [(&'static str, &'static str)] = &[];
}

/// A single loosely-typed column value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Json(Value),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Append this value to `query` as a bind parameter (`NULL` is inlined),
    /// wrapped in `CAST(.. AS sql_type)` when a type is given.
    pub(crate) fn push_bind(self, query: &mut QueryBuilder<'_, Postgres>, sql_type: Option<&str>) {
        if self.is_null() {
            query.push("NULL");
            return;
        }
        if sql_type.is_some() {
            query.push("CAST(");
        }
        self.push_value(query);
        if let Some(sql_type) = sql_type {
            query.push(" AS ").push(sql_type).push(")");
        }
    }

    fn push_value(self, query: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Self::Null => {
                query.push("NULL");
            }
            Self::Bool(v) => {
                query.push_bind(v);
            }
            Self::Int(v) => {
                query.push_bind(v);
            }
            Self::Float(v) => {
                query.push_bind(v);
            }
            Self::Text(v) => {
                query.push_bind(v);
            }
            Self::Uuid(v) => {
                query.push_bind(v);
            }
            Self::Timestamp(v) => {
                query.push_bind(v);
            }
            Self::Json(v) => {
                query.push_bind(sqlx::types::Json(v));
            }
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for FieldValue {
    fn from(v: i16) -> Self {
        Self::Int(v.into())
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        Self::Float(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

/// Scalars map to their native variant; arrays and objects stay JSON.
impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Json(Value::Number(n)), Self::Float),
            },
            Value::String(s) => Self::Text(s),
            other => Self::Json(other),
        }
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Named column values supplied by a caller, ordered by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(BTreeMap<String, FieldValue>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Build from a JSON object. Any other JSON shape is rejected.
    pub fn from_json(value: Value) -> Result<Self, DbError> {
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(DbError::InvalidFields {
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
        }
    }

    /// Build from any value that serializes to a JSON object.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, DbError> {
        let json = serde_json::to_value(value).map_err(|e| DbError::InvalidFields {
            reason: e.to_string(),
        })?;
        Self::from_json(json)
    }

    /// Columns for an INSERT. Every name must be one of `R::COLUMNS`.
    pub(crate) fn insert_columns<R: Record>(self) -> Result<Vec<(&'static str, FieldValue)>, DbError> {
        self.0
            .into_iter()
            .map(|(name, value)| match column::<R>(&name) {
                Some(column) => Ok((column, value)),
                None => Err(DbError::UnknownField {
                    table: R::TABLE,
                    field: name,
                }),
            })
            .collect()
    }

    /// Columns for a partial UPDATE.
    ///
    /// Unknown names, null values and the primary key are dropped, so a column
    /// can never be cleared to NULL through an update.
    pub(crate) fn update_columns<R: Record>(self) -> Vec<(&'static str, FieldValue)> {
        self.0
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .filter_map(|(name, value)| column::<R>(&name).map(|column| (column, value)))
            .filter(|(column, _)| *column != R::PRIMARY_KEY)
            .collect()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// Resolve a caller-supplied name to the record's static column name
fn column<R: Record>(name: &str) -> Option<&'static str> {
    R::COLUMNS.iter().copied().find(|column| *column == name)
}

/// Declared SQL type for a column, if any
pub(crate) fn column_type<R: Record>(column: &str) -> Option<&'static str> {
    R::COLUMN_TYPES
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, sql_type)| *sql_type)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
