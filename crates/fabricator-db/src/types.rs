//! Common type definitions for database abstraction

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Database type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
	Postgres,
	Sqlite,
	Mysql,
}

/// Query value types
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	Bytes(Vec<u8>),
	Timestamp(DateTime<Utc>),
	Uuid(Uuid),
}

impl QueryValue {
	pub fn is_null(&self) -> bool {
		matches!(self, QueryValue::Null)
	}
}

impl From<&str> for QueryValue {
	fn from(s: &str) -> Self {
		QueryValue::String(s.to_string())
	}
}

impl From<String> for QueryValue {
	fn from(s: String) -> Self {
		QueryValue::String(s)
	}
}

impl From<i64> for QueryValue {
	fn from(i: i64) -> Self {
		QueryValue::Int(i)
	}
}

impl From<i32> for QueryValue {
	fn from(i: i32) -> Self {
		QueryValue::Int(i as i64)
	}
}

impl From<f64> for QueryValue {
	fn from(f: f64) -> Self {
		QueryValue::Float(f)
	}
}

impl From<bool> for QueryValue {
	fn from(b: bool) -> Self {
		QueryValue::Bool(b)
	}
}

impl From<DateTime<Utc>> for QueryValue {
	fn from(dt: DateTime<Utc>) -> Self {
		QueryValue::Timestamp(dt)
	}
}

impl From<Uuid> for QueryValue {
	fn from(u: Uuid) -> Self {
		QueryValue::Uuid(u)
	}
}

/// Query result
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
	pub rows_affected: u64,
	/// Row id assigned by the server, when the driver reports one.
	pub last_insert_id: Option<i64>,
}

/// Row from query result
#[derive(Debug, Clone)]
pub struct Row {
	pub(crate) data: HashMap<String, QueryValue>,
}

impl Row {
	pub fn new() -> Self {
		Self {
			data: HashMap::new(),
		}
	}

	pub fn insert(&mut self, key: String, value: QueryValue) {
		self.data.insert(key, value);
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Returns the raw value of a column.
	pub fn value(&self, key: &str) -> Result<&QueryValue> {
		self.data
			.get(key)
			.ok_or_else(|| DatabaseError::ColumnNotFound(key.to_string()))
	}

	pub fn get<T: ColumnValue>(&self, key: &str) -> Result<T> {
		self.value(key).cloned().and_then(T::from_query_value)
	}
}

impl Default for Row {
	fn default() -> Self {
		Self::new()
	}
}

/// Conversion between a record field type and a [`QueryValue`].
///
/// Implemented for the scalar types a mapped column may hold, and for
/// `Option<T>` of each, where `None` maps to SQL `NULL`.
pub trait ColumnValue: Sized {
	fn to_query_value(&self) -> QueryValue;

	fn from_query_value(value: QueryValue) -> Result<Self>;
}

fn type_error(value: &QueryValue, target: &str) -> DatabaseError {
	DatabaseError::TypeError(format!("Cannot convert {:?} to {}", value, target))
}

impl ColumnValue for i64 {
	fn to_query_value(&self) -> QueryValue {
		QueryValue::Int(*self)
	}

	fn from_query_value(value: QueryValue) -> Result<Self> {
		match value {
			QueryValue::Int(i) => Ok(i),
			QueryValue::Bool(b) => Ok(b as i64),
			other => Err(type_error(&other, "i64")),
		}
	}
}

macro_rules! narrow_int_column {
	($($ty:ty),*) => {
		$(
			impl ColumnValue for $ty {
				fn to_query_value(&self) -> QueryValue {
					QueryValue::Int(*self as i64)
				}

				fn from_query_value(value: QueryValue) -> Result<Self> {
					let wide = i64::from_query_value(value)?;
					<$ty>::try_from(wide).map_err(|_| {
						DatabaseError::TypeError(format!(
							"Value {} out of range for {}",
							wide,
							stringify!($ty)
						))
					})
				}
			}
		)*
	};
}

narrow_int_column!(i32, i16);

impl ColumnValue for f64 {
	fn to_query_value(&self) -> QueryValue {
		QueryValue::Float(*self)
	}

	fn from_query_value(value: QueryValue) -> Result<Self> {
		match value {
			QueryValue::Float(f) => Ok(f),
			QueryValue::Int(i) => Ok(i as f64),
			other => Err(type_error(&other, "f64")),
		}
	}
}

impl ColumnValue for f32 {
	fn to_query_value(&self) -> QueryValue {
		QueryValue::Float(*self as f64)
	}

	fn from_query_value(value: QueryValue) -> Result<Self> {
		f64::from_query_value(value).map(|f| f as f32)
	}
}

impl ColumnValue for bool {
	fn to_query_value(&self) -> QueryValue {
		QueryValue::Bool(*self)
	}

	fn from_query_value(value: QueryValue) -> Result<Self> {
		match value {
			QueryValue::Bool(b) => Ok(b),
			// SQLite has no boolean storage class
			QueryValue::Int(i) => Ok(i != 0),
			other => Err(type_error(&other, "bool")),
		}
	}
}

impl ColumnValue for String {
	fn to_query_value(&self) -> QueryValue {
		QueryValue::String(self.clone())
	}

	fn from_query_value(value: QueryValue) -> Result<Self> {
		match value {
			QueryValue::String(s) => Ok(s),
			other => Err(type_error(&other, "String")),
		}
	}
}

impl ColumnValue for Vec<u8> {
	fn to_query_value(&self) -> QueryValue {
		QueryValue::Bytes(self.clone())
	}

	fn from_query_value(value: QueryValue) -> Result<Self> {
		match value {
			QueryValue::Bytes(b) => Ok(b),
			other => Err(type_error(&other, "Vec<u8>")),
		}
	}
}

impl ColumnValue for DateTime<Utc> {
	fn to_query_value(&self) -> QueryValue {
		QueryValue::Timestamp(*self)
	}

	fn from_query_value(value: QueryValue) -> Result<Self> {
		match value {
			QueryValue::Timestamp(dt) => Ok(dt),
			QueryValue::String(s) => parse_timestamp(&s)
				.ok_or_else(|| DatabaseError::TypeError(format!("Invalid timestamp: {}", s))),
			other => Err(type_error(&other, "DateTime<Utc>")),
		}
	}
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
	if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
		return Some(dt.with_timezone(&Utc));
	}
	["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
		.iter()
		.find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
		.map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

impl ColumnValue for Uuid {
	fn to_query_value(&self) -> QueryValue {
		QueryValue::Uuid(*self)
	}

	fn from_query_value(value: QueryValue) -> Result<Self> {
		match value {
			QueryValue::Uuid(u) => Ok(u),
			QueryValue::Bytes(b) => {
				Uuid::from_slice(&b).map_err(|e| DatabaseError::TypeError(e.to_string()))
			}
			QueryValue::String(s) => {
				Uuid::parse_str(&s).map_err(|e| DatabaseError::TypeError(e.to_string()))
			}
			other => Err(type_error(&other, "Uuid")),
		}
	}
}

impl<T: ColumnValue> ColumnValue for Option<T> {
	fn to_query_value(&self) -> QueryValue {
		match self {
			Some(v) => v.to_query_value(),
			None => QueryValue::Null,
		}
	}

	fn from_query_value(value: QueryValue) -> Result<Self> {
		match value {
			QueryValue::Null => Ok(None),
			other => T::from_query_value(other).map(Some),
		}
	}
}
