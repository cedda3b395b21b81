//! SQLite dialect implementation

use async_trait::async_trait;
use sqlx::{
	Column, Row as SqlxRow, SqlitePool, TypeInfo, ValueRef,
	sqlite::{SqliteArguments, SqliteRow},
};
use std::sync::Arc;
use tracing::debug;

use crate::{
	backend::DatabaseBackend,
	error::Result,
	types::{DatabaseType, QueryResult, QueryValue, Row},
};

/// SQLite database backend
pub struct SqliteBackend {
	pool: Arc<SqlitePool>,
}

impl SqliteBackend {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool: Arc::new(pool),
		}
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	/// Query with `params` bound in order, kept out of the connection's
	/// statement cache.
	fn prepare<'q>(
		sql: &'q str,
		params: &'q [QueryValue],
	) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
		params
			.iter()
			.fold(sqlx::query(sql).persistent(false), Self::bind_value)
	}

	fn bind_value<'q>(
		query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
		value: &'q QueryValue,
	) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
		match value {
			QueryValue::Null => query.bind(None::<i64>),
			QueryValue::Bool(b) => query.bind(b),
			QueryValue::Int(i) => query.bind(i),
			QueryValue::Float(f) => query.bind(f),
			QueryValue::String(s) => query.bind(s),
			QueryValue::Bytes(b) => query.bind(b),
			QueryValue::Timestamp(dt) => query.bind(dt),
			QueryValue::Uuid(u) => query.bind(u),
		}
	}

	fn convert_row(sqlite_row: SqliteRow) -> Result<Row> {
		let mut row = Row::new();
		for column in sqlite_row.columns() {
			let column_name = column.name();
			let declared = column.type_info().name().to_uppercase();

			if sqlite_row.try_get_raw(column.ordinal())?.is_null() {
				row.insert(column_name.to_string(), QueryValue::Null);
				continue;
			}

			// Booleans and timestamps are stored as integers or text; the declared
			// column type decides how they come back.
			let value = if declared.contains("BOOL") {
				sqlite_row
					.try_get::<bool, _>(column.ordinal())
					.map(QueryValue::Bool)
					.ok()
			} else if declared.contains("DATE") || declared.contains("TIME") {
				sqlite_row
					.try_get::<chrono::DateTime<chrono::Utc>, _>(column.ordinal())
					.map(QueryValue::Timestamp)
					.ok()
			} else {
				None
			};

			let value = match value {
				Some(value) => value,
				None => Self::decode_storage_class(&sqlite_row, column.ordinal()),
			};
			row.insert(column_name.to_string(), value);
		}
		Ok(row)
	}

	fn decode_storage_class(sqlite_row: &SqliteRow, index: usize) -> QueryValue {
		if let Ok(value) = sqlite_row.try_get::<i64, _>(index) {
			QueryValue::Int(value)
		} else if let Ok(value) = sqlite_row.try_get::<f64, _>(index) {
			QueryValue::Float(value)
		} else if let Ok(value) = sqlite_row.try_get::<String, _>(index) {
			QueryValue::String(value)
		} else if let Ok(value) = sqlite_row.try_get::<Vec<u8>, _>(index) {
			QueryValue::Bytes(value)
		} else {
			QueryValue::Null
		}
	}
}

#[async_trait]
impl DatabaseBackend for SqliteBackend {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Sqlite
	}

	fn supports_returning(&self) -> bool {
		true
	}

	async fn execute(&self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult> {
		debug!(sql, params = params.len(), "sqlite execute");
		let query = Self::prepare(sql, &params);
		let result = query.execute(self.pool.as_ref()).await?;
		Ok(QueryResult {
			rows_affected: result.rows_affected(),
			last_insert_id: Some(result.last_insert_rowid()),
		})
	}

	async fn fetch_one(&self, sql: &str, params: Vec<QueryValue>) -> Result<Row> {
		debug!(sql, params = params.len(), "sqlite fetch_one");
		let query = Self::prepare(sql, &params);
		let row = query.fetch_one(self.pool.as_ref()).await?;
		Self::convert_row(row)
	}


	async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		debug!(sql, params = params.len(), "sqlite fetch_optional");
		let query = Self::prepare(sql, &params);
		let row = query.fetch_optional(self.pool.as_ref()).await?;
		row.map(Self::convert_row).transpose()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::*;
	use sqlx::sqlite::SqlitePoolOptions;

	#[fixture]
	async fn backend() -> SqliteBackend {
		let pool = SqlitePoolOptions::new()
			.max_connections(1)
			.connect("sqlite::memory:")
			.await
			.expect("Failed to open in-memory SQLite database");
		sqlx::query(
			"CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, \
			 active BOOLEAN NOT NULL DEFAULT 1, price REAL, created_at DATETIME)",
		)
		.execute(&pool)
		.await
		.expect("Failed to create table");
		SqliteBackend::new(pool)
	}

	#[rstest]
	#[tokio::test]
	async fn test_execute_reports_last_insert_id(#[future] backend: SqliteBackend) {
		let backend = backend.await;
		let first = backend
			.execute("INSERT INTO items (name) VALUES (?)", vec!["a".into()])
			.await
			.unwrap();
		let second = backend
			.execute("INSERT INTO items (name) VALUES (?)", vec!["b".into()])
			.await
			.unwrap();

		assert_eq!(first.rows_affected, 1);
		assert_eq!(first.last_insert_id, Some(1));
		assert_eq!(second.last_insert_id, Some(2));
	}

	#[rstest]
	#[tokio::test]
	async fn test_statements_are_not_cached(#[future] backend: SqliteBackend) {
		use sqlx::Connection as _;

		let backend = backend.await;
		let cached = |conn: &sqlx::pool::PoolConnection<sqlx::Sqlite>| conn.cached_statements_size();
		let before = cached(&backend.pool().acquire().await.unwrap());

		for name in ["a", "b", "c"] {
			backend
				.execute("INSERT INTO items (name) VALUES (?)", vec![name.into()])
				.await
				.unwrap();
		}
		backend
			.fetch_one("SELECT name FROM items WHERE id=?", vec![QueryValue::Int(2)])
			.await
			.unwrap();
		backend
			.fetch_optional("SELECT name FROM items WHERE id=?", vec![QueryValue::Int(9)])
			.await
			.unwrap();

		let after = cached(&backend.pool().acquire().await.unwrap());
		assert_eq!(after, before);
	}

	#[rstest]
	#[tokio::test]
	async fn test_fetch_one_converts_declared_types(#[future] backend: SqliteBackend) {
		let backend = backend.await;
		let created_at = chrono::DateTime::parse_from_rfc3339("2017-11-19T00:00:00Z")
			.unwrap()
			.with_timezone(&chrono::Utc);
		backend
			.execute(
				"INSERT INTO items (name, active, price, created_at) VALUES (?,?,?,?)",
				vec![
					"widget".into(),
					QueryValue::Bool(false),
					QueryValue::Float(2.5),
					created_at.into(),
				],
			)
			.await
			.unwrap();

		let row = backend
			.fetch_one(
				"SELECT id,name,active,price,created_at FROM items WHERE id=?",
				vec![QueryValue::Int(1)],
			)
			.await
			.unwrap();

		assert_eq!(row.value("id").unwrap(), &QueryValue::Int(1));
		assert_eq!(row.value("name").unwrap(), &QueryValue::from("widget"));
		assert_eq!(row.value("active").unwrap(), &QueryValue::Bool(false));
		assert_eq!(row.value("price").unwrap(), &QueryValue::Float(2.5));
		assert_eq!(row.get::<chrono::DateTime<chrono::Utc>>("created_at").unwrap(), created_at);
	}

	#[rstest]
	#[tokio::test]
	async fn test_fetch_null_column(#[future] backend: SqliteBackend) {
		let backend = backend.await;
		backend
			.execute("INSERT INTO items (name) VALUES (?)", vec!["bare".into()])
			.await
			.unwrap();

		let row = backend
			.fetch_optional("SELECT price FROM items WHERE name=?", vec!["bare".into()])
			.await
			.unwrap()
			.expect("row should exist");
		assert_eq!(row.value("price").unwrap(), &QueryValue::Null);

		let missing = backend
			.fetch_optional("SELECT price FROM items WHERE name=?", vec!["nope".into()])
			.await
			.unwrap();
		assert!(missing.is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_insert_returning(#[future] backend: SqliteBackend) {
		let backend = backend.await;
		let row = backend
			.fetch_one(
				"INSERT INTO items (name) VALUES (?) RETURNING id",
				vec!["returned".into()],
			)
			.await
			.unwrap();
		assert_eq!(row.get::<i64>("id").unwrap(), 1);
	}
}
