//! PostgreSQL dialect implementation

use async_trait::async_trait;
use sqlx::{Column, PgPool, Row as SqlxRow, ValueRef, postgres::PgRow};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::{
	backend::DatabaseBackend,
	error::Result,
	types::{DatabaseType, QueryResult, QueryValue, Row},
};

/// PostgreSQL database backend
pub struct PostgresBackend {
	pool: Arc<PgPool>,
}

impl PostgresBackend {
	pub fn new(pool: PgPool) -> Self {
		Self {
			pool: Arc::new(pool),
		}
	}

	/// Query with `params` bound in order, kept out of the connection's
	/// statement cache.
	fn prepare<'q>(
		sql: &'q str,
		params: &'q [QueryValue],
	) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
		params
			.iter()
			.fold(sqlx::query(sql).persistent(false), Self::bind_value)
	}

	fn bind_value<'q>(
		query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
		value: &'q QueryValue,
	) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
		match value {
			QueryValue::Null => query.bind(None::<i32>),
			QueryValue::Bool(b) => query.bind(b),
			QueryValue::Int(i) => query.bind(i),
			QueryValue::Float(f) => query.bind(f),
			QueryValue::String(s) => query.bind(s),
			QueryValue::Bytes(b) => query.bind(b),
			QueryValue::Timestamp(dt) => query.bind(dt),
			QueryValue::Uuid(u) => query.bind(u),
		}
	}

	fn convert_row(pg_row: PgRow) -> Result<Row> {
		let mut row = Row::new();
		for column in pg_row.columns() {
			let column_name = column.name();
			let index = column.ordinal();

			let value = if pg_row.try_get_raw(index)?.is_null() {
				QueryValue::Null
			} else if let Ok(value) = pg_row.try_get::<Uuid, _>(index) {
				QueryValue::Uuid(value)
			} else if let Ok(value) = pg_row.try_get::<bool, _>(index) {
				QueryValue::Bool(value)
			} else if let Ok(value) = pg_row.try_get::<i64, _>(index) {
				QueryValue::Int(value)
			} else if let Ok(value) = pg_row.try_get::<i32, _>(index) {
				QueryValue::Int(value as i64)
			} else if let Ok(value) = pg_row.try_get::<i16, _>(index) {
				QueryValue::Int(value as i64)
			} else if let Ok(value) = pg_row.try_get::<f64, _>(index) {
				QueryValue::Float(value)
			} else if let Ok(value) = pg_row.try_get::<f32, _>(index) {
				QueryValue::Float(value as f64)
			} else if let Ok(value) = pg_row.try_get::<String, _>(index) {
				QueryValue::String(value)
			} else if let Ok(value) = pg_row.try_get::<Vec<u8>, _>(index) {
				QueryValue::Bytes(value)
			} else if let Ok(value) = pg_row.try_get::<chrono::NaiveDateTime, _>(index) {
				QueryValue::Timestamp(chrono::DateTime::from_naive_utc_and_offset(
					value,
					chrono::Utc,
				))
			} else if let Ok(value) = pg_row.try_get::<chrono::DateTime<chrono::Utc>, _>(index) {
				QueryValue::Timestamp(value)
			} else {
				QueryValue::Null
			};
			row.insert(column_name.to_string(), value);
		}
		Ok(row)
	}
}

#[async_trait]
impl DatabaseBackend for PostgresBackend {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Postgres
	}

	fn supports_returning(&self) -> bool {
		true
	}

	async fn execute(&self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult> {
		debug!(sql, params = params.len(), "postgres execute");
		let query = Self::prepare(sql, &params);
		let result = query.execute(self.pool.as_ref()).await?;
		Ok(QueryResult {
			rows_affected: result.rows_affected(),
			last_insert_id: None,
		})
	}

	async fn fetch_one(&self, sql: &str, params: Vec<QueryValue>) -> Result<Row> {
		debug!(sql, params = params.len(), "postgres fetch_one");
		let query = Self::prepare(sql, &params);
		let row = query.fetch_one(self.pool.as_ref()).await?;
		Self::convert_row(row)
	}


	async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		debug!(sql, params = params.len(), "postgres fetch_optional");
		let query = Self::prepare(sql, &params);
		let row = query.fetch_optional(self.pool.as_ref()).await?;
		row.map(Self::convert_row).transpose()
	}
}
