//! Database connection management

use std::sync::Arc;

use tracing::debug;

use crate::{
	backend::DatabaseBackend,
	config::DatabaseConfig,
	error::{DatabaseError, Result},
	sql::PlaceholderStyle,
	types::{DatabaseType, QueryResult, QueryValue, Row},
};

#[cfg(feature = "postgres")]
use crate::dialect::PostgresBackend;

#[cfg(feature = "sqlite")]
use crate::dialect::SqliteBackend;

/// Database connection wrapper
///
/// Cheap to clone; every clone shares the same backend and pool.
#[derive(Clone)]
pub struct DatabaseConnection {
	backend: Arc<dyn DatabaseBackend>,
}

impl DatabaseConnection {
	pub fn new(backend: Arc<dyn DatabaseBackend>) -> Self {
		Self { backend }
	}

	/// Open a pool for the engine named by `config`.
	pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
		let db_type = config.database_type()?;
		debug!(engine = %config.engine, ?db_type, "opening database connection");
		match db_type {
			#[cfg(feature = "sqlite")]
			DatabaseType::Sqlite => {
				use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
				use std::str::FromStr;

				let options = SqliteConnectOptions::from_str(&config.to_url())?.create_if_missing(true);
				let pool = SqlitePoolOptions::new()
					.max_connections(config.max_connections())
					.connect_with(options)
					.await?;
				Ok(Self::from_sqlite_pool(pool))
			}
			#[cfg(feature = "postgres")]
			DatabaseType::Postgres => {
				let pool = sqlx::postgres::PgPoolOptions::new()
					.max_connections(config.max_connections())
					.connect(&config.to_url())
					.await?;
				Ok(Self::from_postgres_pool(pool))
			}
			#[allow(unreachable_patterns)]
			_ => Err(DatabaseError::UnsupportedEngine(config.engine.clone())),
		}
	}

	#[cfg(feature = "postgres")]
	pub async fn connect_postgres(url: &str) -> Result<Self> {
		use sqlx::PgPool;
		let pool = PgPool::connect(url).await?;
		Ok(Self::from_postgres_pool(pool))
	}

	#[cfg(feature = "postgres")]
	pub fn from_postgres_pool(pool: sqlx::PgPool) -> Self {
		Self {
			backend: Arc::new(PostgresBackend::new(pool)),
		}
	}

	#[cfg(feature = "sqlite")]
	pub async fn connect_sqlite(url: &str) -> Result<Self> {
		use sqlx::SqlitePool;
		let pool = SqlitePool::connect(url).await?;
		Ok(Self::from_sqlite_pool(pool))
	}

	#[cfg(feature = "sqlite")]
	pub fn from_sqlite_pool(pool: sqlx::SqlitePool) -> Self {
		Self {
			backend: Arc::new(SqliteBackend::new(pool)),
		}
	}

	/// Get the database type
	pub fn database_type(&self) -> DatabaseType {
		self.backend.database_type()
	}

	pub fn placeholder_style(&self) -> PlaceholderStyle {
		self.backend.placeholder_style()
	}

	pub fn supports_returning(&self) -> bool {
		self.backend.supports_returning()
	}

	pub async fn execute(&self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult> {
		self.backend.execute(sql, params).await
	}

	pub async fn fetch_one(&self, sql: &str, params: Vec<QueryValue>) -> Result<Row> {
		self.backend.fetch_one(sql, params).await
	}

	pub async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		self.backend.fetch_optional(sql, params).await
	}
}

impl std::fmt::Debug for DatabaseConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DatabaseConnection")
			.field("database_type", &self.database_type())
			.finish()
	}
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_connect_file_database_from_config() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("fixtures.db");
		let config = DatabaseConfig::sqlite(path.to_string_lossy().to_string());

		let conn = DatabaseConnection::connect(&config).await.unwrap();
		assert_eq!(conn.database_type(), DatabaseType::Sqlite);
		assert_eq!(conn.placeholder_style(), PlaceholderStyle::Question);

		conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", vec![])
			.await
			.unwrap();
		let result = conn
			.execute("INSERT INTO t (id) VALUES (?)", vec![QueryValue::Int(42)])
			.await
			.unwrap();
		assert_eq!(result.rows_affected, 1);
		assert!(path.exists());
	}

	#[rstest]
	#[tokio::test]
	async fn test_connect_rejects_unknown_engine() {
		let mut config = DatabaseConfig::sqlite(":memory:");
		config.engine = "oracle".to_string();
		let result = DatabaseConnection::connect(&config).await;
		assert!(matches!(result, Err(DatabaseError::UnsupportedEngine(_))));
	}
}
