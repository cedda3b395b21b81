//! Database backend abstraction

use async_trait::async_trait;

use crate::{
	error::Result,
	sql::PlaceholderStyle,
	types::{DatabaseType, QueryResult, QueryValue, Row},
};

/// Executes SQL statements against one database.
///
/// Every statement is prepared per call; backends keep no statement cache.
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
	fn database_type(&self) -> DatabaseType;

	/// Placeholder style derived from the driver in use.
	fn placeholder_style(&self) -> PlaceholderStyle {
		PlaceholderStyle::for_database(self.database_type())
	}

	fn supports_returning(&self) -> bool {
		false
	}

	async fn execute(&self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult>;

	async fn fetch_one(&self, sql: &str, params: Vec<QueryValue>) -> Result<Row>;

	async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>>;
}
