//! Database error types

use thiserror::Error;

/// Errors raised by database backends and value conversions.
#[derive(Debug, Error)]
pub enum DatabaseError {
	/// The driver reported a failure while preparing, executing or scanning a statement.
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	/// A row did not contain the requested column.
	#[error("Column not found: {0}")]
	ColumnNotFound(String),

	/// A column value could not be converted to the requested type.
	#[error("Type error: {0}")]
	TypeError(String),

	/// The statement executed but produced an unexpected result.
	#[error("Query error: {0}")]
	QueryError(String),

	/// The configured engine or driver is not compiled in or not recognised.
	#[error("Unsupported database engine: {0}")]
	UnsupportedEngine(String),
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
