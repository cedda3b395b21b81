//! Database layer for fabricator.
//!
//! Provides the narrow persistence surface the factory engine needs: a
//! [`DatabaseBackend`] trait over SQLite and PostgreSQL (via `sqlx`),
//! a [`DatabaseConnection`] handle passed explicitly into create and delete
//! calls, [`DatabaseConfig`] for opening one, and the single-row
//! INSERT/SELECT/DELETE statement builders in [`sql`].
//!
//! # Features
//!
//! - `sqlite` - SQLite backend (enabled by default)
//! - `postgres` - PostgreSQL backend
//! - `full` - All backends

pub mod backend;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod sql;
pub mod types;

pub use backend::DatabaseBackend;
pub use config::DatabaseConfig;
pub use connection::DatabaseConnection;
pub use error::{DatabaseError, Result};
pub use sql::PlaceholderStyle;
pub use types::{ColumnValue, DatabaseType, QueryResult, QueryValue, Row};

#[cfg(feature = "sqlite")]
pub use dialect::SqliteBackend;

#[cfg(feature = "postgres")]
pub use dialect::PostgresBackend;
