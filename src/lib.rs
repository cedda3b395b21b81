//! # Fabricator
//!
//! Blueprint-driven record factories for tests and fixtures.
//!
//! A factory describes how to fill in a record type: static values,
//! sequences, values computed from the record built so far, associated
//! records produced by other factories, named traits that layer extra
//! values on top, and lifecycle callbacks. Records can be built in memory
//! or created through a database connection, where they are inserted and
//! then read back so that database-assigned values reach the caller.
//!
//! ## Feature Flags
//!
//! - `sqlite` (default) - SQLite backend
//! - `postgres` - PostgreSQL backend
//! - `full` - All backends
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use fabricator::prelude::*;
//!
//! #[derive(Debug, Clone, Default)]
//! struct User {
//!     id: Option<i64>,
//!     name: String,
//! }
//!
//! impl Model for User {
//!     fn schema(schema: Schema<Self>) -> Schema<Self> {
//!         schema
//!             .column("id", "id,primary", |u| &u.id, |u| &mut u.id)
//!             .column("name", "", |u| &u.name, |u| &mut u.name)
//!     }
//! }
//!
//! let users = Factory::<User>::builder("user")
//!     .sequence_field("name", 1, |n| format!("user {}", n))
//!     .with_trait("admin", |t| t.field("name", "admin".to_string()))
//!     .build()?;
//!
//! let conn = DatabaseConnection::connect(&DatabaseConfig::sqlite(":memory:")).await?;
//! let admin = users.blueprint().with_traits(["admin"]).create(&conn).await?;
//! ```

pub use fabricator_core::{
	AssociatedRecord, Association, AssociationSource, Blueprint, BoxError, CallbackPhase,
	DefinitionError, Factory, FactoryBuilder, FactoryError, FactoryResult, FieldPathError,
	Model, Schema, Sequence, Value,
};
pub use fabricator_db::{
	DatabaseBackend, DatabaseConfig, DatabaseConnection, DatabaseError, DatabaseType,
	QueryValue,
};

#[cfg(feature = "sqlite")]
pub use fabricator_db::SqliteBackend;

#[cfg(feature = "postgres")]
pub use fabricator_db::PostgresBackend;

/// Everything needed to define models and factories.
pub mod prelude {
	pub use crate::{
		BoxError, DatabaseConfig, DatabaseConnection, Factory, FactoryError, FactoryResult,
		Model, Schema,
	};

	// External
	pub use async_trait::async_trait;
}
