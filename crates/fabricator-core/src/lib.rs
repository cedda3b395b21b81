//! Blueprint resolution and instantiation engine for fabricator.
//!
//! This crate builds records from declarative factories for tests and
//! fixtures, and optionally persists them through a
//! [`DatabaseConnection`](fabricator_db::DatabaseConnection):
//!
//! - **Factories**: static, sequence, dynamic and associated field values,
//!   named traits and lifecycle callbacks, validated when defined
//! - **Blueprints**: per-call trait selection and field overrides, merged in
//!   a fixed order (factory, traits in selection order, overrides)
//! - **Field paths**: dotted paths into nested records, allocating unset
//!   `Option<Box<_>>` references on the way down
//! - **Persistence**: single-row insert, requery by primary key and delete
//!
//! # Quick Start
//!
//! ```ignore
//! use fabricator_core::{Factory, Model, Schema};
//!
//! #[derive(Debug, Clone, Default)]
//! struct User {
//!     id: i64,
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
//!     .sequence_field("id", 1, |n| n)
//!     .field("name", "test".to_string())
//!     .build()?;
//!
//! let built = users.build()?;
//! let created = users.create(&conn).await?;
//! users.delete(&conn, &created).await?;
//! ```

pub mod association;
pub mod blueprint;
pub mod callback;
pub mod error;
pub mod factory;
pub mod field_value;
pub mod schema;
pub mod sequence;
pub mod table;
pub mod value;

mod persistence;
mod resolve;

pub use association::{AssociatedRecord, Association, AssociationSource};
pub use blueprint::Blueprint;
pub use callback::{CallbackPhase, ConnectionCallback, RecordCallback};
pub use error::{BoxError, DefinitionError, FactoryError, FactoryResult, FieldPathError};
pub use factory::{Factory, FactoryBuilder};
pub use field_value::{DynamicGenerator, FieldValue, ProviderKind, SequenceGenerator, SequenceValue};
pub use schema::{FieldInfo, Model, Schema, schema_of};
pub use sequence::Sequence;
pub use table::{Column, ColumnTag, Table, to_snake_case};
pub use value::Value;
