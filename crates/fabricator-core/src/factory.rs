//! Factory definitions.
//!
//! A [`Factory`] is the immutable description of how to produce one model
//! type: field values by provider kind, named traits, lifecycle callbacks
//! and the table records are persisted to. It is defined once through
//! [`FactoryBuilder`] and then shared (it is cheap to clone) by every
//! build, create and delete call.
//!
//! ```ignore
//! let users = Factory::<User>::builder("user")
//!     .sequence_field("id", 1, |n| n)
//!     .field("name", "test".to_string())
//!     .with_trait("teenager", |t| t.field("age", 15_i32))
//!     .after_build(|user| {
//!         user.nick_name = user.name.to_uppercase();
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let user = users.blueprint().with_traits(["teenager"]).build()?;
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use fabricator_db::DatabaseConnection;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::association::{Association, FactorySource};
use crate::blueprint::Blueprint;
use crate::callback::{CallbackPhase, Callbacks, CreateCallback};
use crate::error::{BoxError, DefinitionError, FactoryError, FactoryResult};
use crate::field_value::{FieldValue, SequenceValue};
use crate::persistence;
use crate::resolve::FieldValues;
use crate::schema::{FieldInfo, Model, Schema, schema_of};
use crate::sequence::Sequence;
use crate::table::Table;
use crate::value::{Value, short_type_name};

/// Values and callbacks of a factory or one of its traits.
pub(crate) struct Definition<M> {
	pub(crate) values: FieldValues<M>,
	pub(crate) callbacks: Callbacks<M>,
}

impl<M> Definition<M> {
	fn new() -> Self {
		Self {
			values: IndexMap::new(),
			callbacks: Callbacks::new(),
		}
	}

	fn sequences(&self) -> impl Iterator<Item = (&str, &Arc<Sequence>)> {
		self.values.iter().filter_map(|(path, value)| match value {
			FieldValue::Sequence(seq) => Some((path.as_str(), seq.sequence())),
			_ => None,
		})
	}
}

/// What a definition may contain besides plain field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Capabilities {
	associations: bool,
	traits: bool,
	callbacks: bool,
}

impl Capabilities {
	const FACTORY: Self = Self {
		associations: true,
		traits: true,
		callbacks: true,
	};

	const TRAIT: Self = Self {
		associations: true,
		traits: false,
		callbacks: true,
	};

	const ASSOCIATION: Self = Self {
		associations: false,
		traits: false,
		callbacks: false,
	};
}

/// Checks that a value of `type_id` may be stored at `path`.
pub(crate) fn check_field<M: Model>(
	schema: &Schema<M>,
	path: &str,
	type_id: TypeId,
	type_name: &'static str,
) -> Result<FieldInfo, DefinitionError> {
	let info = schema
		.field_info(path)
		.ok_or_else(|| DefinitionError::UnknownField {
			field: path.to_string(),
			model: schema.model_name(),
		})?;
	if !info.accepts(type_id) {
		return Err(DefinitionError::TypeMismatch {
			field: path.to_string(),
			expected: info.type_name(),
			actual: type_name,
			model: schema.model_name(),
		});
	}
	Ok(info)
}

struct FactoryInner<M> {
	table_name: Option<String>,
	schema: Arc<Schema<M>>,
	definition: Definition<M>,
	traits: IndexMap<String, Definition<M>>,
	table: OnceCell<Table>,
}

/// Immutable definition of how to produce records of `M`.
pub struct Factory<M> {
	inner: Arc<FactoryInner<M>>,
}

impl<M> Clone for Factory<M> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<M: Model> Factory<M> {
	/// Starts a definition for records persisted to `table`.
	///
	/// An empty table name defines a build-only factory.
	pub fn builder(table: impl Into<String>) -> FactoryBuilder<M> {
		let table = table.into();
		let table_name = if table.is_empty() { None } else { Some(table) };
		FactoryBuilder::new(table_name, Capabilities::FACTORY)
	}

	pub fn model_name(&self) -> &'static str {
		self.inner.schema.model_name()
	}

	pub fn table_name(&self) -> Option<&str> {
		self.inner.table_name.as_deref()
	}

	/// Column mapping of the factory's table, derived on first use.
	pub fn table(&self) -> FactoryResult<&Table> {
		let name = self
			.inner
			.table_name
			.as_deref()
			.ok_or(FactoryError::MissingTable {
				model: self.model_name(),
			})?;
		Ok(self
			.inner
			.table
			.get_or_init(|| Table::from_schema(name, &self.inner.schema)))
	}

	pub fn schema(&self) -> &Schema<M> {
		&self.inner.schema
	}

	/// Names of the defined traits, in definition order.
	pub fn trait_names(&self) -> impl Iterator<Item = &str> {
		self.inner.traits.keys().map(String::as_str)
	}

	/// The sequence behind the factory's own sequence field at `path`.
	pub fn sequence(&self, path: &str) -> Option<Arc<Sequence>> {
		self.inner
			.definition
			.sequences()
			.find(|(seq_path, _)| *seq_path == path)
			.map(|(_, seq)| Arc::clone(seq))
	}

	/// Rewinds every sequence of the factory, its traits and the overlays
	/// of its associations. The associated factories keep their own.
	pub fn rewind_sequences(&self) {
		let traits = self.inner.traits.values();
		for definition in std::iter::once(&self.inner.definition).chain(traits) {
			for value in definition.values.values() {
				match value {
					FieldValue::Sequence(seq) => seq.sequence().rewind(),
					FieldValue::Association(association) => association.source().rewind_sequences(),
					FieldValue::Static(_) | FieldValue::Dynamic(_) => {}
				}
			}
		}
	}

	/// Starts a build, create or delete call.
	pub fn blueprint(&self) -> Blueprint<M> {
		Blueprint::new(self.clone())
	}

	pub fn build(&self) -> FactoryResult<M> {
		self.blueprint().build()
	}

	pub fn build_batch(&self, count: usize) -> FactoryResult<Vec<M>> {
		self.blueprint().build_batch(count)
	}

	pub async fn create(&self, conn: &DatabaseConnection) -> FactoryResult<M> {
		self.blueprint().create(conn).await
	}

	pub async fn create_batch(&self, conn: &DatabaseConnection, count: usize) -> FactoryResult<Vec<M>> {
		self.blueprint().create_batch(conn, count).await
	}

	/// Deletes the row of `record`, which must be an `M` or a `Box<M>`.
	///
	/// Any other type fails with [`FactoryError::DeleteType`] before a
	/// statement is issued.
	pub async fn delete<T: Any>(&self, conn: &DatabaseConnection, record: &T) -> FactoryResult<()> {
		let any: &dyn Any = record;
		let record = match any.downcast_ref::<M>() {
			Some(record) => record,
			None => match any.downcast_ref::<Box<M>>() {
				Some(record) => &**record,
				None => {
					return Err(FactoryError::DeleteType {
						actual: short_type_name::<T>(),
						expected: self.model_name(),
					});
				}
			},
		};
		let table = self.table()?;
		persistence::delete_record(conn, table, self.schema(), record).await
	}

	pub(crate) fn definition(&self) -> &Definition<M> {
		&self.inner.definition
	}

	pub(crate) fn trait_definition(&self, name: &str) -> Option<&Definition<M>> {
		self.inner.traits.get(name)
	}
}

impl<M: Model> fmt::Debug for Factory<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Factory")
			.field("model", &self.model_name())
			.field("table", &self.inner.table_name)
			.field("fields", &self.inner.definition.values.keys().collect::<Vec<_>>())
			.field("traits", &self.trait_names().collect::<Vec<_>>())
			.finish()
	}
}

/// Builder for [`Factory`].
///
/// Every method validates its input against the model's schema. The first
/// error is kept and later calls are ignored; [`build`](Self::build)
/// reports it.
pub struct FactoryBuilder<M> {
	table_name: Option<String>,
	schema: Arc<Schema<M>>,
	definition: Definition<M>,
	traits: IndexMap<String, Definition<M>>,
	capabilities: Capabilities,
	error: Option<DefinitionError>,
}

impl<M: Model> FactoryBuilder<M> {
	fn new(table_name: Option<String>, capabilities: Capabilities) -> Self {
		Self {
			table_name,
			schema: schema_of::<M>(),
			definition: Definition::new(),
			traits: IndexMap::new(),
			capabilities,
			error: None,
		}
	}

	fn try_define(mut self, define: impl FnOnce(&mut Self) -> Result<(), DefinitionError>) -> Self {
		if self.error.is_none() {
			if let Err(error) = define(&mut self) {
				self.error = Some(error);
			}
		}
		self
	}

	fn check<T: Any>(&self, path: &str) -> Result<FieldInfo, DefinitionError> {
		check_field(&self.schema, path, TypeId::of::<T>(), short_type_name::<T>())
	}

	fn insert(&mut self, path: &str, value: FieldValue<M>) -> Result<(), DefinitionError> {
		if self.definition.values.contains_key(path) {
			return Err(DefinitionError::DuplicateField {
				field: path.to_string(),
				model: self.schema.model_name(),
			});
		}
		self.definition.values.insert(path.to_string(), value);
		Ok(())
	}

	fn into_definition(self) -> Result<Definition<M>, DefinitionError> {
		match self.error {
			Some(error) => Err(error),
			None => Ok(self.definition),
		}
	}

	/// Static value for the field at `path`.
	pub fn field<T>(self, path: &str, value: T) -> Self
	where
		T: Any + Clone + Send + Sync,
	{
		self.try_define(|b| {
			b.check::<T>(path)?;
			b.insert(path, FieldValue::Static(Value::new(value)))
		})
	}

	/// Value generated from a sequence starting at `first`.
	pub fn sequence_field<T, F>(self, path: &str, first: i64, generator: F) -> Self
	where
		T: Any + Clone + Send + Sync,
		F: Fn(i64) -> T + Send + Sync + 'static,
	{
		self.try_sequence_field(path, first, move |n| Ok(generator(n)))
	}

	/// Like [`sequence_field`](Self::sequence_field) with a fallible generator.
	pub fn try_sequence_field<T, F>(self, path: &str, first: i64, generator: F) -> Self
	where
		T: Any + Clone + Send + Sync,
		F: Fn(i64) -> Result<T, BoxError> + Send + Sync + 'static,
	{
		self.try_define(|b| {
			b.check::<T>(path)?;
			let generator = Arc::new(move |n: i64| -> Result<Value, BoxError> {
				generator(n).map(Value::new)
			});
			b.insert(path, FieldValue::Sequence(SequenceValue::new(first, generator)))
		})
	}

	/// Value computed from the record after its static and sequence values
	/// are set.
	pub fn dynamic_field<T, F>(self, path: &str, compute: F) -> Self
	where
		T: Any + Clone + Send + Sync,
		F: Fn(&M) -> T + Send + Sync + 'static,
	{
		self.try_dynamic_field(path, move |record: &M| Ok(compute(record)))
	}

	/// Like [`dynamic_field`](Self::dynamic_field) with a fallible computation.
	pub fn try_dynamic_field<T, F>(self, path: &str, compute: F) -> Self
	where
		T: Any + Clone + Send + Sync,
		F: Fn(&M) -> Result<T, BoxError> + Send + Sync + 'static,
	{
		self.try_define(|b| {
			b.check::<T>(path)?;
			let compute = Arc::new(move |record: &M| -> Result<Value, BoxError> {
				compute(record).map(Value::new)
			});
			b.insert(path, FieldValue::Dynamic(compute))
		})
	}

	/// Fills the record field at `path` from `factory`, then copies
	/// `association_reference_field` of that record into `reference_field`.
	///
	/// `overlay` may set field values on top of the associated factory's own;
	/// it cannot declare associations, traits or callbacks.
	pub fn association<A, F>(
		self,
		path: &str,
		reference_field: &str,
		association_reference_field: &str,
		factory: &Factory<A>,
		overlay: F,
	) -> Self
	where
		A: Model,
		F: FnOnce(FactoryBuilder<A>) -> FactoryBuilder<A>,
	{
		self.try_define(|b| {
			if !b.capabilities.associations {
				return Err(DefinitionError::NestedAssociation {
					field: path.to_string(),
				});
			}
			b.check::<A>(path)?;

			let owner_reference = b.schema.field_info(reference_field).ok_or_else(|| {
				DefinitionError::UnknownField {
					field: reference_field.to_string(),
					model: b.schema.model_name(),
				}
			})?;
			check_field(
				factory.schema(),
				association_reference_field,
				owner_reference.type_id(),
				owner_reference.type_name(),
			)
			.map_err(|error| match error {
				DefinitionError::TypeMismatch { expected, .. } => DefinitionError::TypeMismatch {
					field: reference_field.to_string(),
					expected: owner_reference.type_name(),
					actual: expected,
					model: b.schema.model_name(),
				},
				other => other,
			})?;

			let overlay = overlay(FactoryBuilder::new(None, Capabilities::ASSOCIATION)).into_definition()?;
			let source = FactorySource::new(
				factory.clone(),
				overlay.values,
				association_reference_field.to_string(),
			);
			let association = Association::new(
				path,
				reference_field,
				association_reference_field,
				Arc::new(source),
			);
			b.insert(path, FieldValue::Association(Arc::new(association)))
		})
	}

	/// Named overlay selectable per call with
	/// [`Blueprint::with_traits`](crate::blueprint::Blueprint::with_traits).
	pub fn with_trait<F>(self, name: &str, define: F) -> Self
	where
		F: FnOnce(FactoryBuilder<M>) -> FactoryBuilder<M>,
	{
		self.try_define(|b| {
			if !b.capabilities.traits {
				return Err(DefinitionError::NestedTrait {
					name: name.to_string(),
				});
			}
			if b.traits.contains_key(name) {
				return Err(DefinitionError::DuplicateTrait {
					name: name.to_string(),
					model: b.schema.model_name(),
				});
			}
			let definition = define(FactoryBuilder::new(None, Capabilities::TRAIT)).into_definition()?;
			b.traits.insert(name.to_string(), definition);
			Ok(())
		})
	}

	fn callback(self, phase: CallbackPhase, register: impl FnOnce(&mut Callbacks<M>)) -> Self {
		self.try_define(|b| {
			if !b.capabilities.callbacks {
				return Err(DefinitionError::CallbackNotAllowed { phase });
			}
			register(&mut b.definition.callbacks);
			Ok(())
		})
	}

	pub fn after_build<F>(self, callback: F) -> Self
	where
		F: Fn(&mut M) -> Result<(), BoxError> + Send + Sync + 'static,
	{
		self.callback(CallbackPhase::AfterBuild, |c| c.push_after_build(Arc::new(callback)))
	}

	pub fn before_create<F>(self, callback: F) -> Self
	where
		F: Fn(&mut M) -> Result<(), BoxError> + Send + Sync + 'static,
	{
		self.callback(CallbackPhase::BeforeCreate, |c| {
			c.push_before_create(CreateCallback::Record(Arc::new(callback)))
		})
	}

	pub fn after_create<F>(self, callback: F) -> Self
	where
		F: Fn(&mut M) -> Result<(), BoxError> + Send + Sync + 'static,
	{
		self.callback(CallbackPhase::AfterCreate, |c| {
			c.push_after_create(CreateCallback::Record(Arc::new(callback)))
		})
	}

	/// `BeforeCreate` callback that may issue statements through the
	/// connection the record is created with.
	pub fn before_create_with<F>(self, callback: F) -> Self
	where
		F: for<'a> Fn(&'a mut M, &'a DatabaseConnection) -> BoxFuture<'a, Result<(), BoxError>>
			+ Send
			+ Sync
			+ 'static,
	{
		self.callback(CallbackPhase::BeforeCreate, |c| {
			c.push_before_create(CreateCallback::Connection(Arc::new(callback)))
		})
	}

	/// `AfterCreate` counterpart of [`before_create_with`](Self::before_create_with).
	pub fn after_create_with<F>(self, callback: F) -> Self
	where
		F: for<'a> Fn(&'a mut M, &'a DatabaseConnection) -> BoxFuture<'a, Result<(), BoxError>>
			+ Send
			+ Sync
			+ 'static,
	{
		self.callback(CallbackPhase::AfterCreate, |c| {
			c.push_after_create(CreateCallback::Connection(Arc::new(callback)))
		})
	}

	pub fn build(self) -> FactoryResult<Factory<M>> {
		if let Some(error) = self.error {
			return Err(error.into());
		}
		debug!(
			model = self.schema.model_name(),
			table = ?self.table_name,
			fields = self.definition.values.len(),
			traits = self.traits.len(),
			"factory defined"
		);
		Ok(Factory {
			inner: Arc::new(FactoryInner {
				table_name: self.table_name,
				schema: self.schema,
				definition: self.definition,
				traits: self.traits,
				table: OnceCell::new(),
			}),
		})
	}
}
