//! Per-call orchestration of build and create.
//!
//! A [`Blueprint`] pairs a [`Factory`] with the traits and field overrides
//! of one call and drives the record through these stages, stopping at the
//! first error:
//!
//! ```text
//! Resolving -> AssociationsApplied -> FieldsApplied -> AfterBuildRun
//!     [-> BeforeCreateRun -> Persisted -> Requeried -> AfterCreateRun] -> Done
//! ```
//!
//! The bracketed stages run on the create path only.

use std::any::{Any, TypeId};
use std::sync::Arc;

use fabricator_db::DatabaseConnection;
use tracing::trace;

use crate::association::Association;
use crate::callback::{CallbackPhase, CallbackPipeline, Callbacks};
use crate::error::{DefinitionError, FactoryError, FactoryResult};
use crate::factory::{Definition, Factory, check_field};
use crate::field_value::{FieldValue, ProviderKind};
use crate::persistence;
use crate::resolve::{FieldValues, ResolvedValues};
use crate::schema::{Model, Schema};
use crate::value::{Value, short_type_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
	Resolving,
	AssociationsApplied,
	FieldsApplied,
	AfterBuildRun,
	BeforeCreateRun,
	Persisted,
	Requeried,
	AfterCreateRun,
	Done,
}

/// One build or create call: a factory, the selected traits and the
/// per-call field overrides.
pub struct Blueprint<M> {
	factory: Factory<M>,
	traits: Vec<String>,
	overrides: FieldValues<M>,
	error: Option<DefinitionError>,
}

impl<M: Model> Blueprint<M> {
	pub(crate) fn new(factory: Factory<M>) -> Self {
		Self {
			factory,
			traits: Vec::new(),
			overrides: FieldValues::new(),
			error: None,
		}
	}

	/// Selects traits, applied in the given order after the factory's own
	/// values. A name the factory does not define fails the call.
	pub fn with_traits<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		for name in names {
			let name = name.into();
			if self.error.is_none() && self.factory.trait_definition(&name).is_none() {
				self.error = Some(DefinitionError::UnknownTrait {
					name: name.clone(),
					model: self.factory.model_name(),
				});
			}
			self.traits.push(name);
		}
		self
	}

	/// Overrides the field at `path` for this call only, whatever provides
	/// it in the factory or the selected traits.
	pub fn with_field<T>(mut self, path: &str, value: T) -> Self
	where
		T: Any + Clone + Send + Sync,
	{
		if self.error.is_none() {
			let checked = check_field(
				self.factory.schema(),
				path,
				TypeId::of::<T>(),
				short_type_name::<T>(),
			);
			match checked {
				Ok(_) => {
					self.overrides
						.insert(path.to_string(), FieldValue::Static(Value::new(value)));
				}
				Err(error) => self.error = Some(error),
			}
		}
		self
	}

	/// Adds already validated overrides.
	pub(crate) fn with_values(mut self, values: &FieldValues<M>) -> Self {
		for (path, value) in values {
			self.overrides.insert(path.clone(), value.clone());
		}
		self
	}

	fn ready(&self) -> FactoryResult<()> {
		match &self.error {
			Some(error) => Err(error.clone().into()),
			None => Ok(()),
		}
	}

	fn stage(&self, stage: Stage) {
		trace!(model = self.factory.model_name(), ?stage, "blueprint");
	}

	fn resolve(&self) -> (ResolvedValues<M>, CallbackPipeline<'_, M>) {
		self.stage(Stage::Resolving);
		let factory = self.factory.definition();
		let traits: Vec<&Definition<M>> = self
			.traits
			.iter()
			.filter_map(|name| self.factory.trait_definition(name))
			.collect();

		let resolved = ResolvedValues::resolve(
			&factory.values,
			traits.iter().map(|&definition| &definition.values),
			&self.overrides,
		);
		let trait_callbacks: Vec<&Callbacks<M>> =
			traits.iter().map(|&definition| &definition.callbacks).collect();
		let pipeline = CallbackPipeline::new(&factory.callbacks, &trait_callbacks);
		trace!(
			model = self.factory.model_name(),
			traits = ?self.traits,
			values = resolved.len(),
			"resolved"
		);
		(resolved, pipeline)
	}

	/// Builds one record in memory. Associated records are built, not
	/// created.
	pub fn build(&self) -> FactoryResult<M> {
		self.ready()?;
		let schema = self.factory.schema();
		let (resolved, callbacks) = self.resolve();
		let mut record = M::default();

		for association in associations(&resolved) {
			let associated = association.source().build()?;
			association.attach(schema, &mut record, associated)?;
		}
		self.stage(Stage::AssociationsApplied);

		apply_fields(schema, &mut record, &resolved)?;
		self.stage(Stage::FieldsApplied);

		callbacks.after_build(&mut record)?;
		self.stage(Stage::AfterBuildRun);

		self.stage(Stage::Done);
		Ok(record)
	}

	/// Builds `count` records; zero yields an empty vector.
	pub fn build_batch(&self, count: usize) -> FactoryResult<Vec<M>> {
		(0..count).map(|_| self.build()).collect()
	}

	/// Builds a record into `target`, which must be an `M` or a `Box<M>`.
	pub fn build_into<T: Any>(&self, target: &mut T) -> FactoryResult<()> {
		check_target::<M, T>()?;
		place(target, self.build()?)
	}

	/// Replaces the contents of `target`, a `Vec<M>` or `Vec<Box<M>>`, with
	/// `count` built records.
	pub fn build_slice_into<T: Any>(&self, target: &mut T, count: usize) -> FactoryResult<()> {
		check_slice_target::<M, T>()?;
		place_all(target, self.build_batch(count)?)
	}

	/// Builds one record and persists it through `conn`.
	///
	/// Associated records are created first so that database-assigned
	/// reference values reach the owner. After the insert the row is read
	/// back into the record.
	pub async fn create(&self, conn: &DatabaseConnection) -> FactoryResult<M> {
		self.ready()?;
		let table = self.factory.table()?;
		let schema = self.factory.schema();
		let (resolved, callbacks) = self.resolve();
		let mut record = M::default();

		let pending: Vec<Arc<Association>> = associations(&resolved).cloned().collect();
		for association in pending {
			let associated = association.source().create(conn).await?;
			association.attach(schema, &mut record, associated)?;
		}
		self.stage(Stage::AssociationsApplied);

		apply_fields(schema, &mut record, &resolved)?;
		self.stage(Stage::FieldsApplied);

		callbacks.after_build(&mut record)?;
		self.stage(Stage::AfterBuildRun);

		callbacks
			.create_phase(CallbackPhase::BeforeCreate, &mut record, conn)
			.await?;
		self.stage(Stage::BeforeCreateRun);

		persistence::insert(conn, table, schema, &mut record).await?;
		self.stage(Stage::Persisted);

		persistence::requery(conn, table, schema, &mut record).await?;
		self.stage(Stage::Requeried);

		callbacks
			.create_phase(CallbackPhase::AfterCreate, &mut record, conn)
			.await?;
		self.stage(Stage::AfterCreateRun);

		self.stage(Stage::Done);
		Ok(record)
	}

	/// Creates `count` records one after another.
	pub async fn create_batch(&self, conn: &DatabaseConnection, count: usize) -> FactoryResult<Vec<M>> {
		let mut records = Vec::with_capacity(count);
		for _ in 0..count {
			records.push(self.create(conn).await?);
		}
		Ok(records)
	}

	/// [`create`](Self::create) counterpart of [`build_into`](Self::build_into).
	pub async fn create_into<T: Any + Send>(
		&self,
		conn: &DatabaseConnection,
		target: &mut T,
	) -> FactoryResult<()> {
		check_target::<M, T>()?;
		let record = self.create(conn).await?;
		place(target, record)
	}

	/// [`create_batch`](Self::create_batch) counterpart of
	/// [`build_slice_into`](Self::build_slice_into).
	pub async fn create_slice_into<T: Any + Send>(
		&self,
		conn: &DatabaseConnection,
		target: &mut T,
		count: usize,
	) -> FactoryResult<()> {
		check_slice_target::<M, T>()?;
		let records = self.create_batch(conn, count).await?;
		place_all(target, records)
	}
}

fn associations<M>(resolved: &ResolvedValues<M>) -> impl Iterator<Item = &Arc<Association>> {
	resolved
		.of_kind(ProviderKind::Association)
		.filter_map(|(_, value)| match value {
			FieldValue::Association(association) => Some(association),
			_ => None,
		})
}

/// Applies static, then sequence, then dynamic values. Dynamic values see
/// everything set before them.
fn apply_fields<M: Model>(
	schema: &Schema<M>,
	record: &mut M,
	resolved: &ResolvedValues<M>,
) -> FactoryResult<()> {
	for kind in [ProviderKind::Static, ProviderKind::Sequence, ProviderKind::Dynamic] {
		for (path, value) in resolved.of_kind(kind) {
			let value = match value {
				FieldValue::Static(value) => value.clone(),
				FieldValue::Sequence(seq) => seq.next_value().map_err(|source| FactoryError::Generator {
					field: path.to_string(),
					source,
				})?,
				FieldValue::Dynamic(compute) => compute(&*record).map_err(|source| FactoryError::Generator {
					field: path.to_string(),
					source,
				})?,
				FieldValue::Association(_) => continue,
			};
			schema.set(record, path, value)?;
		}
	}
	Ok(())
}

fn check_target<M: Model, T: Any>() -> FactoryResult<()> {
	let target = TypeId::of::<T>();
	if target == TypeId::of::<M>() || target == TypeId::of::<Box<M>>() {
		Ok(())
	} else {
		Err(FactoryError::TargetShape {
			expected: short_type_name::<M>(),
			actual: std::any::type_name::<T>(),
		})
	}
}

fn check_slice_target<M: Model, T: Any>() -> FactoryResult<()> {
	let target = TypeId::of::<T>();
	if target == TypeId::of::<Vec<M>>() || target == TypeId::of::<Vec<Box<M>>>() {
		Ok(())
	} else {
		Err(FactoryError::TargetSliceShape {
			expected: short_type_name::<M>(),
			actual: std::any::type_name::<T>(),
		})
	}
}

fn place<M: Model, T: Any>(target: &mut T, record: M) -> FactoryResult<()> {
	let target: &mut dyn Any = target;
	if let Some(slot) = target.downcast_mut::<M>() {
		*slot = record;
	} else if let Some(slot) = target.downcast_mut::<Box<M>>() {
		*slot = Box::new(record);
	} else {
		return Err(FactoryError::TargetShape {
			expected: short_type_name::<M>(),
			actual: std::any::type_name::<T>(),
		});
	}
	Ok(())
}

fn place_all<M: Model, T: Any>(target: &mut T, records: Vec<M>) -> FactoryResult<()> {
	let target: &mut dyn Any = target;
	if let Some(slot) = target.downcast_mut::<Vec<M>>() {
		*slot = records;
	} else if let Some(slot) = target.downcast_mut::<Vec<Box<M>>>() {
		*slot = records.into_iter().map(Box::new).collect();
	} else {
		return Err(FactoryError::TargetSliceShape {
			expected: short_type_name::<M>(),
			actual: std::any::type_name::<T>(),
		});
	}
	Ok(())
}
