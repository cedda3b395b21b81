//! Lifecycle callbacks and the order they run in.
//!
//! For each phase, callbacks of the selected traits run first, visiting
//! traits in reverse selection order, followed by the factory's own.
//! The first failure stops the phase and is returned; nothing already
//! applied is rolled back.

use std::fmt;
use std::sync::Arc;

use fabricator_db::DatabaseConnection;
use futures::future::BoxFuture;

use crate::error::{BoxError, FactoryError, FactoryResult};

/// Synchronous callback receiving the in-progress record.
pub type RecordCallback<M> = Arc<dyn Fn(&mut M) -> Result<(), BoxError> + Send + Sync>;

/// Asynchronous callback that may use the connection the record is being
/// created through.
pub type ConnectionCallback<M> = Arc<
	dyn for<'a> Fn(&'a mut M, &'a DatabaseConnection) -> BoxFuture<'a, Result<(), BoxError>>
		+ Send
		+ Sync,
>;

/// Extension points of the build and create paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackPhase {
	/// After every field value is set, on both paths.
	AfterBuild,
	/// After `AfterBuild` on the create path, before the row is written.
	BeforeCreate,
	/// After the row is written and read back.
	AfterCreate,
}

impl fmt::Display for CallbackPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			CallbackPhase::AfterBuild => "AfterBuild",
			CallbackPhase::BeforeCreate => "BeforeCreate",
			CallbackPhase::AfterCreate => "AfterCreate",
		};
		f.write_str(name)
	}
}

pub(crate) enum CreateCallback<M> {
	Record(RecordCallback<M>),
	Connection(ConnectionCallback<M>),
}

impl<M> Clone for CreateCallback<M> {
	fn clone(&self) -> Self {
		match self {
			CreateCallback::Record(cb) => CreateCallback::Record(Arc::clone(cb)),
			CreateCallback::Connection(cb) => CreateCallback::Connection(Arc::clone(cb)),
		}
	}
}

/// Callback lists of one factory or trait, in registration order.
pub(crate) struct Callbacks<M> {
	after_build: Vec<RecordCallback<M>>,
	before_create: Vec<CreateCallback<M>>,
	after_create: Vec<CreateCallback<M>>,
}

impl<M> Callbacks<M> {
	pub(crate) fn new() -> Self {
		Self {
			after_build: Vec::new(),
			before_create: Vec::new(),
			after_create: Vec::new(),
		}
	}

	pub(crate) fn push_after_build(&mut self, callback: RecordCallback<M>) {
		self.after_build.push(callback);
	}

	pub(crate) fn push_before_create(&mut self, callback: CreateCallback<M>) {
		self.before_create.push(callback);
	}

	pub(crate) fn push_after_create(&mut self, callback: CreateCallback<M>) {
		self.after_create.push(callback);
	}

	fn create_phase(&self, phase: CallbackPhase) -> &[CreateCallback<M>] {
		match phase {
			CallbackPhase::AfterBuild => &[],
			CallbackPhase::BeforeCreate => &self.before_create,
			CallbackPhase::AfterCreate => &self.after_create,
		}
	}
}

/// Callback lists of one blueprint, already in execution order.
pub(crate) struct CallbackPipeline<'a, M> {
	stages: Vec<&'a Callbacks<M>>,
}

impl<'a, M> CallbackPipeline<'a, M> {
	/// `traits` is in selection order.
	pub(crate) fn new(factory: &'a Callbacks<M>, traits: &[&'a Callbacks<M>]) -> Self {
		let mut stages: Vec<&'a Callbacks<M>> = traits.iter().rev().copied().collect();
		stages.push(factory);
		Self { stages }
	}

	pub(crate) fn after_build(&self, record: &mut M) -> FactoryResult<()> {
		for callback in self.stages.iter().flat_map(|stage| stage.after_build.iter()) {
			callback(record).map_err(|source| FactoryError::Callback {
				phase: CallbackPhase::AfterBuild,
				source,
			})?;
		}
		Ok(())
	}

	pub(crate) async fn create_phase(
		&self,
		phase: CallbackPhase,
		record: &mut M,
		conn: &DatabaseConnection,
	) -> FactoryResult<()> {
		for stage in &self.stages {
			for callback in stage.create_phase(phase) {
				let result = match callback {
					CreateCallback::Record(cb) => cb(record),
					CreateCallback::Connection(cb) => cb(record, conn).await,
				};
				result.map_err(|source| FactoryError::Callback { phase, source })?;
			}
		}
		Ok(())
	}
}
