//! Value providers a field can be driven by.

use std::fmt;
use std::sync::Arc;

use crate::association::Association;
use crate::error::BoxError;
use crate::sequence::Sequence;
use crate::value::Value;

/// Generator fed by a sequence.
pub type SequenceGenerator = Arc<dyn Fn(i64) -> Result<Value, BoxError> + Send + Sync>;

/// Value computed from the record being built.
pub type DynamicGenerator<M> = Arc<dyn Fn(&M) -> Result<Value, BoxError> + Send + Sync>;

/// A sequence paired with the generator turning its numbers into values.
#[derive(Clone)]
pub struct SequenceValue {
	sequence: Arc<Sequence>,
	generator: SequenceGenerator,
}

impl SequenceValue {
	pub fn new(first: i64, generator: SequenceGenerator) -> Self {
		Self {
			sequence: Arc::new(Sequence::new(first)),
			generator,
		}
	}

	pub fn sequence(&self) -> &Arc<Sequence> {
		&self.sequence
	}

	/// Advances the sequence and generates the next value.
	pub fn next_value(&self) -> Result<Value, BoxError> {
		(self.generator)(self.sequence.next())
	}
}

/// Discriminant of [`FieldValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
	Static,
	Sequence,
	Dynamic,
	Association,
}

impl ProviderKind {
	/// Grouping order used when merging definitions.
	pub const MERGE_ORDER: [ProviderKind; 4] = [
		ProviderKind::Static,
		ProviderKind::Sequence,
		ProviderKind::Dynamic,
		ProviderKind::Association,
	];
}

/// Where a field's value comes from.
pub enum FieldValue<M> {
	Static(Value),
	Sequence(SequenceValue),
	Dynamic(DynamicGenerator<M>),
	Association(Arc<Association>),
}

impl<M> FieldValue<M> {
	pub fn kind(&self) -> ProviderKind {
		match self {
			FieldValue::Static(_) => ProviderKind::Static,
			FieldValue::Sequence(_) => ProviderKind::Sequence,
			FieldValue::Dynamic(_) => ProviderKind::Dynamic,
			FieldValue::Association(_) => ProviderKind::Association,
		}
	}
}

impl<M> Clone for FieldValue<M> {
	fn clone(&self) -> Self {
		match self {
			FieldValue::Static(value) => FieldValue::Static(value.clone()),
			FieldValue::Sequence(seq) => FieldValue::Sequence(seq.clone()),
			FieldValue::Dynamic(generator) => FieldValue::Dynamic(Arc::clone(generator)),
			FieldValue::Association(assoc) => FieldValue::Association(Arc::clone(assoc)),
		}
	}
}

impl<M> fmt::Debug for FieldValue<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
			FieldValue::Sequence(seq) => f.debug_tuple("Sequence").field(&seq.sequence.peek()).finish(),
			FieldValue::Dynamic(_) => f.write_str("Dynamic"),
			FieldValue::Association(assoc) => f.debug_tuple("Association").field(assoc).finish(),
		}
	}
}
