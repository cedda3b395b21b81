//! Merging of factory, trait and per-call values into one value map.

use indexmap::IndexMap;

use crate::field_value::{FieldValue, ProviderKind};

/// Field values keyed by path.
pub(crate) type FieldValues<M> = IndexMap<String, FieldValue<M>>;

/// Effective value map of one build or create call.
///
/// A later layer replaces an earlier entry for the same path whatever the
/// provider kinds involved. Entries keep the position of their first
/// insertion, so values of one kind apply in definition order.
pub(crate) struct ResolvedValues<M> {
	values: FieldValues<M>,
}

impl<M> ResolvedValues<M> {
	pub(crate) fn new() -> Self {
		Self {
			values: IndexMap::new(),
		}
	}

	/// Resolves `base`, then each trait layer in selection order, then the
	/// per-call overrides.
	pub(crate) fn resolve<'a>(
		base: &FieldValues<M>,
		traits: impl IntoIterator<Item = &'a FieldValues<M>>,
		overrides: &FieldValues<M>,
	) -> Self
	where
		M: 'a,
	{
		let mut resolved = Self::new();
		resolved.merge(base);
		for layer in traits {
			resolved.merge(layer);
		}
		resolved.overlay(overrides);
		resolved
	}

	/// Inserts a definition layer grouped by provider kind.
	pub(crate) fn merge(&mut self, layer: &FieldValues<M>) {
		for kind in ProviderKind::MERGE_ORDER {
			for (path, value) in layer.iter().filter(|(_, value)| value.kind() == kind) {
				self.values.insert(path.clone(), value.clone());
			}
		}
	}

	/// Inserts per-call overrides as given.
	pub(crate) fn overlay(&mut self, overrides: &FieldValues<M>) {
		for (path, value) in overrides {
			self.values.insert(path.clone(), value.clone());
		}
	}

	/// Entries driven by `kind`, in map order.
	pub(crate) fn of_kind(&self, kind: ProviderKind) -> impl Iterator<Item = (&str, &FieldValue<M>)> {
		self.values
			.iter()
			.filter(move |(_, value)| value.kind() == kind)
			.map(|(path, value)| (path.as_str(), value))
	}

	pub(crate) fn len(&self) -> usize {
		self.values.len()
	}
}
