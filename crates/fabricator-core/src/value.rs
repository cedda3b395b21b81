//! Type-erased field values.

use std::any::{Any, TypeId};
use std::fmt;

trait ErasedValue: Any + Send + Sync {
	fn clone_box(&self) -> Box<dyn ErasedValue>;
	fn as_any(&self) -> &dyn Any;
	fn into_any(self: Box<Self>) -> Box<dyn Any>;
	fn type_name(&self) -> &'static str;
}

impl<T: Any + Clone + Send + Sync> ErasedValue for T {
	fn clone_box(&self) -> Box<dyn ErasedValue> {
		Box::new(self.clone())
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn into_any(self: Box<Self>) -> Box<dyn Any> {
		self
	}

	fn type_name(&self) -> &'static str {
		std::any::type_name::<T>()
	}
}

/// A cloneable value of any field type.
///
/// Static field values, generator output and nested records all travel
/// through the engine as `Value`s and are downcast at the field they are
/// assigned to.
pub struct Value(Box<dyn ErasedValue>);

impl Value {
	pub fn new<T: Any + Clone + Send + Sync>(value: T) -> Self {
		Self(Box::new(value))
	}

	pub fn type_id(&self) -> TypeId {
		self.0.as_any().type_id()
	}

	pub fn type_name(&self) -> &'static str {
		self.0.type_name()
	}

	pub fn is<T: Any>(&self) -> bool {
		self.type_id() == TypeId::of::<T>()
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.0.as_any().downcast_ref::<T>()
	}

	/// Unwraps the value, or hands it back unchanged if it is not a `T`.
	pub fn downcast<T: Any>(self) -> Result<T, Value> {
		if !self.is::<T>() {
			return Err(self);
		}
		match self.0.into_any().downcast::<T>() {
			Ok(value) => Ok(*value),
			Err(_) => unreachable!("type id checked above"),
		}
	}
}

impl Clone for Value {
	fn clone(&self) -> Self {
		Self(self.0.clone_box())
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Value<{}>", self.type_name())
	}
}

/// Last path segment of a type name, for messages.
///
/// A `Box` is named by the type it holds. Other generic types keep their
/// full name.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
	shorten(std::any::type_name::<T>())
}

fn shorten(full: &'static str) -> &'static str {
	if let Some(inner) = full
		.strip_prefix("alloc::boxed::Box<")
		.and_then(|rest| rest.strip_suffix('>'))
	{
		return shorten(inner);
	}
	match full.rfind("::") {
		Some(pos) if !full.contains('<') => &full[pos + 2..],
		_ => full,
	}
}
