//! Field-accessor tables for record types.
//!
//! A [`Model`] describes its fields once, as a [`Schema`] of getter and
//! setter functions keyed by field name. The engine addresses fields by
//! dotted path (`"r.author.name"`) and walks the schema segment by
//! segment, allocating unset `Option<Box<_>>` references on the way down.
//!
//! ```ignore
//! #[derive(Debug, Clone, Default)]
//! struct Blog {
//!     id: i64,
//!     title: String,
//!     author_id: i64,
//!     author: Option<Box<User>>,
//! }
//!
//! impl Model for Blog {
//!     fn schema(schema: Schema<Self>) -> Schema<Self> {
//!         schema
//!             .column("id", "id,primary", |b| &b.id, |b| &mut b.id)
//!             .column("title", "", |b| &b.title, |b| &mut b.title)
//!             .column("author_id", "", |b| &b.author_id, |b| &mut b.author_id)
//!             .optional("author", |b| &b.author, |b| &mut b.author)
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use fabricator_db::{ColumnValue, DatabaseError, QueryValue};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::FieldPathError;
use crate::value::{Value, short_type_name};

/// A record type the engine can build.
///
/// `Default` supplies the zero-valued record every build starts from.
pub trait Model: Any + Default + Clone + Send + Sync {
	/// Registers the fields of `Self` on the empty `schema`.
	fn schema(schema: Schema<Self>) -> Schema<Self>;
}

/// Type information about the field at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
	type_id: TypeId,
	type_name: &'static str,
	record_type: Option<TypeId>,
}

impl FieldInfo {
	fn plain<T: Any>() -> Self {
		Self {
			type_id: TypeId::of::<T>(),
			type_name: std::any::type_name::<T>(),
			record_type: None,
		}
	}

	fn record<T: Any, N: Any>() -> Self {
		Self {
			type_id: TypeId::of::<T>(),
			type_name: std::any::type_name::<T>(),
			record_type: Some(TypeId::of::<N>()),
		}
	}

	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Whether the field holds a nested record.
	pub fn is_record(&self) -> bool {
		self.record_type.is_some()
	}

	/// Whether a value of type `type_id` may be assigned to the field.
	///
	/// Record fields also take a bare record of the referenced type.
	pub fn accepts(&self, type_id: TypeId) -> bool {
		self.type_id == type_id || self.record_type == Some(type_id)
	}
}

type GetFn<M> = Arc<dyn Fn(&M) -> Value + Send + Sync>;
type SetFn<M> = Arc<dyn Fn(&mut M, Value) -> Result<(), Value> + Send + Sync>;
type SetPathFn<M> = Arc<dyn Fn(&mut M, &[&str], Value) -> Result<(), FieldPathError> + Send + Sync>;
type GetPathFn<M> = Arc<dyn Fn(&M, &[&str]) -> Result<Value, FieldPathError> + Send + Sync>;
type InfoPathFn = Arc<dyn Fn(&[&str]) -> Option<FieldInfo> + Send + Sync>;

struct NestedAccess<M> {
	set_path: SetPathFn<M>,
	get_path: GetPathFn<M>,
	info_path: InfoPathFn,
}

/// Reads and writes a persisted field as a [`QueryValue`].
pub(crate) struct ColumnAccess<M> {
	pub(crate) tag: &'static str,
	pub(crate) read: Arc<dyn Fn(&M) -> QueryValue + Send + Sync>,
	pub(crate) write: Arc<dyn Fn(&mut M, QueryValue) -> Result<(), DatabaseError> + Send + Sync>,
}

struct FieldAccessor<M> {
	info: FieldInfo,
	get: GetFn<M>,
	set: SetFn<M>,
	nested: Option<NestedAccess<M>>,
	column: Option<ColumnAccess<M>>,
}

/// Ordered table of field accessors for `M`.
pub struct Schema<M> {
	model: &'static str,
	fields: IndexMap<&'static str, FieldAccessor<M>>,
}

impl<M: Model> Schema<M> {
	pub fn new() -> Self {
		Self {
			model: short_type_name::<M>(),
			fields: IndexMap::new(),
		}
	}

	/// Registers a plain field.
	pub fn field<T>(mut self, name: &'static str, get: fn(&M) -> &T, get_mut: fn(&mut M) -> &mut T) -> Self
	where
		T: Any + Clone + Send + Sync,
	{
		self.fields.insert(name, Self::plain_accessor(get, get_mut));
		self
	}

	/// Registers a field that is also a table column.
	///
	/// `tag` follows the `"name[,primary]"` convention; an empty name falls
	/// back to the snake-cased field name. See [`ColumnTag`](crate::table::ColumnTag).
	pub fn column<T>(
		mut self,
		name: &'static str,
		tag: &'static str,
		get: fn(&M) -> &T,
		get_mut: fn(&mut M) -> &mut T,
	) -> Self
	where
		T: ColumnValue + Any + Clone + Send + Sync,
	{
		let mut accessor = Self::plain_accessor(get, get_mut);
		accessor.column = Some(ColumnAccess {
			tag,
			read: Arc::new(move |record: &M| get(record).to_query_value()),
			write: Arc::new(move |record: &mut M, value: QueryValue| -> Result<(), DatabaseError> {
				*get_mut(record) = T::from_query_value(value)?;
				Ok(())
			}),
		});
		self.fields.insert(name, accessor);
		self
	}

	/// Registers a field holding a nested record by value.
	pub fn nested<N: Model>(
		mut self,
		name: &'static str,
		get: fn(&M) -> &N,
		get_mut: fn(&mut M) -> &mut N,
	) -> Self {
		let mut accessor = Self::plain_accessor(get, get_mut);
		accessor.info = FieldInfo::record::<N, N>();
		accessor.nested = Some(NestedAccess {
			set_path: Arc::new(move |record: &mut M, rest: &[&str], value: Value| {
				schema_of::<N>().set_segments(get_mut(record), rest, value)
			}),
			get_path: Arc::new(move |record: &M, rest: &[&str]| {
				schema_of::<N>().get_segments(get(record), rest)
			}),
			info_path: Arc::new(|rest: &[&str]| schema_of::<N>().info_segments(rest)),
		});
		self.fields.insert(name, accessor);
		self
	}

	/// Registers a nilable reference to a nested record.
	///
	/// Setting a path through an unset reference allocates a default `N`
	/// first. The field accepts either an `Option<Box<N>>` or a bare `N`.
	pub fn optional<N: Model>(
		mut self,
		name: &'static str,
		get: fn(&M) -> &Option<Box<N>>,
		get_mut: fn(&mut M) -> &mut Option<Box<N>>,
	) -> Self {
		let model = self.model;
		let accessor = FieldAccessor {
			info: FieldInfo::record::<Option<Box<N>>, N>(),
			get: Arc::new(move |record: &M| Value::new(get(record).clone())),
			set: Arc::new(move |record: &mut M, value: Value| -> Result<(), Value> {
				let slot = get_mut(record);
				match value.downcast::<Option<Box<N>>>() {
					Ok(reference) => *slot = reference,
					Err(value) => *slot = Some(Box::new(value.downcast::<N>()?)),
				}
				Ok(())
			}),
			nested: Some(NestedAccess {
				set_path: Arc::new(move |record: &mut M, rest: &[&str], value: Value| {
					let nested = get_mut(record).get_or_insert_with(|| Box::new(N::default()));
					schema_of::<N>().set_segments(&mut **nested, rest, value)
				}),
				get_path: Arc::new(move |record: &M, rest: &[&str]| match get(record) {
					Some(nested) => schema_of::<N>().get_segments(&**nested, rest),
					None => Err(FieldPathError::Unset {
						field: name.to_string(),
						model,
					}),
				}),
				info_path: Arc::new(|rest: &[&str]| schema_of::<N>().info_segments(rest)),
			}),
			column: None,
		};
		self.fields.insert(name, accessor);
		self
	}

	fn plain_accessor<T>(get: fn(&M) -> &T, get_mut: fn(&mut M) -> &mut T) -> FieldAccessor<M>
	where
		T: Any + Clone + Send + Sync,
	{
		FieldAccessor {
			info: FieldInfo::plain::<T>(),
			get: Arc::new(move |record: &M| Value::new(get(record).clone())),
			set: Arc::new(move |record: &mut M, value: Value| -> Result<(), Value> {
				*get_mut(record) = value.downcast::<T>()?;
				Ok(())
			}),
			nested: None,
			column: None,
		}
	}

	pub fn model_name(&self) -> &'static str {
		self.model
	}

	/// Top-level field names in registration order.
	pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.fields.keys().copied()
	}

	/// Type information for the field at `path`, or `None` if the path
	/// does not resolve.
	pub fn field_info(&self, path: &str) -> Option<FieldInfo> {
		let segments: Vec<&str> = path.split('.').collect();
		self.info_segments(&segments)
	}

	fn info_segments(&self, segments: &[&str]) -> Option<FieldInfo> {
		let (head, rest) = segments.split_first()?;
		let field = self.fields.get(*head)?;
		if rest.is_empty() {
			return Some(field.info);
		}
		(field.nested.as_ref()?.info_path)(rest)
	}

	/// Assigns `value` to the field at `path`, replacing what was there.
	pub fn set(&self, record: &mut M, path: &str, value: Value) -> Result<(), FieldPathError> {
		let segments: Vec<&str> = path.split('.').collect();
		self.set_segments(record, &segments, value)
	}

	fn set_segments(&self, record: &mut M, segments: &[&str], value: Value) -> Result<(), FieldPathError> {
		let (head, rest) = segments.split_first().ok_or(FieldPathError::Empty)?;
		let field = self.lookup(head)?;
		if rest.is_empty() {
			return (field.set)(record, value).map_err(|value| FieldPathError::TypeMismatch {
				field: head.to_string(),
				expected: field.info.type_name,
				actual: value.type_name(),
			});
		}
		let nested = field.nested.as_ref().ok_or_else(|| FieldPathError::NotARecord {
			field: head.to_string(),
			model: self.model,
		})?;
		(nested.set_path)(record, rest, value)
	}

	/// Reads a copy of the field at `path`.
	pub fn get(&self, record: &M, path: &str) -> Result<Value, FieldPathError> {
		let segments: Vec<&str> = path.split('.').collect();
		self.get_segments(record, &segments)
	}

	fn get_segments(&self, record: &M, segments: &[&str]) -> Result<Value, FieldPathError> {
		let (head, rest) = segments.split_first().ok_or(FieldPathError::Empty)?;
		let field = self.lookup(head)?;
		if rest.is_empty() {
			return Ok((field.get)(record));
		}
		let nested = field.nested.as_ref().ok_or_else(|| FieldPathError::NotARecord {
			field: head.to_string(),
			model: self.model,
		})?;
		(nested.get_path)(record, rest)
	}

	fn lookup(&self, name: &str) -> Result<&FieldAccessor<M>, FieldPathError> {
		self.fields.get(name).ok_or_else(|| FieldPathError::UnknownField {
			field: name.to_string(),
			model: self.model,
		})
	}

	/// Persisted fields as `(field index, field name, accessor)`.
	pub(crate) fn columns(&self) -> impl Iterator<Item = (usize, &'static str, &ColumnAccess<M>)> + '_ {
		self.fields
			.iter()
			.enumerate()
			.filter_map(|(index, (name, field))| field.column.as_ref().map(|c| (index, *name, c)))
	}

	pub(crate) fn column_at(&self, index: usize) -> Option<&ColumnAccess<M>> {
		self.fields.get_index(index)?.1.column.as_ref()
	}
}

impl<M: Model> Default for Schema<M> {
	fn default() -> Self {
		Self::new()
	}
}

impl<M> fmt::Debug for Schema<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Schema")
			.field("model", &self.model)
			.field("fields", &self.fields.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Global schema registry, keyed by model type.
static SCHEMAS: Lazy<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

/// Returns the schema of `M`, building it on first use.
///
/// Nested accessors look schemas up lazily through here, so record types
/// may refer to each other recursively.
pub fn schema_of<M: Model>() -> Arc<Schema<M>> {
	let key = TypeId::of::<M>();
	let cached = SCHEMAS.read().get(&key).cloned();
	if let Some(schema) = cached.and_then(|entry| entry.downcast::<Schema<M>>().ok()) {
		return schema;
	}

	let built: Arc<dyn Any + Send + Sync> = Arc::new(M::schema(Schema::new()));
	let entry = SCHEMAS.write().entry(key).or_insert(built).clone();
	match entry.downcast::<Schema<M>>() {
		Ok(schema) => schema,
		Err(_) => unreachable!("schema registry is keyed by TypeId"),
	}
}
