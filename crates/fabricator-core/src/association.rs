//! Nested records built from another factory.
//!
//! An association fills a record-typed field of the owner with a record
//! produced by the associated factory, then copies a reference value (for
//! instance the generated primary key) from that record into a field of
//! the owner. On the create path the associated record is persisted first,
//! so the copied value is the one the database assigned.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use fabricator_db::DatabaseConnection;

use crate::error::FactoryResult;
use crate::factory::Factory;
use crate::field_value::FieldValue;
use crate::resolve::FieldValues;
use crate::schema::{Model, Schema, schema_of};
use crate::value::Value;

/// A record produced for an association, with its reference value.
#[derive(Debug, Clone)]
pub struct AssociatedRecord {
	pub record: Value,
	pub reference: Value,
}

/// Produces associated records on behalf of an owner factory.
#[async_trait]
pub trait AssociationSource: Send + Sync {
	/// Type name of the produced records.
	fn model_name(&self) -> &'static str;

	/// Builds a record in memory.
	fn build(&self) -> FactoryResult<AssociatedRecord>;

	/// Creates (persists) a record through `conn`.
	async fn create(&self, conn: &DatabaseConnection) -> FactoryResult<AssociatedRecord>;

	/// Rewinds sequences declared with the association itself.
	fn rewind_sequences(&self) {}
}

/// [`AssociationSource`] backed by a factory and the overlay values
/// declared with the association.
pub(crate) struct FactorySource<A: Model> {
	factory: Factory<A>,
	overlay: FieldValues<A>,
	reference_field: String,
}

impl<A: Model> FactorySource<A> {
	pub(crate) fn new(factory: Factory<A>, overlay: FieldValues<A>, reference_field: String) -> Self {
		Self {
			factory,
			overlay,
			reference_field,
		}
	}

	fn associated(&self, record: A) -> FactoryResult<AssociatedRecord> {
		let reference = schema_of::<A>().get(&record, &self.reference_field)?;
		Ok(AssociatedRecord {
			record: Value::new(record),
			reference,
		})
	}
}

#[async_trait]
impl<A: Model> AssociationSource for FactorySource<A> {
	fn model_name(&self) -> &'static str {
		self.factory.model_name()
	}

	fn rewind_sequences(&self) {
		for value in self.overlay.values() {
			if let FieldValue::Sequence(seq) = value {
				seq.sequence().rewind();
			}
		}
	}

	fn build(&self) -> FactoryResult<AssociatedRecord> {
		let record = self.factory.blueprint().with_values(&self.overlay).build()?;
		self.associated(record)
	}

	async fn create(&self, conn: &DatabaseConnection) -> FactoryResult<AssociatedRecord> {
		let record = self
			.factory
			.blueprint()
			.with_values(&self.overlay)
			.create(conn)
			.await?;
		self.associated(record)
	}
}

/// A declared nested-record relationship of an owner factory.
pub struct Association {
	field: String,
	reference_field: String,
	association_reference_field: String,
	source: Arc<dyn AssociationSource>,
}

impl Association {
	pub fn new(
		field: impl Into<String>,
		reference_field: impl Into<String>,
		association_reference_field: impl Into<String>,
		source: Arc<dyn AssociationSource>,
	) -> Self {
		Self {
			field: field.into(),
			reference_field: reference_field.into(),
			association_reference_field: association_reference_field.into(),
			source,
		}
	}

	/// Owner field holding the nested record.
	pub fn field(&self) -> &str {
		&self.field
	}

	/// Owner field receiving the reference value.
	pub fn reference_field(&self) -> &str {
		&self.reference_field
	}

	/// Field of the nested record the reference value is read from.
	pub fn association_reference_field(&self) -> &str {
		&self.association_reference_field
	}

	pub fn source(&self) -> &Arc<dyn AssociationSource> {
		&self.source
	}

	/// Stores `associated` on `owner` and copies its reference value.
	pub fn attach<M: Model>(
		&self,
		schema: &Schema<M>,
		owner: &mut M,
		associated: AssociatedRecord,
	) -> FactoryResult<()> {
		schema.set(owner, &self.field, associated.record)?;
		schema.set(owner, &self.reference_field, associated.reference)?;
		Ok(())
	}
}

impl fmt::Debug for Association {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Association")
			.field("field", &self.field)
			.field("reference_field", &self.reference_field)
			.field("association_reference_field", &self.association_reference_field)
			.field("model", &self.source.model_name())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use mockall::mock;
	use rstest::rstest;

	#[derive(Debug, Clone, Default, PartialEq)]
	struct Author {
		id: i64,
		name: String,
	}

	impl Model for Author {
		fn schema(schema: Schema<Self>) -> Schema<Self> {
			schema
				.field("id", |a| &a.id, |a| &mut a.id)
				.field("name", |a| &a.name, |a| &mut a.name)
		}
	}

	#[derive(Debug, Clone, Default)]
	struct Article {
		author_id: i64,
		author: Option<Box<Author>>,
	}

	impl Model for Article {
		fn schema(schema: Schema<Self>) -> Schema<Self> {
			schema
				.field("author_id", |a| &a.author_id, |a| &mut a.author_id)
				.optional("author", |a| &a.author, |a| &mut a.author)
		}
	}

	mock! {
		Source {}

		#[async_trait]
		impl AssociationSource for Source {
			fn model_name(&self) -> &'static str;
			fn build(&self) -> FactoryResult<AssociatedRecord>;
			async fn create(&self, conn: &DatabaseConnection) -> FactoryResult<AssociatedRecord>;
		}
	}

	#[rstest]
	fn test_attach_sets_record_and_reference() {
		let author = Author {
			id: 7,
			name: "author".to_string(),
		};
		let mut source = MockSource::new();
		let built = author.clone();
		source.expect_build().times(1).returning(move || {
			Ok(AssociatedRecord {
				record: Value::new(built.clone()),
				reference: Value::new(built.id),
			})
		});
		source.expect_model_name().return_const("Author");

		let association = Association::new("author", "author_id", "id", Arc::new(source));
		let mut article = Article::default();
		let associated = association.source().build().unwrap();
		association
			.attach(&schema_of::<Article>(), &mut article, associated)
			.unwrap();

		assert_eq!(article.author_id, 7);
		assert_eq!(article.author.as_deref(), Some(&author));
		assert!(format!("{:?}", association).contains("Author"));
	}

	#[rstest]
	fn test_attach_rejects_mismatched_reference() {
		let association = Association::new(
			"author",
			"author_id",
			"name",
			Arc::new(MockSource::new()),
		);
		let mut article = Article::default();
		let err = association
			.attach(
				&schema_of::<Article>(),
				&mut article,
				AssociatedRecord {
					record: Value::new(Author::default()),
					reference: Value::new("name".to_string()),
				},
			)
			.unwrap_err();
		assert!(matches!(err, crate::error::FactoryError::FieldPath(_)));
	}
}
