//! The facade prelude is enough to define, build and create records.

use fabricator::prelude::*;
use rstest::rstest;

#[derive(Debug, Clone, Default, PartialEq)]
struct Tag {
	id: Option<i64>,
	label: String,
}

impl Model for Tag {
	fn schema(schema: Schema<Self>) -> Schema<Self> {
		schema
			.column("id", "id,primary", |t| &t.id, |t| &mut t.id)
			.column("label", "", |t| &t.label, |t| &mut t.label)
	}
}

fn tags() -> Factory<Tag> {
	Factory::<Tag>::builder("tag")
		.sequence_field("label", 1, |n| format!("tag-{}", n))
		.with_trait("pinned", |t| t.field("label", "pinned".to_string()))
		.build()
		.unwrap()
}

#[rstest]
fn test_build_through_prelude() {
	let tags = tags();

	let tag = tags.build().unwrap();
	assert_eq!(tag.label, "tag-1");
	assert_eq!(tag.id, None);

	let pinned = tags.blueprint().with_traits(["pinned"]).build().unwrap();
	assert_eq!(pinned.label, "pinned");
}

#[rstest]
#[tokio::test]
async fn test_create_through_prelude() {
	let conn = DatabaseConnection::connect(&DatabaseConfig::sqlite(":memory:"))
		.await
		.unwrap();
	conn.execute(
		"CREATE TABLE tag (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT NOT NULL)",
		vec![],
	)
	.await
	.unwrap();

	let created = tags().create_batch(&conn, 2).await.unwrap();

	assert_eq!(
		created,
		vec![
			Tag {
				id: Some(1),
				label: "tag-1".to_string()
			},
			Tag {
				id: Some(2),
				label: "tag-2".to_string()
			},
		]
	);
}
