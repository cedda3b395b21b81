//! Delete through a stub backend: statement shape and type checks.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{Blog, User};
use fabricator_core::{Factory, FactoryError};
use fabricator_db::{DatabaseBackend, DatabaseConnection, DatabaseType, QueryResult, QueryValue, Row};
use mockall::mock;
use mockall::predicate::eq;
use rstest::rstest;

mock! {
	Backend {}

	#[async_trait]
	impl DatabaseBackend for Backend {
		fn database_type(&self) -> DatabaseType;
		fn supports_returning(&self) -> bool;
		async fn execute(&self, sql: &str, params: Vec<QueryValue>) -> fabricator_db::Result<QueryResult>;
		async fn fetch_one(&self, sql: &str, params: Vec<QueryValue>) -> fabricator_db::Result<Row>;
		async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> fabricator_db::Result<Option<Row>>;
	}
}

fn users() -> Factory<User> {
	Factory::<User>::builder("user")
		.sequence_field("id", 1, |n| n)
		.build()
		.unwrap()
}

#[rstest]
#[tokio::test]
async fn test_delete_rejects_other_model_without_sql() {
	let mut backend = MockBackend::new();
	backend.expect_database_type().return_const(DatabaseType::Sqlite);
	backend.expect_execute().never();
	let conn = DatabaseConnection::new(Arc::new(backend));

	let err = users().delete(&conn, &Blog::default()).await.unwrap_err();

	assert!(matches!(
		err,
		FactoryError::DeleteType {
			actual: "Blog",
			expected: "User"
		}
	));
	assert_eq!(
		err.to_string(),
		"can't delete type(Blog) instance, want type(User) instance"
	);
}

#[rstest]
#[tokio::test]
async fn test_delete_names_the_boxed_type() {
	let mut backend = MockBackend::new();
	backend.expect_execute().never();
	let conn = DatabaseConnection::new(Arc::new(backend));

	let err = users()
		.delete(&conn, &Box::new(Blog::default()))
		.await
		.unwrap_err();

	assert_eq!(
		err.to_string(),
		"can't delete type(Blog) instance, want type(User) instance"
	);
}

#[rstest]
#[case::postgres(DatabaseType::Postgres, "DELETE FROM user WHERE id=$1")]
#[case::sqlite(DatabaseType::Sqlite, "DELETE FROM user WHERE id=?")]
#[tokio::test]
async fn test_delete_by_primary_key(#[case] db_type: DatabaseType, #[case] sql: &'static str) {
	let mut backend = MockBackend::new();
	backend.expect_database_type().return_const(db_type);
	backend
		.expect_execute()
		.with(eq(sql), eq(vec![QueryValue::Int(7)]))
		.times(1)
		.returning(|_, _| {
			Ok(QueryResult {
				rows_affected: 1,
				last_insert_id: None,
			})
		});
	let conn = DatabaseConnection::new(Arc::new(backend));

	let user = User {
		id: 7,
		..User::default()
	};
	users().delete(&conn, &user).await.unwrap();
}

#[rstest]
#[tokio::test]
async fn test_delete_on_build_only_factory_fails() {
	let mut backend = MockBackend::new();
	backend.expect_execute().never();
	let conn = DatabaseConnection::new(Arc::new(backend));
	let users = Factory::<User>::builder("").build().unwrap();

	let err = users.delete(&conn, &User::default()).await.unwrap_err();

	assert!(matches!(err, FactoryError::MissingTable { model: "User" }));
}
