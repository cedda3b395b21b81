//! Insert, requery and delete of single records.

use fabricator_db::sql::{delete_sql, insert_returning_sql, insert_sql, select_sql};
use fabricator_db::{DatabaseConnection, DatabaseError, QueryValue, Row};
use tracing::{debug, warn};

use crate::error::{FactoryError, FactoryResult};
use crate::schema::{ColumnAccess, Model, Schema};
use crate::table::{Column, Table};

fn access<'s, M: Model>(schema: &'s Schema<M>, column: &Column) -> FactoryResult<&'s ColumnAccess<M>> {
	schema
		.column_at(column.field_index)
		.ok_or_else(|| DatabaseError::ColumnNotFound(column.name.clone()).into())
}

fn read<M: Model>(schema: &Schema<M>, column: &Column, record: &M) -> FactoryResult<QueryValue> {
	Ok((access(schema, column)?.read)(record))
}

fn write<M: Model>(schema: &Schema<M>, column: &Column, record: &mut M, row: &Row) -> FactoryResult<()> {
	let value = row.value(&column.name)?.clone();
	(access(schema, column)?.write)(record, value)?;
	Ok(())
}

fn key_values<M: Model>(schema: &Schema<M>, table: &Table, record: &M) -> FactoryResult<Vec<QueryValue>> {
	table
		.primary_columns()
		.map(|column| read(schema, column, record))
		.collect()
}

/// Writes `record` as a new row of `table`.
///
/// Primary-key columns still NULL on the record are left to the database.
/// Their generated values come back through `RETURNING` when the backend
/// supports it, otherwise through the last insert id (one such column only).
pub(crate) async fn insert<M: Model>(
	conn: &DatabaseConnection,
	table: &Table,
	schema: &Schema<M>,
	record: &mut M,
) -> FactoryResult<()> {
	let style = conn.placeholder_style();

	let mut columns = Vec::with_capacity(table.columns.len());
	let mut params = Vec::with_capacity(table.columns.len());
	let mut generated = Vec::new();
	for column in &table.columns {
		let value = read(schema, column, record)?;
		if column.primary_key && value.is_null() {
			generated.push(column);
		} else {
			columns.push(column.name.as_str());
			params.push(value);
		}
	}

	if generated.is_empty() {
		let sql = insert_sql(style, &table.name, &columns);
		debug!(table = %table.name, args = params.len(), "insert");
		conn.execute(&sql, params).await?;
	} else if conn.supports_returning() {
		let returning: Vec<&str> = generated.iter().map(|c| c.name.as_str()).collect();
		let sql = insert_returning_sql(style, &table.name, &columns, &returning);
		debug!(table = %table.name, args = params.len(), generated = ?returning, "insert returning");
		let row = conn.fetch_one(&sql, params).await?;
		for column in &generated {
			write(schema, column, record, &row)?;
		}
	} else if let [column] = generated.as_slice() {
		let sql = insert_sql(style, &table.name, &columns);
		debug!(table = %table.name, args = params.len(), "insert");
		let result = conn.execute(&sql, params).await?;
		let id = result.last_insert_id.ok_or_else(|| {
			DatabaseError::QueryError(format!(
				"no generated value reported for column {} of {}",
				column.name, table.name
			))
		})?;
		(access(schema, column)?.write)(record, QueryValue::Int(id))?;
	} else {
		return Err(DatabaseError::QueryError(format!(
			"table {} has {} unset primary key columns and the backend cannot return them",
			table.name,
			generated.len()
		))
		.into());
	}
	Ok(())
}

/// Reads the row of `record` back into every mapped field, picking up
/// values assigned or changed by the database.
pub(crate) async fn requery<M: Model>(
	conn: &DatabaseConnection,
	table: &Table,
	schema: &Schema<M>,
	record: &mut M,
) -> FactoryResult<()> {
	let keys = table.primary_keys();
	if keys.is_empty() {
		warn!(table = %table.name, "no primary key column, requery selects without a WHERE clause");
	}
	let sql = select_sql(conn.placeholder_style(), &table.name, &table.column_names(), &keys);
	let params = key_values(schema, table, record)?;
	debug!(table = %table.name, args = params.len(), "requery");

	let row = conn.fetch_one(&sql, params).await?;
	for column in &table.columns {
		write(schema, column, record, &row)?;
	}
	Ok(())
}

/// Deletes the row of `record` by its primary-key values.
pub(crate) async fn delete_record<M: Model>(
	conn: &DatabaseConnection,
	table: &Table,
	schema: &Schema<M>,
	record: &M,
) -> FactoryResult<()> {
	let keys = table.primary_keys();
	if keys.is_empty() {
		return Err(FactoryError::MissingPrimaryKey {
			table: table.name.clone(),
		});
	}
	let sql = delete_sql(conn.placeholder_style(), &table.name, &keys);
	let params = key_values(schema, table, record)?;
	debug!(table = %table.name, args = params.len(), "delete");
	conn.execute(&sql, params).await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::schema_of;
	use async_trait::async_trait;
	use fabricator_db::{DatabaseBackend, DatabaseType, QueryResult};
	use mockall::mock;
	use mockall::predicate::eq;
	use rstest::rstest;
	use std::sync::Arc;

	#[derive(Debug, Clone, Default, PartialEq)]
	struct Item {
		id: Option<i64>,
		label: String,
	}

	impl Model for Item {
		fn schema(schema: Schema<Self>) -> Schema<Self> {
			schema
				.column("id", "id,primary", |i| &i.id, |i| &mut i.id)
				.column("label", "", |i| &i.label, |i| &mut i.label)
		}
	}

	#[derive(Debug, Clone, Default)]
	struct Pair {
		left: i64,
		right: i64,
		note: String,
	}

	impl Model for Pair {
		fn schema(schema: Schema<Self>) -> Schema<Self> {
			schema
				.column("left", "left,primary", |p| &p.left, |p| &mut p.left)
				.column("right", "right,primary", |p| &p.right, |p| &mut p.right)
				.column("note", "", |p| &p.note, |p| &mut p.note)
		}
	}

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

	fn item_row(id: i64, label: &str) -> Row {
		let mut row = Row::new();
		row.insert("id".to_string(), QueryValue::Int(id));
		row.insert("label".to_string(), QueryValue::String(label.to_string()));
		row
	}

	#[rstest]
	#[tokio::test]
	async fn test_insert_uses_last_insert_id_without_returning() {
		let mut backend = MockBackend::new();
		backend.expect_database_type().return_const(DatabaseType::Mysql);
		backend.expect_supports_returning().return_const(false);
		backend
			.expect_execute()
			.with(
				eq("INSERT INTO items (label) VALUES (?)"),
				eq(vec![QueryValue::String("draft".to_string())]),
			)
			.times(1)
			.returning(|_, _| {
				Ok(QueryResult {
					rows_affected: 1,
					last_insert_id: Some(42),
				})
			});
		backend
			.expect_fetch_one()
			.with(
				eq("SELECT id,label FROM items WHERE id=?"),
				eq(vec![QueryValue::Int(42)]),
			)
			.times(1)
			.returning(|_, _| Ok(item_row(42, "stored")));

		let conn = DatabaseConnection::new(Arc::new(backend));
		let schema = schema_of::<Item>();
		let table = Table::from_schema("items", &schema);
		let mut item = Item {
			id: None,
			label: "draft".to_string(),
		};

		insert(&conn, &table, &schema, &mut item).await.unwrap();
		requery(&conn, &table, &schema, &mut item).await.unwrap();

		assert_eq!(item.id, Some(42));
		assert_eq!(item.label, "stored");
	}

	#[rstest]
	#[tokio::test]
	async fn test_insert_with_explicit_key_requeries_by_it() {
		let mut backend = MockBackend::new();
		backend.expect_database_type().return_const(DatabaseType::Postgres);
		backend.expect_supports_returning().return_const(true);
		backend
			.expect_execute()
			.with(
				eq("INSERT INTO items (id,label) VALUES ($1,$2)"),
				eq(vec![QueryValue::Int(3), QueryValue::String("three".to_string())]),
			)
			.times(1)
			.returning(|_, _| Ok(QueryResult::default()));
		backend
			.expect_fetch_one()
			.with(eq("SELECT id,label FROM items WHERE id=$1"), eq(vec![QueryValue::Int(3)]))
			.times(1)
			.returning(|_, _| Ok(item_row(3, "three")));

		let conn = DatabaseConnection::new(Arc::new(backend));
		let schema = schema_of::<Item>();
		let table = Table::from_schema("items", &schema);
		let mut item = Item {
			id: Some(3),
			label: "three".to_string(),
		};

		insert(&conn, &table, &schema, &mut item).await.unwrap();
		requery(&conn, &table, &schema, &mut item).await.unwrap();
		assert_eq!(item.id, Some(3));
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_numbers_composite_key_placeholders() {
		let mut backend = MockBackend::new();
		backend.expect_database_type().return_const(DatabaseType::Postgres);
		backend
			.expect_execute()
			.with(
				eq("DELETE FROM pairs WHERE left=$1 AND right=$2"),
				eq(vec![QueryValue::Int(1), QueryValue::Int(2)]),
			)
			.times(1)
			.returning(|_, _| {
				Ok(QueryResult {
					rows_affected: 1,
					last_insert_id: None,
				})
			});

		let conn = DatabaseConnection::new(Arc::new(backend));
		let schema = schema_of::<Pair>();
		let table = Table::from_schema("pairs", &schema);
		let pair = Pair {
			left: 1,
			right: 2,
			note: String::new(),
		};

		delete_record(&conn, &table, &schema, &pair).await.unwrap();
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_without_primary_key_is_rejected() {
		let mut backend = MockBackend::new();
		backend.expect_execute().never();

		let conn = DatabaseConnection::new(Arc::new(backend));
		let schema = schema_of::<Pair>();
		let table = Table {
			name: "notes".to_string(),
			columns: Vec::new(),
		};

		let err = delete_record(&conn, &table, &schema, &Pair::default())
			.await
			.unwrap_err();
		assert!(matches!(err, FactoryError::MissingPrimaryKey { table } if table == "notes"));
	}
}
