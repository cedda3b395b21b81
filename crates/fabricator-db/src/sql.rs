//! Statement generation for single-row insert, select and delete.
//!
//! Statements are rendered as plain strings with driver-appropriate
//! placeholders:
//!
//! ```text
//! INSERT INTO t (a,b) VALUES (?,?)
//! SELECT a,b FROM t WHERE id=?
//! DELETE FROM t WHERE id=$1 AND name=$2
//! ```
//!
//! Positional `$N` placeholders are numbered per bound value, including
//! in WHERE clauses that compare more than one key column.

use crate::types::DatabaseType;

/// Parameter placeholder style of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
	/// `?` for every parameter (SQLite, MySQL).
	Question,
	/// `$1`, `$2`, ... (PostgreSQL).
	Dollar,
}

impl PlaceholderStyle {
	pub fn for_database(db_type: DatabaseType) -> Self {
		match db_type {
			DatabaseType::Postgres => PlaceholderStyle::Dollar,
			DatabaseType::Sqlite | DatabaseType::Mysql => PlaceholderStyle::Question,
		}
	}

	/// Placeholder for the 1-based parameter `index`.
	pub fn placeholder(self, index: usize) -> String {
		match self {
			PlaceholderStyle::Question => "?".to_string(),
			PlaceholderStyle::Dollar => format!("${}", index),
		}
	}
}

/// `INSERT INTO <table> (<cols>) VALUES (<placeholders>)`
pub fn insert_sql(style: PlaceholderStyle, table: &str, columns: &[&str]) -> String {
	let params: Vec<String> = (1..=columns.len()).map(|i| style.placeholder(i)).collect();
	format!(
		"INSERT INTO {} ({}) VALUES ({})",
		table,
		columns.join(","),
		params.join(",")
	)
}

/// Insert statement that hands back the `returning` columns.
pub fn insert_returning_sql(
	style: PlaceholderStyle,
	table: &str,
	columns: &[&str],
	returning: &[&str],
) -> String {
	let insert = if columns.is_empty() {
		format!("INSERT INTO {} DEFAULT VALUES", table)
	} else {
		insert_sql(style, table, columns)
	};
	format!("{} RETURNING {}", insert, returning.join(","))
}

/// `SELECT <cols> FROM <table> WHERE <pk1>=<ph> [AND ...]`
///
/// With no key columns the statement has no WHERE clause at all.
pub fn select_sql(
	style: PlaceholderStyle,
	table: &str,
	select_columns: &[&str],
	key_columns: &[&str],
) -> String {
	join_clause(
		format!("SELECT {} FROM {}", select_columns.join(","), table),
		where_clause(style, key_columns),
	)
}

/// `DELETE FROM <table> WHERE <pk1>=<ph> [AND ...]`
pub fn delete_sql(style: PlaceholderStyle, table: &str, key_columns: &[&str]) -> String {
	join_clause(
		format!("DELETE FROM {}", table),
		where_clause(style, key_columns),
	)
}

/// `WHERE a=? AND b=?`, or an empty string when `columns` is empty.
pub fn where_clause(style: PlaceholderStyle, columns: &[&str]) -> String {
	let conditions: Vec<String> = columns
		.iter()
		.enumerate()
		.map(|(i, column)| format!("{}={}", column, style.placeholder(i + 1)))
		.collect();
	if conditions.is_empty() {
		String::new()
	} else {
		format!("WHERE {}", conditions.join(" AND "))
	}
}

fn join_clause(statement: String, clause: String) -> String {
	if clause.is_empty() {
		statement
	} else {
		format!("{} {}", statement, clause)
	}
}
