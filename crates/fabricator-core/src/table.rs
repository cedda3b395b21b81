//! Table and column mapping derived from schema column tags.
//!
//! Each persisted field carries a tag of the form `"name[,extra...]"`:
//!
//! | tag              | column name            | primary key |
//! |------------------|------------------------|-------------|
//! | `"id,primary"`   | `id`                   | yes         |
//! | `"nick_name"`    | `nick_name`            | no          |
//! | `""` / `","`     | snake case of field    | no          |
//! | `",primary"`     | snake case of field    | yes         |
//! | `",xxx"`         | snake case of field    | no          |

use crate::schema::{Model, Schema};

/// Parsed column tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTag {
	pub name: Option<String>,
	pub primary_key: bool,
}

impl ColumnTag {
	pub fn parse(tag: &str) -> Self {
		let mut parts = tag.split(',').map(str::trim);
		let name = parts.next().filter(|n| !n.is_empty()).map(str::to_string);
		let primary_key = parts.any(|extra| extra.eq_ignore_ascii_case("primary"));
		Self { name, primary_key }
	}
}

/// A mapped column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
	/// Position of the source field in the model's schema.
	pub field_index: usize,
	pub name: String,
	pub primary_key: bool,
}

/// Table a factory's records are persisted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
	pub name: String,
	pub columns: Vec<Column>,
}

impl Table {
	/// Maps the column fields of `schema` onto table `name`.
	///
	/// Only top-level fields registered with [`Schema::column`] are mapped.
	pub fn from_schema<M: Model>(name: impl Into<String>, schema: &Schema<M>) -> Self {
		let columns = schema
			.columns()
			.map(|(field_index, field_name, access)| {
				let tag = ColumnTag::parse(access.tag);
				Column {
					field_index,
					name: tag.name.unwrap_or_else(|| to_snake_case(field_name)),
					primary_key: tag.primary_key,
				}
			})
			.collect();
		Self {
			name: name.into(),
			columns,
		}
	}

	pub fn column_names(&self) -> Vec<&str> {
		self.columns.iter().map(|c| c.name.as_str()).collect()
	}

	pub fn primary_keys(&self) -> Vec<&str> {
		self.primary_columns().map(|c| c.name.as_str()).collect()
	}

	pub fn primary_columns(&self) -> impl Iterator<Item = &Column> {
		self.columns.iter().filter(|c| c.primary_key)
	}
}

/// Convert a field name to snake_case (`FromCountry` -> `from_country`,
/// `HTTPServer` -> `http_server`).
pub fn to_snake_case(name: &str) -> String {
	let chars: Vec<char> = name.chars().collect();
	let mut result = String::with_capacity(name.len() + 4);
	let mut prev_was_separator = true;

	for (i, &ch) in chars.iter().enumerate() {
		if ch == '_' || ch == '-' || ch == ' ' {
			if !prev_was_separator {
				result.push('_');
			}
			prev_was_separator = true;
		} else if ch.is_ascii_uppercase() {
			if !prev_was_separator {
				let prev = chars[i - 1];
				let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
				if prev.is_ascii_lowercase()
					|| prev.is_ascii_digit()
					|| (prev.is_ascii_uppercase() && next_is_lower)
				{
					result.push('_');
				}
			}
			result.push(ch.to_ascii_lowercase());
			prev_was_separator = false;
		} else {
			result.push(ch);
			prev_was_separator = false;
		}
	}

	result
}
