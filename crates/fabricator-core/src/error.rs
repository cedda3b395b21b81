//! Error types for the factory engine.
//!
//! Definition problems surface as [`DefinitionError`] when a factory is
//! built or a blueprint receives an invalid override. Everything that can
//! go wrong while building or creating a record is a [`FactoryError`].

use fabricator_db::DatabaseError;
use thiserror::Error;

use crate::callback::CallbackPhase;

/// Boxed error returned by user-supplied generators and callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors in a factory definition or in per-call overrides.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
	/// The same field path was given a value twice in one factory.
	#[error("duplicate definition of field {field} in factory of {model}")]
	DuplicateField {
		/// Field path.
		field: String,
		/// Model type name.
		model: &'static str,
	},

	/// The field path does not resolve on the model.
	#[error("invalid field name {field} to define factory of {model}")]
	UnknownField {
		/// Field path.
		field: String,
		/// Model type name.
		model: &'static str,
	},

	/// The value's type cannot be stored in the field.
	#[error(
		"cannot use value (type {actual}) as type {expected} of field {field} to define factory of {model}"
	)]
	TypeMismatch {
		/// Field path.
		field: String,
		/// Declared field type.
		expected: &'static str,
		/// Type of the supplied value.
		actual: &'static str,
		/// Model type name.
		model: &'static str,
	},

	/// A selected trait is not defined on the factory.
	#[error("undefined trait name {name} of type {model} factory")]
	UnknownTrait {
		/// Trait name.
		name: String,
		/// Model type name.
		model: &'static str,
	},

	/// Two traits of one factory share a name.
	#[error("duplicate definition of trait {name} in factory of {model}")]
	DuplicateTrait {
		/// Trait name.
		name: String,
		/// Model type name.
		model: &'static str,
	},

	/// An association was declared inside an association overlay.
	#[error("association {field} error: nested associations isn't allowed")]
	NestedAssociation {
		/// Field path of the rejected association.
		field: String,
	},

	/// A trait was declared inside a trait or an association overlay.
	#[error("trait {name} error: nested traits is not allowed")]
	NestedTrait {
		/// Trait name.
		name: String,
	},

	/// A callback was declared inside an association overlay.
	#[error("{phase} callback is not allowed in associations")]
	CallbackNotAllowed {
		/// Callback phase.
		phase: CallbackPhase,
	},
}

/// Failures while walking a field path on a record.
///
/// Paths are validated when a factory is defined, so these only surface
/// when a record is manipulated directly through its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldPathError {
	#[error("empty field path")]
	Empty,

	#[error("no field {field} on {model}")]
	UnknownField { field: String, model: &'static str },

	#[error("field {field} of {model} is not a record")]
	NotARecord { field: String, model: &'static str },

	#[error("cannot assign value of type {actual} to field {field} of type {expected}")]
	TypeMismatch {
		field: String,
		expected: &'static str,
		actual: &'static str,
	},

	#[error("field {field} of {model} is unset")]
	Unset { field: String, model: &'static str },
}

/// Errors that can occur while building, creating or deleting records.
#[derive(Debug, Error)]
pub enum FactoryError {
	/// Invalid factory definition or override.
	#[error(transparent)]
	Definition(#[from] DefinitionError),

	/// A field path could not be applied to a record.
	#[error(transparent)]
	FieldPath(#[from] FieldPathError),

	/// A lifecycle callback reported failure.
	#[error("{phase} callback failed: {source}")]
	Callback {
		/// Phase whose callback failed.
		phase: CallbackPhase,
		/// Error returned by the callback.
		source: BoxError,
	},

	/// A sequence or dynamic value generator reported failure.
	#[error("failed to generate value of field {field}: {source}")]
	Generator {
		/// Field path being generated.
		field: String,
		/// Error returned by the generator.
		source: BoxError,
	},

	/// The destination of a single build does not hold the factory's model.
	#[error("cannot use target (type {actual}) as type {expected} in build_into")]
	TargetShape {
		/// Accepted destination type.
		expected: &'static str,
		/// Type of the supplied destination.
		actual: &'static str,
	},

	/// The destination of a batch build does not hold the factory's model.
	#[error("cannot use target (type {actual}) as type {expected} in build_slice_into")]
	TargetSliceShape {
		/// Accepted destination type.
		expected: &'static str,
		/// Type of the supplied destination.
		actual: &'static str,
	},

	/// The record passed to delete is not an instance of the factory's model.
	#[error("can't delete type({actual}) instance, want type({expected}) instance")]
	DeleteType {
		/// Type of the supplied record.
		actual: &'static str,
		/// Model type of the factory.
		expected: &'static str,
	},

	/// Persisting requires a table name.
	#[error("factory of {model} has no table")]
	MissingTable {
		/// Model type name.
		model: &'static str,
	},

	/// Deleting requires at least one primary key column.
	#[error("table {table} has no primary key column")]
	MissingPrimaryKey {
		/// Table name.
		table: String,
	},

	/// Statement preparation, execution or scanning failed.
	#[error(transparent)]
	Database(#[from] DatabaseError),
}

/// Result type alias for factory operations.
pub type FactoryResult<T> = Result<T, FactoryError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_unknown_trait_message() {
		let error = DefinitionError::UnknownTrait {
			name: "teenager".to_string(),
			model: "User",
		};
		assert_eq!(
			error.to_string(),
			"undefined trait name teenager of type User factory"
		);
	}

	#[rstest]
	fn test_type_mismatch_message() {
		let error = DefinitionError::TypeMismatch {
			field: "age".to_string(),
			expected: "i32",
			actual: "i64",
			model: "User",
		};
		assert_eq!(
			error.to_string(),
			"cannot use value (type i64) as type i32 of field age to define factory of User"
		);
	}

	#[rstest]
	fn test_delete_type_message() {
		let error = FactoryError::DeleteType {
			actual: "Blog",
			expected: "User",
		};
		assert_eq!(
			error.to_string(),
			"can't delete type(Blog) instance, want type(User) instance"
		);
	}

	#[rstest]
	fn test_callback_error_keeps_source() {
		let error = FactoryError::Callback {
			phase: CallbackPhase::BeforeCreate,
			source: "quota exceeded".into(),
		};
		assert_eq!(error.to_string(), "BeforeCreate callback failed: quota exceeded");
		assert!(std::error::Error::source(&error).is_some());
	}

	#[rstest]
	fn test_database_error_from() {
		let error: FactoryError = DatabaseError::ColumnNotFound("id".to_string()).into();
		assert!(matches!(error, FactoryError::Database(_)));
	}
}
