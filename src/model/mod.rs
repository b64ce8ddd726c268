//! Model contract
//!
//! The object-model layer (field types, validation, nodes) lives outside this
//! crate. The adapter only needs what is declared here: a name, the declared
//! fields, cleaning to a JSON document, and key bookkeeping.

mod fields;

pub use fields::{FieldDefault, FieldDescriptor, FieldMap, SolrType};

use serde_json::{Map, Value};
use thiserror::Error;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by a model while cleaning its data
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// A required field has no value
    #[error("Field {field} of {model} is required")]
    MissingField { model: String, field: String },

    /// A field value failed validation
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ModelError {
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::MissingField { .. } => "MODEL_MISSING_FIELD",
            ModelError::InvalidValue { .. } => "MODEL_INVALID_VALUE",
        }
    }
}

/// Metadata attached to a save (free-form, recorded in version and activity
/// entries)
pub type SaveMeta = Map<String, Value>;

/// A domain object persisted through the adapter
pub trait Model {
    /// Name used in diagnostics, e.g. in multiple-results errors
    fn model_name(&self) -> &str;

    /// Declared fields
    fn fields(&self) -> Vec<FieldDescriptor>;

    /// Validate and serialize the model into the document to store
    fn clean_value(&self) -> ModelResult<Value>;

    /// Receive the cleaned document back after a save
    fn set_data(&mut self, data: Value);

    fn key(&self) -> Option<&str>;

    /// Receive the key assigned to a newly created record
    fn set_key(&mut self, key: String);

    /// True when the record already exists in the store
    fn exists(&self) -> bool {
        self.key().is_some()
    }

    /// Metadata used when `save` is called without explicit metadata
    fn save_meta_data(&self) -> Option<SaveMeta> {
        None
    }
}

/// Check that every required field in `fields` is present and non-null in
/// `document`
pub fn check_required(model: &str, fields: &FieldMap, document: &Value) -> ModelResult<()> {
    for name in fields.required() {
        match document.get(name) {
            Some(v) if !v.is_null() => {}
            _ => {
                return Err(ModelError::MissingField {
                    model: model.to_string(),
                    field: name.to_string(),
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_required() {
        let fields = FieldMap::new(vec![
            FieldDescriptor::new("name", SolrType::String),
            FieldDescriptor::new("age", SolrType::Int).optional(),
        ]);

        assert!(check_required("Person", &fields, &json!({"name": "john"})).is_ok());

        let err = check_required("Person", &fields, &json!({"name": null})).unwrap_err();
        assert_eq!(err.code(), "MODEL_MISSING_FIELD");
        assert!(err.to_string().contains("Person"));
    }
}
