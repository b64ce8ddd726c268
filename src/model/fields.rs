//! Field descriptors
//!
//! Each model declares its fields explicitly. The adapter enumerates them once
//! at construction into a [`FieldMap`]; the compiler consults it for the
//! declared search type of a field.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Search-engine type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolrType {
    String,
    Text,
    Int,
    Long,
    Float,
    Boolean,
    /// Calendar date, indexed at midnight
    Date,
    /// Full timestamp
    DateTime,
}

impl SolrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolrType::String => "string",
            SolrType::Text => "text",
            SolrType::Int => "int",
            SolrType::Long => "long",
            SolrType::Float => "float",
            SolrType::Boolean => "boolean",
            SolrType::Date => "date",
            SolrType::DateTime => "datetime",
        }
    }
}

impl fmt::Display for SolrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Default value of a field
#[derive(Clone)]
pub enum FieldDefault {
    None,
    Value(Value),
    /// Produced fresh for every new record (timestamps, generated ids)
    Computed(fn() -> Value),
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::None => write!(f, "None"),
            FieldDefault::Value(v) => write!(f, "Value({})", v),
            FieldDefault::Computed(_) => write!(f, "Computed(..)"),
        }
    }
}

/// Declared metadata of one model field
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub solr_type: SolrType,
    pub default: FieldDefault,
    pub required: bool,
    pub title: String,
}

impl FieldDescriptor {
    /// A required field without a default, titled after its name
    pub fn new(name: impl Into<String>, solr_type: SolrType) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            solr_type,
            default: FieldDefault::None,
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = FieldDefault::Value(value);
        self
    }

    pub fn with_computed_default(mut self, producer: fn() -> Value) -> Self {
        self.default = FieldDefault::Computed(producer);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Resolve the default, evaluating computed defaults
    pub fn default_value(&self) -> Option<Value> {
        match &self.default {
            FieldDefault::None => None,
            FieldDefault::Value(v) => Some(v.clone()),
            FieldDefault::Computed(producer) => Some(producer()),
        }
    }
}

/// Fields of a model, by name
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    fields: BTreeMap<String, FieldDescriptor>,
}

impl FieldMap {
    pub fn new(descriptors: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        Self {
            fields: descriptors
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn solr_type(&self, name: &str) -> Option<SolrType> {
        self.fields.get(name).map(|d| d.solr_type)
    }

    /// Defaults of every field that declares one
    pub fn defaults(&self) -> BTreeMap<String, Value> {
        self.fields
            .iter()
            .filter_map(|(name, d)| d.default_value().map(|v| (name.clone(), v)))
            .collect()
    }

    /// Names of required fields
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.fields
            .values()
            .filter(|d| d.required)
            .map(|d| d.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
