//! JSON Schema types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON Schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Integer,
    Object,
    Null,
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonType::String => write!(f, "string"),
            JsonType::Number => write!(f, "number"),
            JsonType::Integer => write!(f, "integer"),
            JsonType::Object => write!(f, "object"),
            JsonType::Null => write!(f, "null"),
        }
    }
}

/// JSON type can be a single type or array of types (for nullable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonTypeOrArray {
    Single(JsonType),
    Multiple(Vec<JsonType>),
}

impl JsonTypeOrArray {
    /// Create a nullable type
    pub fn nullable(t: JsonType) -> Self {
        if t == JsonType::Null {
            JsonTypeOrArray::Single(JsonType::Null)
        } else {
            JsonTypeOrArray::Multiple(vec![t, JsonType::Null])
        }
    }

    /// Check if this type is nullable
    pub fn is_nullable(&self) -> bool {
        match self {
            JsonTypeOrArray::Single(t) => *t == JsonType::Null,
            JsonTypeOrArray::Multiple(types) => types.contains(&JsonType::Null),
        }
    }
}

/// JSON Schema property definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    /// Property type(s)
    #[serde(rename = "type")]
    pub json_type: JsonTypeOrArray,

    /// Format hint (e.g. "date")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl SchemaProperty {
    /// Create a property with the given type
    pub fn new(json_type: JsonType) -> Self {
        Self {
            json_type: JsonTypeOrArray::Single(json_type),
            format: None,
        }
    }

    /// Create a nullable property
    pub fn nullable(json_type: JsonType) -> Self {
        Self {
            json_type: JsonTypeOrArray::nullable(json_type),
            format: None,
        }
    }

    /// Set format hint
    #[must_use]
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// Check if nullable
    pub fn is_nullable(&self) -> bool {
        self.json_type.is_nullable()
    }
}

/// Top-level schema of a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Schema type (always "object")
    #[serde(rename = "type")]
    pub json_type: JsonType,

    /// Object properties
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaProperty>,

    /// Allow additional properties
    #[serde(rename = "additionalProperties", default)]
    pub additional_properties: bool,
}

impl Default for JsonSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonSchema {
    /// Create a new empty object schema
    pub fn new() -> Self {
        Self {
            json_type: JsonType::Object,
            properties: BTreeMap::new(),
            additional_properties: false,
        }
    }

    /// Add a property
    pub fn add_property(&mut self, name: &str, property: SchemaProperty) {
        self.properties.insert(name.to_string(), property);
    }
}
