//! Singer-style catalog
//!
//! `discover` emits one entry per stream with its schema and metadata;
//! `read` accepts the same document back and syncs the streams marked
//! `selected` (falling back to `selected-by-default`).

use super::streams::{StreamDefinition, ALL_STREAMS};
use super::types::JsonSchema;
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata attached to a breadcrumb (`[]` is the stream itself)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(default)]
    pub breadcrumb: Vec<String>,
    #[serde(default)]
    pub metadata: JsonObject,
}

impl MetadataEntry {
    fn new(breadcrumb: Vec<String>, metadata: JsonValue) -> Self {
        let metadata = match metadata {
            JsonValue::Object(map) => map,
            _ => JsonObject::new(),
        };
        Self {
            breadcrumb,
            metadata,
        }
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.metadata.get(key).and_then(JsonValue::as_bool)
    }
}

/// One stream in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub tap_stream_id: String,
    pub stream: String,
    #[serde(default)]
    pub key_properties: Vec<String>,
    pub schema: JsonSchema,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

impl CatalogEntry {
    /// Build the discovery entry for a stream
    pub fn from_definition(def: &StreamDefinition) -> Self {
        let mut metadata = vec![MetadataEntry::new(
            Vec::new(),
            serde_json::json!({
                "inclusion": "available",
                "selected-by-default": true,
                "inclusion-reason": "automatic",
                "table-key-properties": def.key_properties,
            }),
        )];

        for field in &def.fields {
            let inclusion = if def.key_properties.contains(&field.name) {
                "automatic"
            } else {
                "available"
            };
            metadata.push(MetadataEntry::new(
                vec!["properties".to_string(), field.name.clone()],
                serde_json::json!({
                    "inclusion": inclusion,
                    "selected-by-default": true,
                }),
            ));
        }

        Self {
            tap_stream_id: def.id.to_string(),
            stream: def.id.to_string(),
            key_properties: def.key_properties.clone(),
            schema: def.json_schema(),
            metadata,
        }
    }

    fn root_metadata(&self) -> Option<&MetadataEntry> {
        self.metadata.iter().find(|m| m.breadcrumb.is_empty())
    }

    fn root_metadata_mut(&mut self) -> &mut MetadataEntry {
        if let Some(idx) = self.metadata.iter().position(|m| m.breadcrumb.is_empty()) {
            return &mut self.metadata[idx];
        }
        self.metadata
            .insert(0, MetadataEntry::new(Vec::new(), JsonValue::Null));
        &mut self.metadata[0]
    }

    /// Whether the stream should be synced
    pub fn is_selected(&self) -> bool {
        self.root_metadata().is_some_and(|m| {
            m.flag("selected")
                .or_else(|| m.flag("selected-by-default"))
                .unwrap_or(false)
        })
    }

    /// Set the `selected` flag
    pub fn set_selected(&mut self, selected: bool) {
        self.root_metadata_mut()
            .metadata
            .insert("selected".to_string(), JsonValue::Bool(selected));
    }
}

/// Catalog document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// Catalog with every stream the tap knows
    pub fn discover() -> Self {
        Self {
            streams: ALL_STREAMS.iter().map(CatalogEntry::from_definition).collect(),
        }
    }

    /// Load a catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("Failed to read catalog file: {e}")))?;
        Self::from_json(&contents)
    }

    /// Parse a catalog document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("Invalid catalog: {e}")))
    }

    /// Look up an entry
    pub fn get(&self, stream: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|s| s.tap_stream_id == stream)
    }

    /// Select exactly `ids`; unknown ids are an error
    pub fn select<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        for id in ids {
            if self.get(id.as_ref()).is_none() {
                return Err(Error::StreamNotFound {
                    stream: id.as_ref().to_string(),
                });
            }
        }

        for entry in &mut self.streams {
            let selected = ids.iter().any(|id| id.as_ref() == entry.tap_stream_id);
            entry.set_selected(selected);
        }
        Ok(())
    }

    /// Ids of the selected streams, in catalog order. Ids the tap does not
    /// know are rejected.
    pub fn selected_stream_ids(&self) -> Result<Vec<String>> {
        self.streams
            .iter()
            .filter(|entry| entry.is_selected())
            .map(|entry| {
                StreamDefinition::find(&entry.tap_stream_id)
                    .map(|def| def.id.to_string())
                    .ok_or_else(|| Error::StreamNotFound {
                        stream: entry.tap_stream_id.clone(),
                    })
            })
            .collect()
    }

    /// Serialize as pretty JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
