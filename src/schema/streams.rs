//! Stream definitions
//!
//! Every stream the tap can sync, with its typed field list and key
//! properties. Positional streams derive their fields from the normalizer
//! layouts; entity report streams share one field list.

use super::types::{JsonSchema, JsonType, SchemaProperty};
use crate::normalize::{normalize_fieldname, PositionalLayout, POSITIONAL_LAYOUTS};
use crate::report::REPORT_METRICS;
use std::sync::LazyLock;

/// Declared type of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
}

impl FieldType {
    fn json_type(self) -> JsonType {
        match self {
            FieldType::String => JsonType::String,
            FieldType::Integer => JsonType::Integer,
            FieldType::Number => JsonType::Number,
        }
    }
}

/// A named, typed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub format: Option<&'static str>,
}

impl FieldDef {
    fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            format: None,
        }
    }

    fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            nullable: true,
            ..Self::required(name, field_type)
        }
    }

    #[must_use]
    fn with_format(mut self, format: &'static str) -> Self {
        self.format = Some(format);
        self
    }

    /// JSON Schema property for this field
    pub fn to_property(&self) -> SchemaProperty {
        let property = if self.nullable {
            SchemaProperty::nullable(self.field_type.json_type())
        } else {
            SchemaProperty::new(self.field_type.json_type())
        };
        match self.format {
            Some(format) => property.with_format(format),
            None => property,
        }
    }
}

/// Where an entity report stream gets its entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySource {
    /// Listing endpoint
    pub path: &'static str,
    /// Report filter name
    pub filter: &'static str,
    /// Field used as `metric_description`
    pub description_key: &'static str,
}

/// How a stream is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// `GET /analytics` table normalized by position
    Positional(&'static PositionalLayout),
    /// One `POST /analytics/reports` per entity and window
    EntityReport(EntitySource),
}

/// A stream the tap can sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDefinition {
    pub id: &'static str,
    pub kind: StreamKind,
    pub fields: Vec<FieldDef>,
    pub key_properties: Vec<String>,
}

const ENTITY_SOURCES: [(&str, EntitySource); 6] = [
    (
        "accounts_table",
        EntitySource {
            path: "/accounts",
            filter: "account_ids",
            description_key: "name",
        },
    ),
    (
        "channels_table",
        EntitySource {
            path: "/channels",
            filter: "channel_ids",
            description_key: "name",
        },
    ),
    (
        "inboxes_table",
        EntitySource {
            path: "/inboxes",
            filter: "inbox_ids",
            description_key: "name",
        },
    ),
    (
        "tags_table",
        EntitySource {
            path: "/tags",
            filter: "tag_ids",
            description_key: "name",
        },
    ),
    (
        "teammates_table",
        EntitySource {
            path: "/teammates",
            filter: "teammate_ids",
            description_key: "email",
        },
    ),
    (
        "teams_table",
        EntitySource {
            path: "/teams",
            filter: "team_ids",
            description_key: "name",
        },
    ),
];

/// Every stream, positional first
pub static ALL_STREAMS: LazyLock<Vec<StreamDefinition>> = LazyLock::new(|| {
    POSITIONAL_LAYOUTS
        .into_iter()
        .map(StreamDefinition::positional)
        .chain(
            ENTITY_SOURCES
                .into_iter()
                .map(|(id, source)| StreamDefinition::entity_report(id, source)),
        )
        .collect()
});

fn window_fields() -> [FieldDef; 2] {
    [
        FieldDef::required("analytics_date", FieldType::String).with_format("date"),
        FieldDef::required("analytics_range", FieldType::String),
    ]
}

impl StreamDefinition {
    fn positional(layout: &'static PositionalLayout) -> Self {
        let dim = layout.dimension;
        let mut fields = window_fields().to_vec();
        fields.push(FieldDef::required(layout.key_field(), FieldType::String));
        fields.push(FieldDef::optional(format!("{dim}_url"), FieldType::String));
        fields.push(FieldDef::optional(format!("{dim}_id"), FieldType::Integer));

        for metric in layout.metrics {
            fields.push(FieldDef::optional(format!("{metric}_v"), FieldType::Number));
            fields.push(FieldDef::optional(format!("{metric}_p"), FieldType::Number));
        }

        Self {
            id: layout.stream,
            kind: StreamKind::Positional(layout),
            fields,
            key_properties: vec![
                "analytics_date".to_string(),
                "analytics_range".to_string(),
                layout.key_field(),
            ],
        }
    }

    fn entity_report(id: &'static str, source: EntitySource) -> Self {
        let mut fields = window_fields().to_vec();
        fields.push(FieldDef::required("report_id", FieldType::String));
        fields.push(FieldDef::required("metric_id", FieldType::String));
        fields.push(FieldDef::optional("metric_description", FieldType::String));
        fields.extend(
            REPORT_METRICS
                .iter()
                .map(|m| FieldDef::optional(normalize_fieldname(m), FieldType::Number)),
        );

        Self {
            id,
            kind: StreamKind::EntityReport(source),
            fields,
            key_properties: ["analytics_date", "analytics_range", "report_id", "metric_id"]
                .map(String::from)
                .to_vec(),
        }
    }

    /// Look up a stream by id
    pub fn find(id: &str) -> Option<&'static StreamDefinition> {
        ALL_STREAMS.iter().find(|s| s.id == id)
    }

    /// Declared field names, in order
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Look up a declared field
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// JSON Schema describing the stream's records
    pub fn json_schema(&self) -> JsonSchema {
        let mut schema = JsonSchema::new();
        for field in &self.fields {
            schema.add_property(&field.name, field.to_property());
        }
        schema
    }
}

/// Ids of every stream
pub fn stream_ids() -> Vec<&'static str> {
    ALL_STREAMS.iter().map(|s| s.id).collect()
}
