//! Stream catalog
//!
//! Static definitions of every stream (typed fields, key properties, how the
//! stream is fetched) and the Singer-style catalog built from them.
//!
//! # Streams
//!
//! - **Positional tables**: `team_table`, `tag_table`, `customer_table`,
//!   `first_response_histo`, `resolution_histo`
//! - **Entity reports**: `accounts_table`, `channels_table`, `inboxes_table`,
//!   `tags_table`, `teammates_table`, `teams_table`

mod catalog;
mod streams;
mod types;

pub use catalog::{Catalog, CatalogEntry, MetadataEntry};
pub use streams::{
    stream_ids, EntitySource, FieldDef, FieldType, StreamDefinition, StreamKind, ALL_STREAMS,
};
pub use types::{JsonSchema, JsonType, JsonTypeOrArray, SchemaProperty};
