//! Typed response models for the wrapped endpoints.
//!
//! Only the attributes the connector consumes are modeled; everything else in
//! a response is ignored during deserialization. Timestamps stay as the
//! RFC 3339 strings the API returns.

use serde::Deserialize;

/// Reference to a related item, as embedded in `parent` attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemReference {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A file or folder entry as it appears in listings.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub sequence_id: Option<String>,
}

/// A paged collection of items.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemCollection {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub entries: Vec<ItemEntry>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Folder metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Folder {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub parent: Option<ItemReference>,
    #[serde(default)]
    pub item_collection: Option<ItemCollection>,
}

/// File metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub parent: Option<ItemReference>,
}

/// Account metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub space_amount: Option<u64>,
    #[serde(default)]
    pub space_used: Option<u64>,
    #[serde(default)]
    pub max_upload_size: Option<u64>,
}
