//! Endpoint wrappers.
//!
//! One thin method per API operation, statically attached to
//! [`Connection`](crate::Connection) as `impl` blocks. Each wrapper is a pure
//! translation of its arguments into path segments, a method, and
//! query/payload shaping, delegating entirely to
//! [`Connection::request`](crate::Connection::request); none of them carries
//! independent error handling.

mod files;
mod folders;
mod models;
mod users;

pub use models::{File, Folder, ItemCollection, ItemEntry, ItemReference, User};

use crate::connection::RequestOptions;
use crate::error::{ConnectionError, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;

/// Standard `fields`/`limit`/`offset` listing options accepted by several
/// collection endpoints.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Comma-separated attribute list to return for each entry
    pub fields: Option<String>,
    /// Maximum number of entries to return
    pub limit: Option<u32>,
    /// Zero-based offset into the collection
    pub offset: Option<u32>,
}

impl ListOptions {
    pub(crate) fn apply(&self, mut options: RequestOptions) -> RequestOptions {
        if let Some(fields) = &self.fields {
            options = options.query("fields", fields.clone());
        }
        if let Some(limit) = self.limit {
            options = options.query("limit", limit.to_string());
        }
        if let Some(offset) = self.offset {
            options = options.query("offset", offset.to_string());
        }
        options
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| ConnectionError::Parse(format!("Failed to decode API response: {}", e)))
}
