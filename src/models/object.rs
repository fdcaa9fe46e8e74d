//! Represents a blob held by the object store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata for a stored object. The payload itself lives on disk.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct StoredObject {
    /// Object name, `{user_id}/{millis}-{filename}` for photo uploads.
    pub name: String,

    /// Content type declared at upload.
    pub content_type: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 checksum of the payload, lowercase hex.
    pub etag: String,

    /// When the object was written.
    pub created_at: DateTime<Utc>,
}
