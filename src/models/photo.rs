//! Represents a single uploaded photo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A photo row as held by the record store.
///
/// Photos are immutable once created; the only mutation is deletion.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Photo {
    /// Unique identifier for this photo.
    pub id: Uuid,

    /// Owner of the photo.
    pub user_id: Uuid,

    /// Public URL into the object store.
    pub url: String,

    /// Optional caption entered at upload time.
    pub caption: Option<String>,

    /// Album the photo is filed under; `None` means unfiled.
    pub album_id: Option<Uuid>,

    /// When the photo row was written.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the `photos` collection.
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub user_id: Uuid,
    pub url: String,
    pub caption: Option<String>,
    pub album_id: Option<Uuid>,
}
