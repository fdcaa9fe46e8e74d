//! Represents an album: a named, user-owned grouping of photos.

use crate::errors::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An album row as held by the record store.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Album {
    /// Unique identifier for this album.
    pub id: Uuid,

    /// Owner of the album. Albums are never shared.
    pub user_id: Uuid,

    /// Display name, trimmed and non-empty.
    pub name: String,

    /// When this album was created.
    pub created_at: DateTime<Utc>,
}

/// An album as rendered in the album grid.
///
/// The cover is derived on every load: the URL of the most recently created
/// photo filed under the album, or `None` while the album is empty.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AlbumCard {
    #[serde(flatten)]
    pub album: Album,
    pub cover_photo_url: Option<String>,
}

/// Validated album name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumName(String);

impl AlbumName {
    /// Trim the raw input and reject it when nothing is left.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyAlbumName);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Insert payload for the `albums` collection.
#[derive(Debug, Clone)]
pub struct NewAlbum {
    pub user_id: Uuid,
    pub name: AlbumName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn blank_names_are_rejected(#[case] raw: &str) {
        assert_eq!(AlbumName::parse(raw), Err(ValidationError::EmptyAlbumName));
    }

    #[test]
    fn names_are_trimmed() {
        let name = AlbumName::parse("  Summer 2024 ").unwrap();
        assert_eq!(name.as_str(), "Summer 2024");
    }
}
