//! Authoritative reads for view state.
//!
//! Views never patch their lists locally. After mounting, after each
//! mutation they perform, and (for the album grid) after each auth change,
//! they call back in here and replace their state with the result. A failed
//! read returns an error and the caller keeps what it had.

use crate::{
    errors::{AlbumError, RemoteResult},
    models::{
        album::{Album, AlbumCard},
        photo::Photo,
        session::Session,
    },
    services::ports::{Filter, RecordStore, Select},
};
use futures::future::try_join_all;
use std::sync::Arc;
use uuid::Uuid;

/// Number of photos the slideshow shows.
pub const RECENT_PHOTOS_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct Reconciler {
    records: Arc<dyn RecordStore>,
}

impl Reconciler {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    /// All albums owned by the session's user, newest first, with covers.
    pub async fn load_albums(&self, session: Option<&Session>) -> Result<Vec<AlbumCard>, AlbumError> {
        let session = session.ok_or_else(|| AlbumError::auth_required("load albums"))?;
        let user_id = session.user_id();
        let albums = self
            .records
            .select_albums(&Select::new().filter(Filter::UserId(user_id)))
            .await?;

        let cards = try_join_all(albums.into_iter().map(|album| self.with_cover(album))).await?;
        Ok(cards)
    }

    async fn with_cover(&self, album: Album) -> RemoteResult<AlbumCard> {
        let latest = self
            .records
            .select_photos(
                &Select::new()
                    .filter(Filter::AlbumId(album.id))
                    .filter(Filter::UserId(album.user_id))
                    .limit(1),
            )
            .await?;
        Ok(AlbumCard {
            cover_photo_url: latest.into_iter().next().map(|photo| photo.url),
            album,
        })
    }

    /// A single album owned by the session's user, if it exists.
    pub async fn load_album(
        &self,
        session: &Session,
        album_id: Uuid,
    ) -> Result<Option<Album>, AlbumError> {
        let rows = self
            .records
            .select_albums(
                &Select::new()
                    .filter(Filter::Id(album_id))
                    .filter(Filter::UserId(session.user_id()))
                    .limit(1),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Photos filed under `album_id`, newest first.
    pub async fn load_photos(
        &self,
        session: &Session,
        album_id: Uuid,
    ) -> Result<Vec<Photo>, AlbumError> {
        let photos = self
            .records
            .select_photos(
                &Select::new()
                    .filter(Filter::AlbumId(album_id))
                    .filter(Filter::UserId(session.user_id())),
            )
            .await?;
        Ok(photos)
    }

    /// The user's `limit` newest photos across every album, unfiled included.
    pub async fn load_recent_photos(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Photo>, AlbumError> {
        let photos = self
            .records
            .select_photos(&Select::new().filter(Filter::UserId(user_id)).limit(limit))
            .await?;
        Ok(photos)
    }
}
