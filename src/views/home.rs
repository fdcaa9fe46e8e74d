//! The album grid, recent-photo slideshow and the create/upload dialogs.

use super::{UploadRequest, notify_failure, prepare_upload};
use crate::{
    errors::AlbumError,
    models::{
        album::{AlbumCard, AlbumName, NewAlbum},
        notification::Notification,
        session::Session,
    },
    services::{
        ports::{AuthNotice, AuthService},
        reconciler::{RECENT_PHOTOS_LIMIT, Reconciler},
        upload_pipeline::UploadTargets,
    },
    views::slideshow::{Slideshow, SlideshowRender},
};
use serde::Serialize;
use tracing::{debug, info, warn};

pub const EMPTY_ALBUMS_MESSAGE: &str = "No albums found.";

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AlbumGrid {
    /// No load has succeeded yet.
    Unavailable,
    Empty { message: &'static str },
    Ready { albums: Vec<AlbumCard> },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HomeRender {
    pub user_email: Option<String>,
    pub albums: AlbumGrid,
    pub slideshow: SlideshowRender,
    pub notifications: Vec<Notification>,
}

/// Whether the view's session survived an auth notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Ended,
}

pub struct HomeView {
    reconciler: Reconciler,
    targets: UploadTargets,
    token: String,
    session: Option<Session>,
    albums: Option<Vec<AlbumCard>>,
    slideshow: Slideshow,
    notifications: Vec<Notification>,
}

impl HomeView {
    pub fn new(reconciler: Reconciler, targets: UploadTargets, session: Session) -> Self {
        Self {
            reconciler,
            targets,
            token: session.token.clone(),
            session: Some(session),
            albums: None,
            slideshow: Slideshow::new(),
            notifications: Vec::new(),
        }
    }

    pub fn albums(&self) -> Option<&[AlbumCard]> {
        self.albums.as_deref()
    }

    pub fn slideshow_mut(&mut self) -> &mut Slideshow {
        &mut self.slideshow
    }

    pub async fn mount(&mut self) {
        let _ = self.refresh().await;
        self.refresh_slideshow().await;
    }

    /// Replace the album list with a fresh read. On failure the previous list
    /// stays and an error toast is queued.
    pub async fn refresh(&mut self) -> Result<(), AlbumError> {
        match self.reconciler.load_albums(self.session.as_ref()).await {
            Ok(cards) => {
                debug!("loaded {} albums", cards.len());
                self.albums = Some(cards);
                Ok(())
            }
            Err(AlbumError::AuthRequired { .. }) if self.session.is_none() => {
                debug!("skipping album refresh without a session");
                Ok(())
            }
            Err(err) => Err(notify_failure(
                &mut self.notifications,
                "failed to load albums",
                err,
            )),
        }
    }

    pub async fn refresh_slideshow(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let result = self
            .reconciler
            .load_recent_photos(session.user_id(), RECENT_PHOTOS_LIMIT)
            .await;
        if let Err(err) = &result {
            warn!("failed to load recent photos: {}", err);
        }
        self.slideshow.load(result);
    }

    pub async fn create_album(&mut self, raw_name: &str) -> Result<(), AlbumError> {
        let result = self.insert_album(raw_name).await;
        if let Err(err) = result {
            return Err(notify_failure(
                &mut self.notifications,
                "failed to create album",
                err,
            ));
        }
        self.notifications
            .push(Notification::success("Album created successfully"));
        // The album exists now; a failed refetch only adds an error toast.
        let _ = self.refresh().await;
        Ok(())
    }

    async fn insert_album(&self, raw_name: &str) -> Result<(), AlbumError> {
        let name = AlbumName::parse(raw_name)?;
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| AlbumError::auth_required("create an album"))?;
        self.reconciler
            .records()
            .insert_album(NewAlbum {
                user_id: session.user_id(),
                name: name.clone(),
            })
            .await?;
        info!("created album `{}` for user {}", name.as_str(), session.user_id());
        Ok(())
    }

    /// Upload an unfiled photo, then refetch.
    pub async fn upload(&mut self, request: UploadRequest) -> Result<(), AlbumError> {
        let result = match prepare_upload(request) {
            Ok((mut pipeline, caption)) => pipeline
                .submit(&self.targets, self.session.as_ref(), &caption, None)
                .await
                .map(|_| ()),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            return Err(notify_failure(
                &mut self.notifications,
                "photo upload failed",
                err,
            ));
        }
        self.notifications
            .push(Notification::success("Photo uploaded successfully!"));
        let _ = self.refresh().await;
        self.refresh_slideshow().await;
        Ok(())
    }

    /// React to a sign-in or sign-out anywhere: re-resolve this view's session
    /// and refetch.
    pub async fn on_auth_notice(
        &mut self,
        auth: &dyn AuthService,
        notice: &AuthNotice,
    ) -> SessionStatus {
        debug!("auth notice {:?}", notice);
        match auth.current_session(&self.token).await {
            Ok(session) => self.session = session,
            Err(err) => {
                let _ = notify_failure(
                    &mut self.notifications,
                    "failed to check session",
                    err.into(),
                );
                return SessionStatus::Active;
            }
        }
        let _ = self.refresh().await;
        if self.session.is_some() {
            SessionStatus::Active
        } else {
            SessionStatus::Ended
        }
    }

    /// Snapshot the view and hand out queued notifications.
    pub fn render(&mut self) -> HomeRender {
        let albums = match &self.albums {
            None => AlbumGrid::Unavailable,
            Some(cards) if cards.is_empty() => AlbumGrid::Empty {
                message: EMPTY_ALBUMS_MESSAGE,
            },
            Some(cards) => AlbumGrid::Ready {
                albums: cards.clone(),
            },
        };
        HomeRender {
            user_email: self.session.as_ref().map(|s| s.user.email.clone()),
            albums,
            slideshow: self.slideshow.render(),
            notifications: std::mem::take(&mut self.notifications),
        }
    }
}
