//! One album: its photos, the calendar, upload and delete dialogs.

use super::{Navigation, UploadRequest, notify_failure, prepare_upload};
use crate::{
    errors::{AlbumError, ValidationError},
    models::{album::Album, notification::Notification, photo::Photo, session::Session},
    services::{
        ports::Filter,
        reconciler::Reconciler,
        upload_pipeline::UploadTargets,
    },
    views::calendar::{Calendar, MonthGrid},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AlbumRender {
    pub album: Album,
    pub photos: Vec<Photo>,
    pub calendar: MonthGrid,
    pub upload_open: bool,
    pub selected: Vec<Uuid>,
    pub notifications: Vec<Notification>,
}

pub struct AlbumView {
    reconciler: Reconciler,
    targets: UploadTargets,
    session: Session,
    album_id: Uuid,
    album: Option<Album>,
    photos: Vec<Photo>,
    calendar: Calendar,
    upload_open: bool,
    selected: BTreeSet<Uuid>,
    notifications: Vec<Notification>,
}

impl AlbumView {
    pub fn new(
        reconciler: Reconciler,
        targets: UploadTargets,
        session: Session,
        album_id: Uuid,
        calendar: Calendar,
    ) -> Self {
        Self {
            reconciler,
            targets,
            session,
            album_id,
            album: None,
            photos: Vec::new(),
            calendar,
            upload_open: false,
            selected: BTreeSet::new(),
            notifications: Vec::new(),
        }
    }

    pub fn album(&self) -> Option<&Album> {
        self.album.as_ref()
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn upload_open(&self) -> bool {
        self.upload_open
    }

    /// Load the album header and its photos.
    pub async fn mount(&mut self) -> Result<(), AlbumError> {
        match self.reconciler.load_album(&self.session, self.album_id).await {
            Ok(album) => self.album = album,
            Err(err) => {
                return Err(notify_failure(
                    &mut self.notifications,
                    "failed to load album",
                    err,
                ));
            }
        }
        self.refresh_photos().await
    }

    /// Replace the photo list with a fresh read; keep it on failure.
    pub async fn refresh_photos(&mut self) -> Result<(), AlbumError> {
        match self
            .reconciler
            .load_photos(&self.session, self.album_id)
            .await
        {
            Ok(photos) => {
                debug!("loaded {} photos for album {}", photos.len(), self.album_id);
                self.photos = photos;
                Ok(())
            }
            Err(err) => Err(notify_failure(
                &mut self.notifications,
                "failed to load photos",
                err,
            )),
        }
    }

    /// Picking a day only opens the upload dialog; the day itself is not
    /// attached to the upload.
    pub fn select_date(&mut self, day: NaiveDate) -> bool {
        let calendar = self.calendar;
        calendar.select(day, |_| self.open_upload())
    }

    pub fn open_upload(&mut self) {
        self.upload_open = true;
    }

    /// Upload into this album, close the dialog and refetch.
    pub async fn upload(&mut self, request: UploadRequest) -> Result<(), AlbumError> {
        self.open_upload();
        let result = match prepare_upload(request) {
            Ok((mut pipeline, caption)) => pipeline
                .submit(
                    &self.targets,
                    Some(&self.session),
                    &caption,
                    Some(self.album_id),
                )
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
        self.upload_open = false;
        self.notifications
            .push(Notification::success("Photo uploaded successfully!"));
        // The photo is stored; a failed refetch only adds an error toast.
        let _ = self.refresh_photos().await;
        Ok(())
    }

    /// Toggle a photo in the delete selection. Ids not on screen are ignored.
    pub fn toggle_selected(&mut self, photo_id: Uuid) {
        if !self.photos.iter().any(|p| p.id == photo_id) {
            return;
        }
        if !self.selected.remove(&photo_id) {
            self.selected.insert(photo_id);
        }
    }

    pub fn selected(&self) -> impl Iterator<Item = &Uuid> {
        self.selected.iter()
    }

    /// Delete every selected photo and its stored object, then refetch.
    pub async fn confirm_delete_selected(&mut self) -> Result<u64, AlbumError> {
        if self.selected.is_empty() {
            return Err(notify_failure(
                &mut self.notifications,
                "nothing to delete",
                ValidationError::EmptySelection.into(),
            ));
        }

        let mut removed = 0;
        let ids: Vec<Uuid> = self.selected.iter().copied().collect();
        for id in ids {
            let filters = [Filter::Id(id), Filter::UserId(self.session.user_id())];
            match self.reconciler.records().delete_photos(&filters).await {
                Ok(count) => {
                    removed += count;
                    self.selected.remove(&id);
                    if count > 0 {
                        self.remove_object_of(id).await;
                    }
                }
                Err(err) => {
                    // Rows removed so far are gone; show what is left.
                    let err = notify_failure(
                        &mut self.notifications,
                        "failed to delete photo",
                        err.into(),
                    );
                    let _ = self.refresh_photos().await;
                    return Err(err);
                }
            }
        }

        info!("deleted {} photos from album {}", removed, self.album_id);
        self.notifications.push(Notification::success(match removed {
            1 => "Deleted 1 photo".to_string(),
            n => format!("Deleted {n} photos"),
        }));
        let _ = self.refresh_photos().await;
        Ok(removed)
    }

    /// Best effort: the row is already gone, so a failure is only logged.
    async fn remove_object_of(&self, photo_id: Uuid) {
        let Some(photo) = self.photos.iter().find(|p| p.id == photo_id) else {
            return;
        };
        let Some(name) = self.targets.objects.object_name(&photo.url) else {
            debug!("photo {} points outside the object store", photo_id);
            return;
        };
        if let Err(err) = self.targets.objects.remove(&name).await {
            warn!("could not remove object {} of photo {}: {}", name, photo_id, err);
        }
    }

    /// Delete the album row and leave the screen. Photos filed under it are
    /// left in place.
    pub async fn delete_album(&mut self) -> Result<Navigation, AlbumError> {
        let filters = [
            Filter::Id(self.album_id),
            Filter::UserId(self.session.user_id()),
        ];
        match self.reconciler.records().delete_albums(&filters).await {
            Ok(0) => {
                debug!("album {} was already gone", self.album_id);
                self.notifications
                    .push(Notification::info("Album no longer exists"));
                Ok(Navigation::to("/"))
            }
            Ok(removed) => {
                info!("deleted album {} ({} rows)", self.album_id, removed);
                self.notifications
                    .push(Notification::success("Album deleted"));
                Ok(Navigation::to("/"))
            }
            Err(err) => Err(notify_failure(
                &mut self.notifications,
                "failed to delete album",
                err.into(),
            )),
        }
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// `None` when the album does not exist for this user.
    pub fn render(&mut self) -> Option<AlbumRender> {
        let album = self.album.clone()?;
        Some(AlbumRender {
            album,
            photos: self.photos.clone(),
            calendar: self.calendar.grid(),
            upload_open: self.upload_open,
            selected: self.selected.iter().copied().collect(),
            notifications: self.take_notifications(),
        })
    }
}
