//! Screen state for the signed-in user.
//!
//! A view owns its copy of the fetched rows. It is built fresh for each
//! request (or kept alive by the `/events` stream), loads on mount, refetches
//! after each mutation it performs, and turns every failure into an error
//! notification while keeping its last good rows.

pub mod album;
pub mod calendar;
pub mod home;
pub mod slideshow;

use crate::{
    errors::AlbumError,
    models::notification::Notification,
    services::upload_pipeline::{CropRegion, LocalFile, UploadPipeline},
};
use serde::Serialize;

/// Tells the client to leave the current screen.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub navigate_to: String,
}

impl Navigation {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            navigate_to: path.into(),
        }
    }
}

/// Everything the upload dialog sends in one submission.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: Option<LocalFile>,
    pub crop: Option<(CropRegion, f64)>,
    pub caption: String,
}

/// Run select → crop → submit-ready on a fresh pipeline.
fn prepare_upload(request: UploadRequest) -> Result<(UploadPipeline, String), AlbumError> {
    let mut pipeline = UploadPipeline::new();
    if let Some(file) = request.file {
        pipeline.select_file(file)?;
    }
    if let Some((region, zoom)) = request.crop {
        pipeline.set_crop(region, zoom);
    }
    Ok((pipeline, request.caption))
}

/// Record a failed action as a toast and hand the error back.
fn notify_failure(
    notifications: &mut Vec<Notification>,
    context: &str,
    err: AlbumError,
) -> AlbumError {
    tracing::warn!("{}: {}", context, err);
    notifications.push(Notification::error(err.to_string()));
    err
}
