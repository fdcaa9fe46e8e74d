//! Turns a user-selected file into a photo row.
//!
//! ```text
//! Idle -> FileSelected -> (Cropping) -> Uploading -> Succeeded | Failed
//! ```
//!
//! The bytes go to the object store first, then a row referencing the public
//! URL goes to the record store. Crop settings are tracked for the preview
//! but the original bytes are what gets uploaded.

use crate::{
    errors::{AlbumError, ValidationError},
    models::{photo::NewPhoto, session::Session},
    services::ports::{ObjectStore, RecordStore},
};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Largest accepted upload, 5 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 3.0;

/// `image/jpg` is not a registered type but browsers still send it.
const ACCEPTED_CONTENT_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// A file as handed over by the browser.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl LocalFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct CropSettings {
    pub region: CropRegion,
    pub zoom: f64,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            region: CropRegion::default(),
            zoom: MIN_ZOOM,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum UploadState {
    Idle,
    FileSelected,
    Cropping,
    Uploading,
    Succeeded,
    Failed(String),
}

/// Where a submitted photo goes.
#[derive(Clone)]
pub struct UploadTargets {
    pub objects: Arc<dyn ObjectStore>,
    pub records: Arc<dyn RecordStore>,
}

pub struct UploadPipeline {
    state: UploadState,
    file: Option<LocalFile>,
    crop: CropSettings,
}

impl Default for UploadPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadPipeline {
    pub fn new() -> Self {
        Self {
            state: UploadState::Idle,
            file: None,
            crop: CropSettings::default(),
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn crop(&self) -> CropSettings {
        self.crop
    }

    /// `data:` URL of the selected file, encoded on each call.
    pub fn preview(&self) -> Option<String> {
        self.file.as_ref().map(|file| {
            format!(
                "data:{};base64,{}",
                file.content_type,
                general_purpose::STANDARD.encode(&file.bytes)
            )
        })
    }

    /// Validate and hold a file. A rejected file leaves the pipeline as it was.
    pub fn select_file(&mut self, file: LocalFile) -> Result<(), ValidationError> {
        validate_file(&file)?;
        self.file = Some(file);
        self.state = UploadState::FileSelected;
        self.crop = CropSettings::default();
        Ok(())
    }

    /// Record crop offset and zoom; zoom is clamped to `[1.0, 3.0]`.
    pub fn set_crop(&mut self, region: CropRegion, zoom: f64) {
        let zoom = if zoom.is_nan() {
            MIN_ZOOM
        } else {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        };
        self.crop = CropSettings { region, zoom };
        if self.state == UploadState::FileSelected {
            self.state = UploadState::Cropping;
        }
    }

    /// Upload the held file and write its photo row.
    ///
    /// On success returns the object name. If the row insert fails after the
    /// upload went through, the object is removed again before the error is
    /// returned. A failed pipeline keeps its file so the user can retry.
    pub async fn submit(
        &mut self,
        targets: &UploadTargets,
        session: Option<&Session>,
        caption: &str,
        album_id: Option<Uuid>,
    ) -> Result<String, AlbumError> {
        let file = match (&self.state, &self.file) {
            (
                UploadState::FileSelected | UploadState::Cropping | UploadState::Failed(_),
                Some(file),
            ) => file.clone(),
            _ => return Err(ValidationError::NoFileSelected.into()),
        };
        let session = session.ok_or_else(|| AlbumError::auth_required("upload photos"))?;

        self.state = UploadState::Uploading;
        match upload(targets, session, &file, caption, album_id).await {
            Ok(object_name) => {
                info!("uploaded photo {} for user {}", object_name, session.user_id());
                self.state = UploadState::Succeeded;
                Ok(object_name)
            }
            Err(err) => {
                warn!("upload of {} failed: {}", file.name, err);
                self.state = UploadState::Failed(err.to_string());
                Err(err)
            }
        }
    }
}

fn validate_file(file: &LocalFile) -> Result<(), ValidationError> {
    let content_type = file.content_type.to_ascii_lowercase();
    if !ACCEPTED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(ValidationError::InvalidFormat(file.content_type.clone()));
    }
    if file.size() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge { size: file.size() });
    }
    Ok(())
}

/// `{user_id}/{unix_millis}-{filename}` with the filename reduced to
/// characters safe in a URL path segment.
pub fn object_name(user_id: Uuid, millis: i64, filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');
    let sanitized = if sanitized.is_empty() { "photo" } else { sanitized };
    format!("{}/{}-{}", user_id, millis, sanitized.replace("..", "_"))
}

async fn upload(
    targets: &UploadTargets,
    session: &Session,
    file: &LocalFile,
    caption: &str,
    album_id: Option<Uuid>,
) -> Result<String, AlbumError> {
    let name = object_name(session.user_id(), Utc::now().timestamp_millis(), &file.name);
    targets
        .objects
        .upload(&name, file.bytes.clone(), &file.content_type)
        .await?;
    let url = targets.objects.public_url(&name);

    let caption = caption.trim();
    let row = NewPhoto {
        user_id: session.user_id(),
        url,
        caption: (!caption.is_empty()).then(|| caption.to_string()),
        album_id,
    };
    if let Err(err) = targets.records.insert_photo(row).await {
        if let Err(cleanup) = targets.objects.remove(&name).await {
            warn!("could not remove orphaned object {}: {}", name, cleanup);
        }
        return Err(err.into());
    }
    Ok(name)
}
