//! Defines the routes for every screen and action of the photo album.
//!
//! ## Structure
//! - **Auth**
//!   - `GET    /auth`: signed-out landing
//!   - `POST   /auth/sign-up`, `/auth/sign-in`, `/auth/sign-out`
//!
//! - **Home**
//!   - `GET    /`: album grid and slideshow
//!   - `POST   /albums`: create album
//!   - `POST   /photos`: upload an unfiled photo
//!   - `GET    /slideshow`: step through recent photos
//!   - `GET    /events`: live album list over server-sent events
//!
//! - **Album**
//!   - `GET    /album/{id}`: album, photos and month calendar
//!   - `DELETE /album/{id}`: delete album, navigate home
//!   - `POST   /album/{id}/photos`: upload into the album
//!   - `POST   /album/{id}/photos/delete`: delete selected photos
//!   - `POST   /album/{id}/calendar/{date}`: pick a day, open upload dialog
//!
//! - `GET /storage/{*name}` serves uploaded payloads. The wildcard allows
//!   nested names like `{user}/{millis}-{file}`.

use crate::{
    handlers::{
        album_handlers::{
            album_detail, create_album, delete_album, delete_photos, home, select_date,
            slideshow, upload_to_album, upload_unfiled,
        },
        auth_handlers::{landing, sign_in, sign_out, sign_up},
        event_handlers::events,
        health_handlers::{healthz, readyz},
        storage_handlers::get_object,
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Request bodies above this are cut off before the upload validator sees
/// them. Kept well above the 5 MiB photo limit. Such uploads answer a plain
/// 413 from the multipart reader rather than the "too large" validation
/// error, and no toast is queued for them.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Build and return the router for the whole application.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // auth
        .route("/auth", get(landing))
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        // home screen
        .route("/", get(home))
        .route("/albums", post(create_album))
        .route("/photos", post(upload_unfiled))
        .route("/slideshow", get(slideshow))
        .route("/events", get(events))
        // album screen
        .route("/album/{id}", get(album_detail).delete(delete_album))
        .route("/album/{id}/photos", post(upload_to_album))
        .route("/album/{id}/photos/delete", post(delete_photos))
        .route("/album/{id}/calendar/{date}", post(select_date))
        // public object URLs
        .route("/storage/{*name}", get(get_object))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
