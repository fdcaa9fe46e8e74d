//! Handlers for the home screen and the album screen.
//!
//! Each handler builds a fresh view for the caller's session, mounts it,
//! applies the user action and answers with the rendered view. Failed
//! actions answer with the error status and the toast message.

use crate::{
    errors::{AlbumError, AppError},
    handlers::session::MaybeSession,
    models::{notification::Notification, session::Session},
    services::{
        reconciler::RECENT_PHOTOS_LIMIT,
        upload_pipeline::{CropRegion, LocalFile},
    },
    state::AppState,
    views::{
        Navigation, UploadRequest,
        album::{AlbumRender, AlbumView},
        calendar::Calendar,
        home::HomeView,
        slideshow::{Slideshow, SlideshowRender, Step},
    },
};
use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::{Field, MultipartError},
    },
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    /// Slideshow position to render.
    pub slide: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SlideshowQuery {
    pub index: Option<usize>,
    pub step: Option<StepParam>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepParam {
    Next,
    Previous,
}

#[derive(Debug, Deserialize)]
pub struct AlbumQuery {
    /// `YYYY-MM`; defaults to the current month.
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAlbumReq {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeletePhotosReq {
    pub ids: Vec<Uuid>,
}

#[derive(Serialize)]
pub struct DeleteAlbumResp {
    #[serde(flatten)]
    pub navigation: Navigation,
    pub notifications: Vec<Notification>,
}

fn sign_in_redirect() -> Response {
    Redirect::to("/auth").into_response()
}

fn calendar_for(month: Option<&str>) -> Result<Calendar, AppError> {
    match month {
        None => Ok(Calendar::new(Utc::now().date_naive())),
        Some(raw) => Calendar::from_month(raw)
            .ok_or_else(|| AppError::bad_request(format!("invalid month `{}`", raw))),
    }
}

/// `GET /`
pub async fn home(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Query(q): Query<HomeQuery>,
) -> Response {
    let Some(session) = session else {
        return sign_in_redirect();
    };
    let mut view = HomeView::new(state.reconciler(), state.upload_targets(), session);
    view.mount().await;
    if let Some(slide) = q.slide {
        view.slideshow_mut().seek(slide);
    }
    Json(view.render()).into_response()
}

/// `POST /albums`
pub async fn create_album(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Json(req): Json<CreateAlbumReq>,
) -> Result<impl IntoResponse, AppError> {
    let session = session.ok_or_else(|| AlbumError::auth_required("create an album"))?;
    let mut view = HomeView::new(state.reconciler(), state.upload_targets(), session);
    view.create_album(&req.name).await?;
    view.refresh_slideshow().await;
    Ok((StatusCode::CREATED, Json(view.render())))
}

/// `POST /photos`: upload from the home screen, not filed in any album.
pub async fn upload_unfiled(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let session = session.ok_or_else(|| AlbumError::auth_required("upload photos"))?;
    let request = read_upload(multipart).await?;
    let mut view = HomeView::new(state.reconciler(), state.upload_targets(), session);
    view.upload(request).await?;
    Ok((StatusCode::CREATED, Json(view.render())))
}

/// `GET /slideshow?index=&step=`
pub async fn slideshow(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Query(q): Query<SlideshowQuery>,
) -> Result<Json<SlideshowRender>, AppError> {
    let session = session.ok_or_else(|| AlbumError::auth_required("view photos"))?;
    let mut show = Slideshow::new();
    show.load(
        state
            .reconciler()
            .load_recent_photos(session.user_id(), RECENT_PHOTOS_LIMIT)
            .await,
    );
    show.seek(q.index.unwrap_or(0));
    match q.step {
        Some(StepParam::Next) => show.step(Step::Next),
        Some(StepParam::Previous) => show.step(Step::Previous),
        None => {}
    }
    Ok(Json(show.render()))
}

async fn mounted_album(
    state: &AppState,
    session: Session,
    album_id: Uuid,
    calendar: Calendar,
) -> Result<AlbumView, AppError> {
    let mut view = AlbumView::new(
        state.reconciler(),
        state.upload_targets(),
        session,
        album_id,
        calendar,
    );
    view.mount().await?;
    if view.album().is_none() {
        return Err(AppError::not_found(format!("album {} not found", album_id)));
    }
    Ok(view)
}

fn rendered(mut view: AlbumView) -> Result<Json<AlbumRender>, AppError> {
    view.render()
        .map(Json)
        .ok_or_else(|| AppError::not_found("album not found"))
}

/// `GET /album/{id}?month=YYYY-MM`
pub async fn album_detail(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(album_id): Path<Uuid>,
    Query(q): Query<AlbumQuery>,
) -> Result<Response, AppError> {
    let Some(session) = session else {
        return Ok(sign_in_redirect());
    };
    let calendar = calendar_for(q.month.as_deref())?;
    let view = mounted_album(&state, session, album_id, calendar).await?;
    Ok(rendered(view)?.into_response())
}

/// `POST /album/{id}/calendar/{date}`: opens the upload dialog.
pub async fn select_date(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path((album_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<AlbumRender>, AppError> {
    let session = session.ok_or_else(|| AlbumError::auth_required("upload photos"))?;
    let mut view = mounted_album(&state, session, album_id, Calendar::new(date)).await?;
    view.select_date(date);
    rendered(view)
}

/// `POST /album/{id}/photos`
pub async fn upload_to_album(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(album_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let session = session.ok_or_else(|| AlbumError::auth_required("upload photos"))?;
    let request = read_upload(multipart).await?;
    let mut view = mounted_album(&state, session, album_id, calendar_for(None)?).await?;
    view.upload(request).await?;
    Ok((StatusCode::CREATED, rendered(view)?))
}

/// `POST /album/{id}/photos/delete`: the selection is confirmed in one go.
pub async fn delete_photos(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(album_id): Path<Uuid>,
    Json(req): Json<DeletePhotosReq>,
) -> Result<Json<AlbumRender>, AppError> {
    let session = session.ok_or_else(|| AlbumError::auth_required("delete photos"))?;
    let mut view = mounted_album(&state, session, album_id, calendar_for(None)?).await?;
    for id in req.ids {
        view.toggle_selected(id);
    }
    view.confirm_delete_selected().await?;
    rendered(view)
}

/// `DELETE /album/{id}`: always navigates back to the album list.
pub async fn delete_album(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(album_id): Path<Uuid>,
) -> Result<Json<DeleteAlbumResp>, AppError> {
    let session = session.ok_or_else(|| AlbumError::auth_required("delete albums"))?;
    let mut view = AlbumView::new(
        state.reconciler(),
        state.upload_targets(),
        session,
        album_id,
        calendar_for(None)?,
    );
    let navigation = view.delete_album().await?;
    Ok(Json(DeleteAlbumResp {
        navigation,
        notifications: view.take_notifications(),
    }))
}

/// Collect the upload dialog's multipart fields.
///
/// `file` carries the image; `caption`, `crop_x`, `crop_y` and `zoom` are
/// optional text fields.
async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest, AppError> {
    let mut file = None;
    let mut caption = String::new();
    let mut crop_x = None;
    let mut crop_y = None;
    let mut zoom = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("photo").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(multipart_error)?;
                file = Some(LocalFile {
                    name: filename,
                    content_type,
                    bytes,
                });
            }
            "caption" => caption = text(field).await?,
            "crop_x" => crop_x = Some(number(&name, &text(field).await?)?),
            "crop_y" => crop_y = Some(number(&name, &text(field).await?)?),
            "zoom" => zoom = Some(number(&name, &text(field).await?)?),
            other => tracing::debug!("ignoring multipart field `{}`", other),
        }
    }

    let crop = match (crop_x, crop_y, zoom) {
        (None, None, None) => None,
        (x, y, zoom) => Some((
            CropRegion {
                x: x.unwrap_or(0.0),
                y: y.unwrap_or(0.0),
            },
            zoom.unwrap_or(1.0),
        )),
    };
    Ok(UploadRequest {
        file,
        crop,
        caption,
    })
}

/// Keeps the transport status, so an oversized body answers 413.
fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(multipart_error)
}

fn number(name: &str, raw: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::bad_request(format!("field `{}` must be a number", name)))
}
