//! Public object URLs. Streams payloads straight from disk.

use crate::{
    errors::AppError,
    models::object::StoredObject,
    services::object_store::StorageError,
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ObjectNotFound(_) | StorageError::InvalidObjectName => {
                AppError::not_found(err.to_string())
            }
            StorageError::AlreadyExists(_) => AppError::new(StatusCode::CONFLICT, err.to_string()),
            other => AppError::internal(other.to_string()),
        }
    }
}

/// `GET /storage/{*name}`
pub async fn get_object(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let (meta, file) = state.storage.get_object_reader(&name).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

fn set_object_headers(headers: &mut HeaderMap, meta: &StoredObject) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&meta.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.size_bytes.max(0)));
    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", meta.etag)) {
        headers.insert(header::ETAG, value);
    }
    if let Ok(value) = HeaderValue::from_str(&meta.created_at.to_rfc2822()) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}
