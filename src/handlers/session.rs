//! Resolves `Authorization: Bearer <token>` into a [`Session`].

use crate::{errors::AppError, models::session::Session, state::AppState};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// The caller's session, if the bearer token is current.
pub struct MaybeSession(pub Option<Session>);

pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Self(None));
        };
        let session = state.auth.current_session(token).await?;
        Ok(Self(session))
    }
}
