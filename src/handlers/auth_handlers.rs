//! Sign-up, sign-in, sign-out and the signed-out landing screen.

use crate::{
    errors::AppError,
    handlers::session::{MaybeSession, bearer_token},
    models::session::Credentials,
    state::AppState,
};
use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct CredentialsReq {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
struct Landing {
    screen: &'static str,
    actions: [&'static str; 2],
}

/// `GET /auth`: only for signed-out callers.
pub async fn landing(MaybeSession(session): MaybeSession) -> Response {
    if session.is_some() {
        return Redirect::to("/").into_response();
    }
    Json(Landing {
        screen: "auth",
        actions: ["/auth/sign-in", "/auth/sign-up"],
    })
    .into_response()
}

/// `POST /auth/sign-up`
pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<CredentialsReq>,
) -> Result<impl IntoResponse, AppError> {
    let credentials = Credentials::parse(&req.email, &req.password)?;
    let session = state.auth.sign_up(&credentials).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// `POST /auth/sign-in`
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<CredentialsReq>,
) -> Result<impl IntoResponse, AppError> {
    let credentials = Credentials::parse(&req.email, &req.password)?;
    let session = state.auth.sign_in(&credentials).await?;
    info!("user {} signed in", session.user.id);
    Ok(Json(session))
}

/// The raw bearer token, whether or not it is still current.
pub struct BearerToken(pub Option<String>);

impl FromRequestParts<AppState> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(bearer_token(parts).map(str::to_string)))
    }
}

/// `POST /auth/sign-out`: idempotent; unknown tokens are fine.
pub async fn sign_out(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse, AppError> {
    let token =
        token.ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
    state.auth.sign_out(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
