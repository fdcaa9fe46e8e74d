//! Liveness and readiness checks.
//!
//! - GET /healthz  -> always "ok", no I/O
//! - GET /readyz   -> checks the SQLite pool and the object directory

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn pass() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn fail(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// `GET /healthz`
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz`
///
/// 200 when both the record/auth database and the object directory respond,
/// 503 otherwise, with one entry per check.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks = BTreeMap::new();
    checks.insert("sqlite", check_sqlite(&state).await);
    checks.insert("disk", check_disk(&state.storage.base_path).await);

    let ready = checks.values().all(|c| c.ok);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ReadyResponse {
        status: if ready { "ok" } else { "error" },
        checks,
    };
    (status, Json(body))
}

async fn check_sqlite(state: &AppState) -> CheckStatus {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*state.db)
        .await
    {
        Ok(1) => CheckStatus::pass(),
        Ok(v) => CheckStatus::fail(format!("unexpected result: {}", v)),
        Err(e) => CheckStatus::fail(format!("error: {}", e)),
    }
}

/// Write, read back and remove a scratch file under `base_path`.
async fn check_disk(base_path: &Path) -> CheckStatus {
    if let Err(e) = fs::create_dir_all(base_path).await {
        return CheckStatus::fail(format!("could not create {}: {}", base_path.display(), e));
    }
    let scratch = base_path.join(format!(".readyz-{}", Uuid::new_v4()));
    let result = match fs::write(&scratch, b"readyz").await {
        Err(e) => CheckStatus::fail(format!("could not write scratch file: {}", e)),
        Ok(()) => match fs::read(&scratch).await {
            Ok(bytes) if bytes == b"readyz" => CheckStatus::pass(),
            Ok(_) => CheckStatus::fail("scratch file content mismatch"),
            Err(e) => CheckStatus::fail(format!("could not read scratch file: {}", e)),
        },
    };
    if let Err(e) = fs::remove_file(&scratch).await {
        tracing::debug!("could not remove scratch file {}: {}", scratch.display(), e);
    }
    result
}
