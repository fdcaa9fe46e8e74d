//! End-to-end tests against the router with the local SQLite and disk adapters.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use photo_album::{
    db, routes::routes::routes, services::object_store::DiskObjectStore, state::AppState,
};
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;
use tower::ServiceExt;

const BOUNDARY: &str = "photo-album-test-boundary";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";

async fn build_test_app() -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = db::memory_pool().await.unwrap();
    let storage = DiskObjectStore::new(db.clone(), dir.path(), "http://localhost:3000");
    let app = routes().with_state(AppState::local(db, storage));
    (app, dir)
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn multipart_upload(uri: &str, token: &str, filename: &str, payload: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\nBeach day\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"zoom\"\r\n\r\n1.5\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: image/png\r\n\r\n",
            b = BOUNDARY,
            f = filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap()
}

/// Next `(event, data)` pair off an SSE body, skipping keep-alive comments.
/// `None` once the stream has closed.
async fn next_event(body: &mut Body, buf: &mut String) -> Option<(String, String)> {
    loop {
        if let Some(end) = buf.find("\n\n") {
            let raw: String = buf.drain(..end + 2).collect();
            let mut event = None;
            let mut data = String::new();
            for line in raw.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(chunk) = line.strip_prefix("data:") {
                    data.push_str(chunk.trim_start());
                }
            }
            match event {
                Some(event) => return Some((event, data)),
                None => continue,
            }
        }
        let frame = timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("no event within 5s");
        match frame {
            Some(Ok(frame)) => {
                if let Ok(chunk) = frame.into_data() {
                    buf.push_str(std::str::from_utf8(&chunk).unwrap());
                }
            }
            _ => return None,
        }
    }
}

async fn sign_up(app: &Router, email: &str) -> String {
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/sign-up",
            None,
            json!({ "email": email, "password": "secret123" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await["token"].as_str().unwrap().to_string()
}

async fn create_album(app: &Router, token: &str, name: &str) -> Value {
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/albums",
            Some(token),
            json!({ "name": name }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

#[tokio::test]
async fn test_healthz() {
    let (app, _dir) = build_test_app().await;
    let resp = app.oneshot(get("/healthz", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "ok");
}

#[tokio::test]
async fn test_readyz_checks_sqlite_and_disk() {
    let (app, _dir) = build_test_app().await;
    let resp = app.oneshot(get("/readyz", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["checks"]["sqlite"]["ok"], true);
    assert_eq!(body["checks"]["disk"]["ok"], true);
}

#[tokio::test]
async fn test_home_redirects_without_session() {
    let (app, _dir) = build_test_app().await;
    let resp = app.oneshot(get("/", None)).await.unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(resp.headers()[header::LOCATION], "/auth");
}

#[tokio::test]
async fn test_auth_landing_redirects_signed_in_user() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;

    let resp = app.clone().oneshot(get("/auth", Some(&token))).await.unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(resp.headers()[header::LOCATION], "/");

    let resp = app.oneshot(get("/auth", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["screen"], "auth");
}

#[tokio::test]
async fn test_sign_up_rejects_short_password() {
    let (app, _dir) = build_test_app().await;
    let resp = app
        .oneshot(json_request(
            "POST",
            "/auth/sign-up",
            None,
            json!({ "email": "ada@example.com", "password": "abc" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_sign_in_with_wrong_password_passes_backend_message() {
    let (app, _dir) = build_test_app().await;
    sign_up(&app, "ada@example.com").await;
    let resp = app
        .oneshot(json_request(
            "POST",
            "/auth/sign-in",
            None,
            json!({ "email": "ada@example.com", "password": "wrong-password" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(resp).await["error"], "Invalid login credentials");
}

#[tokio::test]
async fn test_new_user_sees_empty_album_list() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;

    let resp = app.oneshot(get("/", Some(&token))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["user_email"], "ada@example.com");
    assert_eq!(body["albums"]["state"], "empty");
    assert_eq!(body["albums"]["message"], "No albums found.");
    assert_eq!(body["slideshow"]["state"], "empty");
}

#[tokio::test]
async fn test_create_album_refetches_list() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;

    let body = create_album(&app, &token, "  Summer  ").await;
    assert_eq!(body["albums"]["state"], "ready");
    assert_eq!(body["albums"]["albums"][0]["name"], "Summer");
    assert_eq!(body["albums"]["albums"][0]["cover_photo_url"], Value::Null);
    assert_eq!(body["notifications"][0]["level"], "success");
    assert_eq!(
        body["notifications"][0]["message"],
        "Album created successfully"
    );
}

#[tokio::test]
async fn test_blank_album_name_is_rejected() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;
    let resp = app
        .oneshot(json_request(
            "POST",
            "/albums",
            Some(&token),
            json!({ "name": "   " }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;

    let payload = vec![0u8; 6 * 1024 * 1024];
    let resp = app
        .clone()
        .oneshot(multipart_upload("/photos", &token, "big.png", &payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("File size must be less than 5MB")
    );

    let resp = app.oneshot(get("/", Some(&token))).await.unwrap();
    assert_eq!(body_json(resp).await["slideshow"]["state"], "empty");
}

#[tokio::test]
async fn test_upload_to_album_then_serve_and_delete() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;
    let home = create_album(&app, &token, "Trips").await;
    let album_id = home["albums"]["albums"][0]["id"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(multipart_upload(
            &format!("/album/{}/photos", album_id),
            &token,
            "beach.png",
            PNG,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["upload_open"], false);
    assert_eq!(body["photos"][0]["caption"], "Beach day");
    let photo_id = body["photos"][0]["id"].as_str().unwrap().to_string();
    let url = body["photos"][0]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("http://localhost:3000/storage/"));

    // the album card now shows the photo as its cover
    let resp = app.clone().oneshot(get("/", Some(&token))).await.unwrap();
    let home = body_json(resp).await;
    assert_eq!(home["albums"]["albums"][0]["cover_photo_url"], url.as_str());
    assert_eq!(home["slideshow"]["state"], "ready");

    let path = &url["http://localhost:3000".len()..];
    let resp = app.clone().oneshot(get(path, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], PNG);

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/album/{}/photos/delete", album_id),
            Some(&token),
            json!({ "ids": [photo_id] }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["photos"].as_array().unwrap().len(), 0);
    assert_eq!(body["notifications"][0]["message"], "Deleted 1 photo");

    // the payload goes with the row
    let resp = app.oneshot(get(path, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_with_empty_selection_is_rejected() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;
    let home = create_album(&app, &token, "Trips").await;
    let album_id = home["albums"]["albums"][0]["id"].as_str().unwrap().to_string();

    let resp = app
        .oneshot(json_request(
            "POST",
            &format!("/album/{}/photos/delete", album_id),
            Some(&token),
            json!({ "ids": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_album_calendar_and_date_selection() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;
    let home = create_album(&app, &token, "Trips").await;
    let album_id = home["albums"]["albums"][0]["id"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(get(&format!("/album/{}?month=2024-02", album_id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["calendar"]["title"], "February 2024");
    assert_eq!(body["calendar"]["previous_month"], "2024-01");
    assert_eq!(body["calendar"]["next_month"], "2024-03");
    assert_eq!(body["upload_open"], false);

    let resp = app
        .oneshot(json_request(
            "POST",
            &format!("/album/{}/calendar/2024-02-14", album_id),
            Some(&token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["upload_open"], true);
}

#[tokio::test]
async fn test_other_users_album_is_not_found() {
    let (app, _dir) = build_test_app().await;
    let owner = sign_up(&app, "ada@example.com").await;
    let home = create_album(&app, &owner, "Private").await;
    let album_id = home["albums"]["albums"][0]["id"].as_str().unwrap().to_string();

    let stranger = sign_up(&app, "bob@example.com").await;
    let resp = app
        .oneshot(get(&format!("/album/{}", album_id), Some(&stranger)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_album_navigates_home() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;
    let home = create_album(&app, &token, "Trips").await;
    let album_id = home["albums"]["albums"][0]["id"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/album/{}", album_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["navigate_to"], "/");
    assert_eq!(body["notifications"][0]["message"], "Album deleted");

    let resp = app.oneshot(get("/", Some(&token))).await.unwrap();
    assert_eq!(body_json(resp).await["albums"]["state"], "empty");
}

#[tokio::test]
async fn test_sign_out_ends_session() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/auth/sign-out", Some(&token), json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/albums", Some(&token), json!({ "name": "x" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(resp).await["error"],
        "You must be logged in to create an album"
    );

    let resp = app.oneshot(get("/events", Some(&token))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let (app, _dir) = build_test_app().await;
    let resp = app
        .oneshot(get("/storage/nobody/1-missing.png", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_body_over_transport_limit_is_payload_too_large() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;

    let payload = vec![0u8; 17 * 1024 * 1024];
    let resp = app
        .clone()
        .oneshot(multipart_upload("/photos", &token, "huge.png", &payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let resp = app.oneshot(get("/", Some(&token))).await.unwrap();
    assert_eq!(body_json(resp).await["slideshow"]["state"], "empty");
}

#[tokio::test]
async fn test_slideshow_steps_wrap_around() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;
    for name in ["first.png", "second.png"] {
        let resp = app
            .clone()
            .oneshot(multipart_upload("/photos", &token, name, PNG))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = app
        .clone()
        .oneshot(get("/slideshow?index=0&step=previous", Some(&token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["state"], "ready");
    assert_eq!(body["index"], 1);
    assert_eq!(body["total"], 2);
    assert_eq!(body["controls_enabled"], true);

    let resp = app
        .clone()
        .oneshot(get("/slideshow?index=1&step=next", Some(&token)))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["index"], 0);

    let resp = app.oneshot(get("/slideshow", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_events_follow_auth_changes_until_sign_out() {
    let (app, _dir) = build_test_app().await;
    let token = sign_up(&app, "ada@example.com").await;
    create_album(&app, &token, "Trips").await;

    let resp = app.clone().oneshot(get("/events", Some(&token))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    let mut body = resp.into_body();
    let mut buf = String::new();

    let (event, data) = next_event(&mut body, &mut buf).await.unwrap();
    assert_eq!(event, "albums");
    let home: Value = serde_json::from_str(&data).unwrap();
    assert_eq!(home["albums"]["albums"][0]["name"], "Trips");

    // any sign-in refetches the list
    sign_up(&app, "bob@example.com").await;
    let (event, _) = next_event(&mut body, &mut buf).await.unwrap();
    assert_eq!(event, "albums");

    let resp = app
        .oneshot(json_request("POST", "/auth/sign-out", Some(&token), json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let (event, data) = next_event(&mut body, &mut buf).await.unwrap();
    assert_eq!(event, "signed_out");
    assert_eq!(data, "{}");
    assert_eq!(next_event(&mut body, &mut buf).await, None);
}
