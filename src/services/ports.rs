//! Backend boundaries the views talk to.
//!
//! Each trait is one managed collaborator: the record store holding albums
//! and photos, the object store holding image bytes, and the auth service
//! issuing sessions. Adapters map their own failures into [`RemoteError`]
//! so views never see driver-specific errors.

use crate::{
    errors::RemoteResult,
    models::{
        album::{Album, NewAlbum},
        photo::{NewPhoto, Photo},
        session::{Credentials, Session},
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Equality filter on one column of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Id(Uuid),
    UserId(Uuid),
    AlbumId(Uuid),
}

/// Equality filters plus an optional limit against one collection. Rows
/// always come back newest first.
#[derive(Debug, Clone, Default)]
pub struct Select {
    pub filters: Vec<Filter>,
    pub limit: Option<u32>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Owner-scoped rows for the `albums` and `photos` collections.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select_albums(&self, query: &Select) -> RemoteResult<Vec<Album>>;
    async fn insert_album(&self, row: NewAlbum) -> RemoteResult<()>;
    /// Returns the number of rows removed.
    async fn delete_albums(&self, filters: &[Filter]) -> RemoteResult<u64>;

    async fn select_photos(&self, query: &Select) -> RemoteResult<Vec<Photo>>;
    async fn insert_photo(&self, row: NewPhoto) -> RemoteResult<()>;
    /// Returns the number of rows removed.
    async fn delete_photos(&self, filters: &[Filter]) -> RemoteResult<u64>;
}

/// Blob storage addressed by object name.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, name: &str, bytes: Bytes, content_type: &str) -> RemoteResult<()>;
    fn public_url(&self, name: &str) -> String;
    /// Inverse of [`ObjectStore::public_url`]. `None` for URLs this store did
    /// not hand out.
    fn object_name(&self, url: &str) -> Option<String>;
    async fn remove(&self, name: &str) -> RemoteResult<()>;
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
}

/// Pushed to every subscriber when any session starts or ends.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

/// What a subscriber observes on each receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthNotice {
    Event(AuthEvent),
    /// The subscriber fell behind and some events were dropped. Treated the
    /// same as an event: something changed, refetch.
    Missed(u64),
}

/// Live subscription to auth events. Dropping it unsubscribes.
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    pub fn new(rx: broadcast::Receiver<AuthEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next notice. `None` once the auth service has shut down.
    pub async fn recv(&mut self) -> Option<AuthNotice> {
        match self.rx.recv().await {
            Ok(event) => Some(AuthNotice::Event(event)),
            Err(broadcast::error::RecvError::Lagged(missed)) => Some(AuthNotice::Missed(missed)),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Release the subscription explicitly.
    pub fn unsubscribe(self) {}
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        debug!("auth subscription released");
    }
}

/// Session issuance and the auth-change feed.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> RemoteResult<Session>;
    async fn sign_in(&self, credentials: &Credentials) -> RemoteResult<Session>;
    /// Resolve a bearer token. `Ok(None)` when the token is unknown or signed out.
    async fn current_session(&self, token: &str) -> RemoteResult<Option<Session>>;
    async fn sign_out(&self, token: &str) -> RemoteResult<()>;
    fn subscribe(&self) -> AuthSubscription;
}
