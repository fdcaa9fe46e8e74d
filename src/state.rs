//! Shared state handed to every handler.

use crate::services::{
    auth_service::SqliteAuthService,
    object_store::DiskObjectStore,
    ports::{AuthService, ObjectStore, RecordStore},
    reconciler::Reconciler,
    record_store::SqliteRecordStore,
    upload_pipeline::UploadTargets,
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Pool behind the local adapters, used by the readiness check.
    pub db: Arc<SqlitePool>,
    pub auth: Arc<dyn AuthService>,
    pub records: Arc<dyn RecordStore>,
    pub objects: Arc<dyn ObjectStore>,
    /// Serves public object URLs.
    pub storage: DiskObjectStore,
}

impl AppState {
    /// Wire the SQLite and disk adapters over one pool.
    pub fn local(db: Arc<SqlitePool>, storage: DiskObjectStore) -> Self {
        Self {
            auth: Arc::new(SqliteAuthService::new(db.clone())),
            records: Arc::new(SqliteRecordStore::new(db.clone())),
            objects: Arc::new(storage.clone()),
            storage,
            db,
        }
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.records.clone())
    }

    pub fn upload_targets(&self) -> UploadTargets {
        UploadTargets {
            objects: self.objects.clone(),
            records: self.records.clone(),
        }
    }
}
