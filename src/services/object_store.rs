//! DiskObjectStore: object storage backed by SQLite for metadata and local
//! disk for payloads sharded beneath `base_path/{shard}/{shard}/{name}`.
//!
//! Photo bytes land here before the photo row is written; the public URL
//! handed back points at the `/storage/{*name}` route, which streams the
//! payload out through [`DiskObjectStore::get_object_reader`].

use crate::{
    errors::{RemoteError, RemoteResult},
    models::object::StoredObject,
    services::ports::ObjectStore,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};
use uuid::Uuid;

const MAX_OBJECT_NAME_LEN: usize = 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object `{0}` not found")]
    ObjectNotFound(String),
    #[error("invalid object name")]
    InvalidObjectName,
    #[error("The resource already exists")]
    AlreadyExists(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for RemoteError {
    fn from(err: StorageError) -> Self {
        RemoteError::Object(err.to_string())
    }
}

#[derive(Clone)]
pub struct DiskObjectStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,

    /// Externally reachable origin prefixed to `/storage/{name}`.
    pub public_base_url: String,
}

impl DiskObjectStore {
    pub fn new(
        db: Arc<SqlitePool>,
        base_path: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Rejects names that could escape `base_path`.
    fn ensure_name_safe(&self, name: &str) -> StorageResult<()> {
        if name.is_empty() || name.len() > MAX_OBJECT_NAME_LEN {
            return Err(StorageError::InvalidObjectName);
        }
        if name.starts_with('/') || name.ends_with('/') || name.contains("..") {
            return Err(StorageError::InvalidObjectName);
        }
        if name
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StorageError::InvalidObjectName);
        }
        Ok(())
    }

    /// First two bytes of MD5(name) as lowercase hex, one directory level each.
    fn object_shards(name: &str) -> (String, String) {
        let digest = md5::compute(name);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, name: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(name);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(name);
        path
    }

    async fn fetch_object(&self, name: &str) -> StorageResult<StoredObject> {
        sqlx::query_as::<_, StoredObject>(
            "SELECT name, content_type, size_bytes, etag, created_at
             FROM objects WHERE name = ?",
        )
        .bind(name)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StorageError::ObjectNotFound(name.to_string()),
            other => StorageError::Sqlx(other),
        })
    }

    /// Record an object's metadata and write its payload to disk.
    ///
    /// Names are never overwritten: the metadata row is claimed first with a
    /// plain insert, so an existing name fails with
    /// [`StorageError::AlreadyExists`] before any bytes are touched. Bytes go
    /// to a temp file that is fsynced and renamed into place. If the write
    /// fails the row is removed again.
    pub async fn put_object(
        &self,
        name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        self.ensure_name_safe(name)?;

        let etag = format!("{:x}", md5::compute(&bytes));
        let size_bytes = i64::try_from(bytes.len()).unwrap_or(i64::MAX);

        let object = sqlx::query_as::<_, StoredObject>(
            r#"
            INSERT INTO objects (name, content_type, size_bytes, etag, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING name, content_type, size_bytes, etag, created_at
            "#,
        )
        .bind(name)
        .bind(content_type)
        .bind(size_bytes)
        .bind(&etag)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StorageError::AlreadyExists(name.to_string())
            }
            other => StorageError::Sqlx(other),
        })?;

        if let Err(err) = self.write_payload(name, &bytes).await {
            if let Err(cleanup) = sqlx::query("DELETE FROM objects WHERE name = ?")
                .bind(name)
                .execute(&*self.db)
                .await
            {
                warn!("could not release metadata for {}: {}", name, cleanup);
            }
            return Err(err);
        }
        Ok(object)
    }

    async fn write_payload(&self, name: &str, bytes: &[u8]) -> StorageResult<()> {
        let file_path = self.object_path(name);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));

        if let Err(err) = write_durably(&tmp_path, bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        Ok(())
    }

    /// Metadata and an opened file handle ready for streaming out.
    pub async fn get_object_reader(&self, name: &str) -> StorageResult<(StoredObject, File)> {
        self.ensure_name_safe(name)?;
        let object = self.fetch_object(name).await?;
        let file = File::open(self.object_path(name)).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StorageError::ObjectNotFound(name.to_string())
            } else {
                StorageError::Io(err)
            }
        })?;
        Ok((object, file))
    }

    /// Remove the metadata row and the payload, then prune empty shard dirs.
    pub async fn delete_object(&self, name: &str) -> StorageResult<()> {
        self.ensure_name_safe(name)?;
        let result = sqlx::query("DELETE FROM objects WHERE name = ?")
            .bind(name)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::ObjectNotFound(name.to_string()));
        }

        let file_path = self.object_path(name);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StorageError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    /// Remove empty directories from `start` up to, not including, `base_path`.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

async fn write_durably(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    async fn upload(&self, name: &str, bytes: Bytes, content_type: &str) -> RemoteResult<()> {
        let object = self.put_object(name, bytes, content_type).await?;
        debug!(
            "stored object {} ({} bytes, etag {})",
            object.name, object.size_bytes, object.etag
        );
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        format!("{}/storage/{}", self.public_base_url, name)
    }

    fn object_name(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_base_url)?
            .strip_prefix("/storage/")
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    async fn remove(&self, name: &str) -> RemoteResult<()> {
        Ok(self.delete_object(name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tokio::io::AsyncReadExt;

    async fn store(dir: &Path) -> DiskObjectStore {
        let pool = db::memory_pool().await.unwrap();
        DiskObjectStore::new(pool, dir, "http://photos.test/")
    }

    #[tokio::test]
    async fn upload_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;

        store
            .upload("u1/1700000000000-cat.png", Bytes::from_static(b"png!"), "image/png")
            .await
            .unwrap();

        let (meta, mut file) = store
            .get_object_reader("u1/1700000000000-cat.png")
            .await
            .unwrap();
        assert_eq!(meta.content_type, "image/png");
        assert_eq!(meta.size_bytes, 4);
        assert_eq!(meta.etag, format!("{:x}", md5::compute(b"png!")));

        let mut body = Vec::new();
        file.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"png!");
    }

    #[tokio::test]
    async fn public_url_points_at_storage_route() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;
        assert_eq!(
            store.public_url("u1/1-a.png"),
            "http://photos.test/storage/u1/1-a.png"
        );
    }

    #[tokio::test]
    async fn existing_name_is_refused_and_payload_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;
        let name = "u1/1700000000000-same.png";
        store
            .upload(name, Bytes::from_static(b"first"), "image/png")
            .await
            .unwrap();

        let err = store
            .upload(name, Bytes::from_static(b"second"), "image/png")
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Object("The resource already exists".into()));

        let (meta, mut file) = store.get_object_reader(name).await.unwrap();
        assert_eq!(meta.size_bytes, 5);
        let mut body = Vec::new();
        file.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"first");
    }

    #[tokio::test]
    async fn object_name_inverts_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;
        let url = store.public_url("u1/1-a.png");
        assert_eq!(store.object_name(&url).as_deref(), Some("u1/1-a.png"));
        assert_eq!(store.object_name("https://elsewhere.test/storage/u1/1-a.png"), None);
        assert_eq!(store.object_name("http://photos.test/storage/"), None);
    }

    #[tokio::test]
    async fn unsafe_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;
        for name in ["", "/abs.png", "../escape.png", "a/../b.png", "back\\slash"] {
            let err = store
                .upload(name, Bytes::from_static(b"x"), "image/png")
                .await
                .unwrap_err();
            assert_eq!(err, RemoteError::Object("invalid object name".into()));
        }
    }

    #[tokio::test]
    async fn remove_deletes_payload_and_prunes_shards() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;
        let name = "u1/1-gone.gif";
        store
            .upload(name, Bytes::from_static(b"gif"), "image/gif")
            .await
            .unwrap();
        let path = store.object_path(name);
        assert!(path.exists());

        store.remove(name).await.unwrap();
        assert!(!path.exists());
        let (shard_a, _) = DiskObjectStore::object_shards(name);
        assert!(!dir.path().join(shard_a).exists());

        let err = store.remove(name).await.unwrap_err();
        assert!(matches!(err, RemoteError::Object(msg) if msg.contains("not found")));
    }
}
