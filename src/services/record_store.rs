//! SQLite-backed record store for the `albums` and `photos` collections.
//!
//! Queries are assembled with `QueryBuilder` from equality filters, so every
//! select and delete is a single statement. Ordering is by `created_at` with
//! `rowid` as tie-breaker, which keeps rows written within the same instant
//! in insertion order.

use crate::{
    errors::{RemoteError, RemoteResult},
    models::{
        album::{Album, NewAlbum},
        photo::{NewPhoto, Photo},
    },
    services::ports::{Filter, RecordStore, Select},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const ALBUM_COLUMNS: &str = "id, user_id, name, created_at";
const PHOTO_COLUMNS: &str = "id, user_id, url, caption, album_id, created_at";

#[derive(Clone)]
pub struct SqliteRecordStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteRecordStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

fn record_error(err: sqlx::Error) -> RemoteError {
    RemoteError::Record(err.to_string())
}

/// Append `WHERE a = ? AND b = ?` for the given filters.
fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        let (column, value) = match filter {
            Filter::Id(id) => ("id", *id),
            Filter::UserId(id) => ("user_id", *id),
            Filter::AlbumId(id) => ("album_id", *id),
        };
        builder.push(column);
        builder.push(" = ");
        builder.push_bind(value);
    }
}

fn select_sql<'a>(columns: &str, table: &str, query: &Select) -> QueryBuilder<'a, Sqlite> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {columns} FROM {table}"));
    push_filters(&mut builder, &query.filters);
    builder.push(" ORDER BY created_at DESC, rowid DESC");
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(limit));
    }
    builder
}

/// Deletes without any filter would wipe a whole collection.
fn delete_sql<'a>(table: &str, filters: &[Filter]) -> RemoteResult<QueryBuilder<'a, Sqlite>> {
    if filters.is_empty() {
        return Err(RemoteError::Record(format!(
            "refusing to delete from `{table}` without a filter"
        )));
    }
    let mut builder = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {table}"));
    push_filters(&mut builder, filters);
    Ok(builder)
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn select_albums(&self, query: &Select) -> RemoteResult<Vec<Album>> {
        let mut builder = select_sql(ALBUM_COLUMNS, "albums", query);
        builder
            .build_query_as::<Album>()
            .fetch_all(&*self.db)
            .await
            .map_err(record_error)
    }

    async fn insert_album(&self, row: NewAlbum) -> RemoteResult<()> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO albums (id, user_id, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(row.user_id)
            .bind(row.name.as_str())
            .bind(Utc::now())
            .execute(&*self.db)
            .await
            .map_err(record_error)?;
        debug!("inserted album {} for user {}", id, row.user_id);
        Ok(())
    }

    async fn delete_albums(&self, filters: &[Filter]) -> RemoteResult<u64> {
        let mut builder = delete_sql("albums", filters)?;
        let result = builder
            .build()
            .execute(&*self.db)
            .await
            .map_err(record_error)?;
        Ok(result.rows_affected())
    }

    async fn select_photos(&self, query: &Select) -> RemoteResult<Vec<Photo>> {
        let mut builder = select_sql(PHOTO_COLUMNS, "photos", query);
        builder
            .build_query_as::<Photo>()
            .fetch_all(&*self.db)
            .await
            .map_err(record_error)
    }

    async fn insert_photo(&self, row: NewPhoto) -> RemoteResult<()> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO photos (id, user_id, url, caption, album_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(row.user_id)
        .bind(&row.url)
        .bind(row.caption.as_deref())
        .bind(row.album_id)
        .bind(Utc::now())
        .execute(&*self.db)
        .await
        .map_err(record_error)?;
        debug!("inserted photo {} at {}", id, row.url);
        Ok(())
    }

    async fn delete_photos(&self, filters: &[Filter]) -> RemoteResult<u64> {
        let mut builder = delete_sql("photos", filters)?;
        let result = builder
            .build()
            .execute(&*self.db)
            .await
            .map_err(record_error)?;
        Ok(result.rows_affected())
    }
}
