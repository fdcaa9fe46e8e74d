//! SQLite pool setup and the embedded schema.

use anyhow::{Context, Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{path::Path, str::FromStr, sync::Arc};

/// Open a pool for a `sqlite://` URL, creating the database file and its
/// parent directory when missing.
pub async fn connect(database_url: &str) -> Result<Arc<SqlitePool>> {
    let db_path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {:?}", parent))?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parsing database url `{}`", database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("connecting to {}", database_url))?;
    Ok(Arc::new(pool))
}

/// Single-connection in-memory database with the schema applied.
///
/// The connection is never recycled, since closing it would drop the data.
pub async fn memory_pool() -> Result<Arc<SqlitePool>> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    let pool = Arc::new(pool);
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Apply the migrations embedded from `migrations/`. Already applied
/// versions are skipped.
pub async fn run_migrations(db: &Arc<SqlitePool>) -> Result<()> {
    let migrator = sqlx::migrate!("./migrations");
    tracing::info!("Running {} migrations...", migrator.iter().count());
    migrator
        .run(&**db)
        .await
        .context("applying database migrations")?;
    Ok(())
}
