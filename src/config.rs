use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    /// Base that public object URLs are built on.
    pub public_url: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Personal photo album service")]
pub struct Args {
    /// Host to bind to (overrides PHOTO_ALBUM_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PHOTO_ALBUM_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where photo payloads are stored (overrides PHOTO_ALBUM_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides PHOTO_ALBUM_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Public base URL for photo links (overrides PHOTO_ALBUM_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<(Self, bool)> {
        let env_host = env::var("PHOTO_ALBUM_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("PHOTO_ALBUM_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing PHOTO_ALBUM_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading PHOTO_ALBUM_PORT"),
        };
        let env_storage =
            env::var("PHOTO_ALBUM_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("PHOTO_ALBUM_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/photo_album.db".into());

        let port = args.port.unwrap_or(env_port);
        let public_url = args
            .public_url
            .or_else(|| env::var("PHOTO_ALBUM_PUBLIC_URL").ok())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port,
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            public_url,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
