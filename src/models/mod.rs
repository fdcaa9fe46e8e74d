//! Core data models for the photo album service.
//!
//! These entities represent albums, photos, sessions and stored objects.
//! Row types map to SQLite tables via `sqlx::FromRow` and serialize
//! naturally as JSON via `serde`.

pub mod album;
pub mod notification;
pub mod object;
pub mod photo;
pub mod session;
