pub mod album_handlers;
pub mod auth_handlers;
pub mod event_handlers;
pub mod health_handlers;
pub mod session;
pub mod storage_handlers;
