pub mod auth_service;
pub mod object_store;
pub mod ports;
pub mod reconciler;
pub mod record_store;
pub mod upload_pipeline;
