//! HTTP API server for the Soundpost media backend.
//!
//! This crate provides the HTTP control plane:
//! - Track ingestion (inline payload, pre-uploaded cloud key, chunked)
//! - Presigned and proxied uploads to the cloud bucket
//! - Range-aware playback streaming
//! - Background transcription dispatch and polling
//! - Integrity reconciliation of cloud-backed tracks

pub mod auth;
pub mod error;
pub mod facade;
pub mod handlers;
pub mod metrics;
pub mod pipeline;
pub mod routes;
pub mod sessions;
pub mod state;

pub use error::ApiError;
pub use facade::StorageFacade;
pub use pipeline::TranscriptionPipeline;
pub use routes::create_router;
pub use sessions::SessionStore;
pub use state::AppState;
