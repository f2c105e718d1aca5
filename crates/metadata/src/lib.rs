//! Metadata store abstraction and implementations for Soundpost.
//!
//! This crate provides the control-plane data model:
//! - Track rows: descriptive metadata, storage pointers (inline blob or
//!   cloud object key), transcription state and transcript, analysis fields
//! - Bearer tokens mapping credentials to owner identities

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use store::{MetadataStore, SqliteStore};

use soundpost_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
