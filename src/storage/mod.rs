//! Third-party image storage for the PhotoFlow server
//!
//! This module owns the boundary to the hosted image store: uploads go out
//! as signed form posts, deletions by provider public id. Everything else in
//! the crate sees only the `ImageStorage` trait.

mod client;

use async_trait::async_trait;
use crate::error::AppError;

pub use client::CloudStorageClient;

/// Details of an image persisted at the storage provider.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> Result<StoredImage, AppError>;
    async fn delete(&self, public_id: &str) -> Result<(), AppError>;
}
