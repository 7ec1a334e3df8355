// ABOUTME: Image operations trait for both runtime variants.
// ABOUTME: List, fetch, pull, tag, remove, and inspect history of images.

use super::sealed::Sealed;
use super::shared_types::{ContainerImage, ImageHistory, PullOptions};
use crate::error::ErrorKind;
use async_trait::async_trait;

/// Image operations.
#[async_trait]
pub trait ImageOps: Sealed + Send + Sync {
    /// List images in the engine's store.
    async fn list_images(&self) -> Result<Vec<ContainerImage>, ImageError>;

    /// Look up a single image by name or ID.
    async fn get_image(&self, name: &str) -> Result<ContainerImage, ImageError>;

    /// Pull (or load) an image and return its local view.
    async fn pull_image(
        &self,
        reference: &str,
        opts: &PullOptions,
    ) -> Result<ContainerImage, ImageError>;

    /// Add a name to an image.
    async fn tag_image(&self, image: &ContainerImage, tag: &str) -> Result<(), ImageError>;

    /// Remove an image, returning the ID the engine reports as removed.
    async fn remove_image(&self, image: &ContainerImage, force: bool)
    -> Result<String, ImageError>;

    /// Layer history, newest first.
    async fn image_history(&self, image: &ContainerImage) -> Result<Vec<ImageHistory>, ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("no such image: {0}")]
    NotFound(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("image in use, cannot remove: {0}")]
    InUse(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("malformed image data: {0}")]
    Format(String),

    #[error("runtime connection failed: {0}")]
    Connectivity(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ImageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImageError::NotFound(_) => ErrorKind::NoSuchImage,
            ImageError::NotImplemented(_) => ErrorKind::NotImplemented,
            ImageError::Format(_) => ErrorKind::Format,
            ImageError::Connectivity(_) => ErrorKind::Connectivity,
            ImageError::PullFailed(_) | ImageError::InUse(_) | ImageError::Runtime(_) => {
                ErrorKind::Runtime
            }
        }
    }
}
