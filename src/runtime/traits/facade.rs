// ABOUTME: The runtime facade: one interface over local and remote execution.
// ABOUTME: Commands hold a `dyn Runtime` and never branch on the variant.

use super::container::ContainerOps;
use super::image::ImageOps;
use super::shared_types::Variant;
use async_trait::async_trait;

/// Every capability a command needs, plus connection lifecycle.
#[async_trait]
pub trait Runtime: ContainerOps + ImageOps {
    /// Which implementation is active. Informational only.
    fn variant(&self) -> Variant;

    /// Release the underlying connection. Calling it again is a no-op.
    async fn shutdown(&self);
}
