// src/storage.rs
//
// Image files live in an external store; the catalog only keeps the path.
use async_trait::async_trait;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Best-effort removal of a stored image. Errors are logged by callers.
    async fn delete(&self, path: &str) -> Result<(), String>;
}

pub struct NullImageStore;

#[async_trait]
impl ImageStore for NullImageStore {
    async fn delete(&self, path: &str) -> Result<(), String> {
        tracing::info!(%path, "Image delete requested (no store configured)");
        Ok(())
    }
}
