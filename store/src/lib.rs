//! Registry persistence.
//!
//! The rest of the workspace depends only on the [`RegistryStore`] trait.
//! [`JsonFileStore`] is the production backend: one JSON document replaced
//! atomically on every save, off the async worker threads. An in-memory backend for tests lives in
//! `antibot-nullables`.

pub mod codec;
pub mod error;
pub mod file;

pub use error::StoreError;
pub use file::JsonFileStore;

use antibot_registry::Registry;
use async_trait::async_trait;

/// Durable storage for the whole registry.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Read the persisted registry. Returns an empty registry when nothing has
    /// been persisted yet; fails with [`StoreError::Decode`] when the stored
    /// document exists but cannot be decoded.
    fn load(&self) -> Result<Registry, StoreError>;

    /// Persist the full registry, replacing the previous document.
    async fn save(&self, registry: &Registry) -> Result<(), StoreError>;
}
