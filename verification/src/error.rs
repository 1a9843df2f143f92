use antibot_registry::RegistryError;
use antibot_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    /// The registry could not be loaded or flushed. After a mutation the
    /// in-memory state is kept; the next successful flush reconciles disk.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}
