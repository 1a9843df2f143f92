//! Nullable store: in-memory registry document for testing.

use antibot_registry::Registry;
use antibot_store::{codec, RegistryStore, StoreError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Keeps the encoded registry document in memory.
///
/// Documents go through the same codec as the file store, so a save/load
/// cycle behaves exactly like a restart.
pub struct NullStore {
    document: Mutex<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            document: Mutex::new(None),
            fail_writes: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
        }
    }

    /// A store whose persisted document is `bytes`, as if written earlier.
    pub fn with_document(bytes: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        *store.document.lock().unwrap() = Some(bytes.into());
        store
    }

    /// Make every subsequent save fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Decode the last saved document. Empty when nothing was saved.
    pub fn snapshot(&self) -> Registry {
        self.load().unwrap_or_default()
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryStore for NullStore {
    fn load(&self) -> Result<Registry, StoreError> {
        match self.document.lock().unwrap().as_deref() {
            Some(bytes) => codec::decode(bytes),
            None => Ok(Registry::new()),
        }
    }

    async fn save(&self, registry: &Registry) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes disabled".into()));
        }
        let bytes = codec::encode(registry)?;
        *self.document.lock().unwrap() = Some(bytes);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
