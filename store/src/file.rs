//! JSON file backend.
//!
//! Saves go through a temp file in the destination directory which is synced
//! and then renamed over the target, so a reader never observes a partially
//! written document. The blocking file work runs on tokio's blocking pool.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use antibot_registry::Registry;
use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{codec, RegistryStore, StoreError};

/// Registry persisted as a single JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Replace `path` with `bytes` through a synced temp file in the same directory.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let display = || path.display().to_string();
    let parent = parent_dir(path);
    fs::create_dir_all(parent).map_err(|e| StoreError::io(parent.display().to_string(), e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| StoreError::io(display(), e))?;
    tmp.write_all(bytes).map_err(|e| StoreError::io(display(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(display(), e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::io(display(), e.error))?;
    Ok(())
}

#[async_trait]
impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<Registry, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.display(), "no registry file yet, starting empty");
                return Ok(Registry::new());
            }
            Err(e) => return Err(StoreError::io(self.display(), e)),
        };
        codec::decode(&bytes)
    }

    async fn save(&self, registry: &Registry) -> Result<(), StoreError> {
        let bytes = codec::encode(registry)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| StoreError::Backend(format!("save task failed: {e}")))??;

        debug!(
            path = %self.display(),
            chats = registry.chat_count(),
            pending = registry.pending_count(),
            "registry saved"
        );
        Ok(())
    }
}
