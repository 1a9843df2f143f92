use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stored registry is corrupt: {0}")]
    Decode(String),

    #[error("registry could not be encoded: {0}")]
    Encode(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the stored document cannot be trusted.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
