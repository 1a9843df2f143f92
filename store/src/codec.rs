//! Registry document encoding.
//!
//! The document is the serde JSON form of [`Registry`]. A literal `null`
//! document, written by stores initialised before any registry existed,
//! decodes to an empty registry. A document that parses but breaks the
//! registry invariants is rejected like one that does not parse.

use antibot_registry::Registry;

use crate::StoreError;

/// Encode a registry as a pretty-printed JSON document.
pub fn encode(registry: &Registry) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(registry).map_err(|e| StoreError::Encode(e.to_string()))
}

/// Decode and validate a registry document.
pub fn decode(bytes: &[u8]) -> Result<Registry, StoreError> {
    let registry: Option<Registry> =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string()))?;
    let registry = registry.unwrap_or_default();
    registry
        .check_invariants()
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    Ok(registry)
}
