//! The audit trilogy: resumable checkpoints, per-batch manifests and the
//! hash-chained provenance audit stream. Each component is the sole writer
//! of its paths under the working directory.

use serde::Serialize;
use sha2::{Digest, Sha256};

pub mod checkpoint;
pub mod manifest;
pub mod pas;

/// Canonical JSON: sorted keys, no insignificant whitespace. serde_json
/// maps are BTree-backed, so re-serializing through `Value` sorts keys.
pub(crate) fn canonical_json(value: &impl Serialize) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_value(value)?.to_string())
}

pub(crate) fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Hash of the canonical serialization with the named field removed; the
/// manifest and PAS checksums are both defined this way.
pub(crate) fn hash_without_field(
    value: &impl Serialize,
    field: &str,
) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(value)?;
    if let Some(map) = value.as_object_mut() {
        map.remove(field);
    }
    Ok(sha256_hex(&value.to_string()))
}
