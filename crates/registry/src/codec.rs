//! JSON object codec
//!
//! Objects are stored as `serde_json` bytes. Decoding stamps the store's
//! version onto the object through the kind's `ResourceVersioner`, so the
//! version an object reports is always the one its bytes were written at,
//! whatever the bytes themselves say.

use kindstore_core::VersionedBytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ResourceVersioner;
use crate::error::{RegistryError, RegistryResult};

/// Serialize `obj` for storage
pub fn encode<T: Serialize>(kind: &str, name: &str, obj: &T) -> RegistryResult<Vec<u8>> {
    serde_json::to_vec(obj)
        .map_err(|e| RegistryError::internal(kind, name, format!("failed to encode object: {}", e)))
}

/// Deserialize a stored value and stamp its version
pub fn decode<T, V>(kind: &str, key: &str, raw: &VersionedBytes, versioner: &V) -> RegistryResult<T>
where
    T: DeserializeOwned,
    V: ResourceVersioner<T> + ?Sized,
{
    let mut obj: T = serde_json::from_slice(&raw.value).map_err(|e| {
        RegistryError::internal(kind, key, format!("failed to decode object: {}", e))
    })?;
    versioner.set_resource_version(&mut obj, raw.version);
    Ok(obj)
}
