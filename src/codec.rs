/// Payload codec
///
/// Definitions are stored as JSON text inside the value column. Only the stores
/// call into this module; nothing else depends on the encoding.

use crate::error::MetadataResult;
use serde::{de::DeserializeOwned, Serialize};

pub fn encode<T: Serialize>(value: &T) -> MetadataResult<String> {
    Ok(serde_json::to_string(value)?)
}

pub fn decode<T: DeserializeOwned>(payload: &str) -> MetadataResult<T> {
    Ok(serde_json::from_str(payload)?)
}
