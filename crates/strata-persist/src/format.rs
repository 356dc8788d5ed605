//! Byte encodings for records and record containers.
//!
//! [`encode`] and [`decode`] turn any serde type (a [`ComponentRecord`],
//! or a container built from records) into bytes and back.
//!
//! [`ComponentRecord`]: crate::record::ComponentRecord

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::PersistError;

/// Supported encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Compact binary (bincode, standard configuration).
    #[default]
    Binary,
    /// Human-readable JSON.
    Json,
}

/// Encode a value to bytes in the given format.
pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>, PersistError> {
    match format {
        Format::Binary => bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| PersistError::Encode(e.to_string())),
        Format::Json => serde_json::to_vec(value).map_err(|e| PersistError::Encode(e.to_string())),
    }
}

/// Decode bytes in the given format.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], format: Format) -> Result<T, PersistError> {
    match format {
        Format::Binary => {
            let (value, _read): (T, usize) =
                bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                    .map_err(|e| PersistError::Decode(e.to_string()))?;
            Ok(value)
        }
        Format::Json => serde_json::from_slice(bytes).map_err(|e| PersistError::Decode(e.to_string())),
    }
}
