/// Serialization format options for sparse grid storage.
///
/// Each format has both compressed (Lz4) and uncompressed variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerializationFormat {
    /// Bincode format - compact binary
    Bincode,
    /// Bincode format with LZ4 compression (default)
    #[default]
    BincodeLz4,
}

impl SerializationFormat {
    /// Returns true if this format uses LZ4 compression
    pub fn is_compressed(&self) -> bool {
        matches!(self, SerializationFormat::BincodeLz4)
    }
}

use crate::errors::SGError;
use serde::{de::DeserializeOwned, Serialize};

/// Serialize data to bytes using the specified format.
pub fn serialize<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, SGError> {
    let bytes = bincode::serde::encode_to_vec(data, bincode::config::standard())
        .map_err(|_| SGError::SerializationFailed)?;
    if format.is_compressed() {
        Ok(lz4_flex::compress_prepend_size(&bytes))
    } else {
        Ok(bytes)
    }
}

/// Deserialize data from bytes using the specified format.
pub fn deserialize<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, SGError> {
    let decompressed;
    let bytes = if format.is_compressed() {
        decompressed = lz4_flex::decompress_size_prepended(data).map_err(|_| SGError::CompressionFailed)?;
        &decompressed[..]
    } else {
        data
    };
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|_| SGError::DeserializationFailed)
}
