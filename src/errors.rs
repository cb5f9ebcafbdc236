use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Error)]
pub enum SGError
{
    /// Refinement requires at least one point to start from.
    #[error("storage empty")]
    StorageEmpty,
    #[error("storage not empty")]
    StorageNotEmpty,
    #[error("grid point already present in storage")]
    DuplicatePoint,
    #[error("sequence number out of range")]
    InvalidIndex,
    #[error("grid point dimension does not match storage dimension")]
    DimensionMismatch,
    #[error("invalid level or index")]
    InvalidLevelIndex,
    #[error("serialization failed")]
    SerializationFailed,
    #[error("deserialization failed")]
    DeserializationFailed,
    #[error("lz4 decompression failed")]
    CompressionFailed,
}
