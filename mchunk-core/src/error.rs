use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for chunk/verify/reconstruct operations.
///
/// Structural preconditions (missing input, missing manifest) abort the
/// operation. Per-chunk integrity findings during verification are collected
/// in the `VerifyReport` instead of being raised through this type.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("input file not found: {0}")]
    NotFound(PathBuf),

    #[error("input path is not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("chunk size must be positive")]
    InvalidChunkSize,

    #[error("model_metadata.json not found under {0}")]
    ManifestMissing(PathBuf),

    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("missing chunk {chunk_id} ({filename})")]
    MissingChunk { chunk_id: u64, filename: String },

    #[error("reconstructed size {actual} does not match original size {expected}")]
    ReconstructionSizeMismatch { expected: u64, actual: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
