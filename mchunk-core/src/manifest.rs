use crate::error::ChunkError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Fixed manifest file name inside a chunk directory.
pub const MANIFEST_FILE_NAME: &str = "model_metadata.json";

/// Standard chunk file name for an id. Zero-padded to at least three digits
/// so lexical order equals numeric order for ids 0-999.
pub fn chunk_file_name(id: u64) -> String {
    format!("model_chunk_{:03}.bin", id)
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChunkRecord {
    pub chunk_id: u64,
    pub filename: String,
    pub size: u64,
    pub hash: String,
}

/// Side-car metadata describing how a source file was split.
///
/// The JSON field names are a persisted contract; manifests written by
/// earlier versions of the tool must keep loading unchanged. The record is
/// immutable once written — verify/reconstruct only ever read it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Manifest {
    pub original_file: String,
    pub original_size: u64,
    pub total_chunks: u64,
    pub chunk_size_mb: f64,
    pub chunks: Vec<ChunkRecord>,
}

impl Manifest {
    /// Load and validate `model_metadata.json` from a chunk directory.
    pub fn load(chunks_dir: &Path) -> Result<Self, ChunkError> {
        let path = chunks_dir.join(MANIFEST_FILE_NAME);
        if !path.exists() {
            return Err(ChunkError::ManifestMissing(chunks_dir.to_path_buf()));
        }
        let f = File::open(&path)?;
        let manifest: Manifest = serde_json::from_reader(f)
            .map_err(|e| ChunkError::MalformedManifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Persist as pretty-printed JSON under the fixed manifest name.
    pub fn save(&self, chunks_dir: &Path) -> Result<(), ChunkError> {
        let path = chunks_dir.join(MANIFEST_FILE_NAME);
        let f = File::create(&path)?;
        serde_json::to_writer_pretty(f, self).map_err(std::io::Error::from)?;
        Ok(())
    }

    /// Cross-field invariants, checked at load time. Manifest contents are
    /// untrusted input: chunk filenames are also required to be bare file
    /// names so a doctored manifest cannot read or write outside its
    /// directory.
    fn validate(&self) -> Result<(), ChunkError> {
        if self.chunks.len() as u64 != self.total_chunks {
            return Err(ChunkError::MalformedManifest(format!(
                "total_chunks is {} but {} chunk records are present",
                self.total_chunks,
                self.chunks.len()
            )));
        }
        let mut sum: u64 = 0;
        for (i, ch) in self.chunks.iter().enumerate() {
            if ch.chunk_id != i as u64 {
                return Err(ChunkError::MalformedManifest(format!(
                    "chunk_id {} at position {}; ids must be contiguous from 0",
                    ch.chunk_id, i
                )));
            }
            if !is_bare_file_name(&ch.filename) {
                return Err(ChunkError::MalformedManifest(format!(
                    "unsafe chunk filename {:?}",
                    ch.filename
                )));
            }
            sum = sum.checked_add(ch.size).ok_or_else(|| {
                ChunkError::MalformedManifest("chunk sizes overflow u64".to_string())
            })?;
        }
        if sum != self.original_size {
            return Err(ChunkError::MalformedManifest(format!(
                "chunk sizes sum to {} but original_size is {}",
                sum, self.original_size
            )));
        }
        Ok(())
    }
}

fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !Path::new(name).is_absolute()
}
