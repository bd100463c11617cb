use crate::error::ChunkError;
use crate::hash;
use crate::manifest::Manifest;
use crate::progress::Progress;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Outcome of checking one chunk against its manifest record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStatus {
    Valid,
    /// The chunk file does not exist.
    Missing,
    /// On-disk length differs from the recorded size. Hashing is skipped;
    /// a size mismatch already makes the hash comparison moot.
    SizeMismatch { expected: u64, actual: u64 },
    /// Size matches but the digest does not.
    HashMismatch { expected: String, actual: String },
}

#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub chunk_id: u64,
    pub filename: String,
    pub status: ChunkStatus,
}

#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub outcomes: Vec<ChunkOutcome>,
}

impl VerifyReport {
    pub fn is_valid(&self) -> bool {
        self.outcomes.iter().all(|o| o.status == ChunkStatus::Valid)
    }
    pub fn chunks_ok(&self) -> u64 {
        self.outcomes.iter().filter(|o| o.status == ChunkStatus::Valid).count() as u64
    }
    pub fn chunks_bad(&self) -> u64 {
        self.outcomes.len() as u64 - self.chunks_ok()
    }
}

/// Check every chunk in `chunks_dir` against the manifest.
///
/// Per-chunk findings are collected, never fatal: the whole directory is
/// evaluated so the caller gets a complete diagnostic picture. Only a
/// missing/malformed manifest or a mid-read I/O failure aborts.
pub fn verify(chunks_dir: &Path, progress: &Progress) -> Result<VerifyReport, ChunkError> {
    let manifest = Manifest::load(chunks_dir)?;
    progress.set_stage("verifying");
    progress.set_chunks_total(manifest.chunks.len());
    progress.reset_bytes(manifest.original_size as usize);

    let mut outcomes = Vec::with_capacity(manifest.chunks.len());
    for ch in &manifest.chunks {
        let path = chunks_dir.join(&ch.filename);
        let status = match fs::metadata(&path) {
            Err(e) if e.kind() == ErrorKind::NotFound => ChunkStatus::Missing,
            Err(e) => return Err(ChunkError::Io(e)),
            Ok(md) if md.len() != ch.size => {
                ChunkStatus::SizeMismatch { expected: ch.size, actual: md.len() }
            }
            Ok(_) => {
                let digest = hash::sha256_file_tracked(&path, progress)?;
                if digest == ch.hash {
                    ChunkStatus::Valid
                } else {
                    ChunkStatus::HashMismatch { expected: ch.hash.clone(), actual: digest }
                }
            }
        };
        debug!(chunk_id = ch.chunk_id, ?status, "checked chunk");
        outcomes.push(ChunkOutcome {
            chunk_id: ch.chunk_id,
            filename: ch.filename.clone(),
            status,
        });
        progress.inc_chunk();
    }
    Ok(VerifyReport { outcomes })
}
