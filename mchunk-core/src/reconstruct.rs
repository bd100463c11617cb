use crate::error::ChunkError;
use crate::manifest::Manifest;
use crate::progress::Progress;
use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ReconstructReport {
    pub chunks: u64,
    pub bytes_written: u64,
}

/// Concatenate the chunks in `chunks_dir` into `output`, strictly in
/// ascending `chunk_id` order.
///
/// Unlike `verify`, the first missing chunk aborts the operation: a partial
/// reconstruction is not a valid output. Per-chunk hashes are deliberately
/// not rechecked here; `verify` owns that guarantee. The final size
/// comparison against `original_size` is a coarse secondary guard and will
/// not catch equal-sized content swaps.
pub fn reconstruct(
    chunks_dir: &Path,
    output: &Path,
    progress: &Progress,
) -> Result<ReconstructReport, ChunkError> {
    let manifest = Manifest::load(chunks_dir)?;
    progress.set_stage("reconstructing");
    progress.set_chunks_total(manifest.chunks.len());
    progress.reset_bytes(manifest.original_size as usize);

    let mut out = BufWriter::new(File::create(output)?);
    let mut bytes_written: u64 = 0;
    // Manifest validation guarantees record order equals chunk_id order.
    for ch in &manifest.chunks {
        let path = chunks_dir.join(&ch.filename);
        let mut src = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ChunkError::MissingChunk {
                    chunk_id: ch.chunk_id,
                    filename: ch.filename.clone(),
                });
            }
            Err(e) => return Err(ChunkError::Io(e)),
        };
        let n = io::copy(&mut src, &mut out)?;
        debug!(chunk_id = ch.chunk_id, bytes = n, "appended chunk");
        bytes_written += n;
        progress.inc_chunk();
        progress.add_bytes(n as usize);
    }
    out.flush()?;

    if bytes_written != manifest.original_size {
        return Err(ChunkError::ReconstructionSizeMismatch {
            expected: manifest.original_size,
            actual: bytes_written,
        });
    }
    Ok(ReconstructReport { chunks: manifest.chunks.len() as u64, bytes_written })
}
