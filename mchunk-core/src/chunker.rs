use crate::error::ChunkError;
use crate::hash;
use crate::manifest::{chunk_file_name, ChunkRecord, Manifest};
use crate::progress::Progress;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Default chunk size: 15 MiB, sized for upload backends with ~20 MiB caps.
pub const DEFAULT_CHUNK_SIZE: u64 = 15 * 1024 * 1024;

/// Largest chunk size known to be accepted by the storage backend.
/// Exceeding it is a warning, not an error; some backends take more.
pub const MAX_SAFE_CHUNK_SIZE: u64 = 20 * 1024 * 1024;

pub struct ChunkerConfig {
    pub chunk_size: u64,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE }
    }
}

pub struct Chunker;

impl Chunker {
    /// Split `input` into `cfg.chunk_size`-sized chunk files under
    /// `output_dir` and persist a manifest describing them.
    ///
    /// The source is read sequentially, one window at a time, so memory is
    /// bounded by the chunk size. Each chunk is hashed from the written file
    /// on disk, not the in-memory buffer, so a later `verify` catches write
    /// corruption. An empty input succeeds with zero chunks.
    ///
    /// Not transactional: a write failure part-way through leaves the chunks
    /// written so far behind and surfaces the error.
    pub fn chunk(
        input: &Path,
        output_dir: &Path,
        cfg: &ChunkerConfig,
        progress: &Progress,
    ) -> Result<Manifest, ChunkError> {
        if cfg.chunk_size == 0 {
            return Err(ChunkError::InvalidChunkSize);
        }
        let meta = fs::metadata(input).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ChunkError::NotFound(input.to_path_buf())
            } else {
                ChunkError::Io(e)
            }
        })?;
        if !meta.is_file() {
            return Err(ChunkError::NotAFile(input.to_path_buf()));
        }
        if cfg.chunk_size > MAX_SAFE_CHUNK_SIZE {
            warn!(
                chunk_size = cfg.chunk_size,
                max = MAX_SAFE_CHUNK_SIZE,
                "chunk size exceeds the safe backend maximum"
            );
        }
        fs::create_dir_all(output_dir)?;

        let original_size = meta.len();
        // Estimate for progress only; the loop stops at end of input.
        let expected_chunks = original_size.div_ceil(cfg.chunk_size);
        progress.set_stage("chunking");
        progress.set_chunks_total(expected_chunks as usize);
        progress.reset_bytes(original_size as usize);

        let mut src = File::open(input)?;
        let mut buf = vec![0u8; cfg.chunk_size as usize];
        let mut chunks: Vec<ChunkRecord> = Vec::with_capacity(expected_chunks as usize);
        loop {
            let n = read_window(&mut src, &mut buf)?;
            if n == 0 {
                break;
            }
            let chunk_id = chunks.len() as u64;
            let filename = chunk_file_name(chunk_id);
            let chunk_path = output_dir.join(&filename);
            let mut out = File::create(&chunk_path)?;
            out.write_all(&buf[..n])?;
            drop(out);
            let digest = hash::sha256_file(&chunk_path)?;
            debug!(chunk_id, %filename, size = n, "wrote chunk");
            chunks.push(ChunkRecord { chunk_id, filename, size: n as u64, hash: digest });
            progress.inc_chunk();
            progress.add_bytes(n);
        }

        let manifest = Manifest {
            original_file: input
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            original_size,
            total_chunks: chunks.len() as u64,
            chunk_size_mb: cfg.chunk_size as f64 / (1024.0 * 1024.0),
            chunks,
        };
        manifest.save(output_dir)?;
        Ok(manifest)
    }
}

/// Fill `buf` from `f`, folding short reads; the returned count is only less
/// than `buf.len()` at end of input.
fn read_window(f: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match f.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
