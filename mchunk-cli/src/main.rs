use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use mchunk_core::chunker::{Chunker, ChunkerConfig, DEFAULT_CHUNK_SIZE};
use mchunk_core::manifest::MANIFEST_FILE_NAME;
use mchunk_core::progress::Progress;
use mchunk_core::verify::ChunkStatus;
use mchunk_core::{reconstruct, verify};

const DEFAULT_CHUNK_MB: u64 = DEFAULT_CHUNK_SIZE / (1024 * 1024);

#[derive(Parser)]
#[command(name = "mchunk", version, about = "Split large model files into upload-sized chunks")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Split a model file into fixed-size chunks plus a manifest
    Chunk {
        input: PathBuf,
        output: PathBuf,
        /// Chunk size in MB
        #[arg(long, default_value_t = DEFAULT_CHUNK_MB)]
        size: u64,
        #[arg(long, default_value_t = false)]
        progress: bool,
    },
    /// Verify chunks in a directory against their manifest
    Verify {
        chunks_dir: PathBuf,
        #[arg(long, default_value_t = false)]
        progress: bool,
    },
    /// Reassemble the original file from a chunk directory
    Reconstruct {
        chunks_dir: PathBuf,
        output: PathBuf,
        #[arg(long, default_value_t = false)]
        progress: bool,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Chunk { input, output, size, progress } => chunk(&input, &output, size, progress),
        Cmd::Verify { chunks_dir, progress } => verify_dir(&chunks_dir, progress),
        Cmd::Reconstruct { chunks_dir, output, progress } => {
            reconstruct_file(&chunks_dir, &output, progress)
        }
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn chunk(input: &Path, output: &Path, size_mb: u64, show_progress: bool) -> Result<()> {
    let chunk_size = size_mb.checked_mul(1024 * 1024).context("chunk size overflows")?;
    let prog = Progress::new(show_progress);
    prog.start();
    let result = Chunker::chunk(input, output, &ChunkerConfig { chunk_size }, &prog);
    prog.stop();
    let manifest = result.with_context(|| format!("chunk {}", input.display()))?;

    for ch in &manifest.chunks {
        println!("Created {} ({} bytes)", ch.filename, ch.size);
    }
    println!(
        "Chunked {} ({}) into {} chunk(s) under {}",
        manifest.original_file,
        format_size(manifest.original_size),
        manifest.total_chunks,
        output.display()
    );
    println!("Manifest: {}", output.join(MANIFEST_FILE_NAME).display());
    Ok(())
}

fn verify_dir(chunks_dir: &Path, show_progress: bool) -> Result<()> {
    let prog = Progress::new(show_progress);
    prog.start();
    let result = verify::verify(chunks_dir, &prog);
    prog.stop();
    let report = result.with_context(|| format!("verify {}", chunks_dir.display()))?;

    for o in &report.outcomes {
        match &o.status {
            ChunkStatus::Valid => println!("ok   {}", o.filename),
            ChunkStatus::Missing => println!("MISS {}", o.filename),
            ChunkStatus::SizeMismatch { expected, actual } => {
                println!("SIZE {} (expected {} bytes, got {})", o.filename, expected, actual)
            }
            ChunkStatus::HashMismatch { .. } => println!("HASH {}", o.filename),
        }
    }
    if report.is_valid() {
        println!("OK: {} chunk(s) verified", report.chunks_ok());
        Ok(())
    } else {
        println!("BAD: {} of {} chunk(s) failed", report.chunks_bad(), report.outcomes.len());
        bail!("verification failed");
    }
}

fn reconstruct_file(chunks_dir: &Path, output: &Path, show_progress: bool) -> Result<()> {
    let prog = Progress::new(show_progress);
    prog.start();
    let result = reconstruct::reconstruct(chunks_dir, output, &prog);
    prog.stop();
    let report = result.with_context(|| format!("reconstruct from {}", chunks_dir.display()))?;

    println!(
        "Reconstructed {} from {} chunk(s) ({})",
        output.display(),
        report.chunks,
        format_size(report.bytes_written)
    );
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{} B", bytes)
    } else if b < MIB {
        format!("{:.1} KB", b / KIB)
    } else if b < GIB {
        format!("{:.1} MB", b / MIB)
    } else {
        format!("{:.1} GB", b / GIB)
    }
}
