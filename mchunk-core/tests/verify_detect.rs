use mchunk_core::chunker::{Chunker, ChunkerConfig};
use mchunk_core::error::ChunkError;
use mchunk_core::manifest::Manifest;
use mchunk_core::progress::Progress;
use mchunk_core::reconstruct;
use mchunk_core::verify::{self, ChunkStatus};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const CHUNK: u64 = 4096;

fn chunked_dir(td: &tempfile::TempDir, size: usize, seed: u64) -> (PathBuf, Vec<u8>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
    let input = td.path().join("model.bin");
    fs::write(&input, &data).unwrap();
    let out = td.path().join("chunks");
    Chunker::chunk(&input, &out, &ChunkerConfig { chunk_size: CHUNK }, &Progress::new(false))
        .unwrap();
    (out, data)
}

fn flip_byte(path: &Path, offset: u64) {
    let mut f = OpenOptions::new().read(true).write(true).open(path).unwrap();
    f.seek(SeekFrom::Start(offset)).unwrap();
    let mut b = [0u8; 1];
    f.read_exact(&mut b).unwrap();
    f.seek(SeekFrom::Start(offset)).unwrap();
    f.write_all(&[b[0] ^ 0xFF]).unwrap();
}

#[test]
fn verify_passes_on_pristine_chunks() {
    let td = tempfile::tempdir().unwrap();
    let (out, _) = chunked_dir(&td, 5 * CHUNK as usize + 17, 1);
    let report = verify::verify(&out, &Progress::new(false)).unwrap();
    assert!(report.is_valid());
    assert_eq!(report.chunks_ok(), 6);
    assert_eq!(report.chunks_bad(), 0);
}

#[test]
fn bitflip_is_reported_for_exactly_that_chunk() {
    let td = tempfile::tempdir().unwrap();
    let (out, _) = chunked_dir(&td, 4 * CHUNK as usize, 2);

    flip_byte(&out.join("model_chunk_001.bin"), 100);

    let report = verify::verify(&out, &Progress::new(false)).unwrap();
    assert!(!report.is_valid());
    for o in &report.outcomes {
        if o.chunk_id == 1 {
            assert!(matches!(o.status, ChunkStatus::HashMismatch { .. }));
        } else {
            assert_eq!(o.status, ChunkStatus::Valid);
        }
    }
}

#[test]
fn missing_chunk_detected_by_verify_and_fatal_for_reconstruct() {
    let td = tempfile::tempdir().unwrap();
    let (out, _) = chunked_dir(&td, 3 * CHUNK as usize, 3);

    fs::remove_file(out.join("model_chunk_002.bin")).unwrap();

    let report = verify::verify(&out, &Progress::new(false)).unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.outcomes[2].status, ChunkStatus::Missing);
    // The other chunks are still evaluated, no short-circuit.
    assert_eq!(report.outcomes[0].status, ChunkStatus::Valid);
    assert_eq!(report.outcomes[1].status, ChunkStatus::Valid);

    let err = reconstruct::reconstruct(&out, &td.path().join("rebuilt.bin"), &Progress::new(false))
        .unwrap_err();
    assert!(matches!(err, ChunkError::MissingChunk { chunk_id: 2, .. }));
}

#[test]
fn truncated_chunk_reports_size_mismatch() {
    let td = tempfile::tempdir().unwrap();
    let (out, _) = chunked_dir(&td, 3 * CHUNK as usize, 4);

    let victim = out.join("model_chunk_000.bin");
    let f = OpenOptions::new().write(true).open(&victim).unwrap();
    f.set_len(CHUNK - 7).unwrap();

    let report = verify::verify(&out, &Progress::new(false)).unwrap();
    assert_eq!(
        report.outcomes[0].status,
        ChunkStatus::SizeMismatch { expected: CHUNK, actual: CHUNK - 7 }
    );
    assert_eq!(report.outcomes[1].status, ChunkStatus::Valid);
    assert_eq!(report.outcomes[2].status, ChunkStatus::Valid);
}

#[test]
fn swapped_equal_size_chunks_fool_reconstruct_but_not_verify() {
    let td = tempfile::tempdir().unwrap();
    let (out, data) = chunked_dir(&td, 4 * CHUNK as usize, 5);

    // Swap the contents of two full-size chunks; recorded hashes stay put.
    let a = out.join("model_chunk_000.bin");
    let b = out.join("model_chunk_001.bin");
    let ab = fs::read(&a).unwrap();
    let bb = fs::read(&b).unwrap();
    fs::write(&a, &bb).unwrap();
    fs::write(&b, &ab).unwrap();

    let report = verify::verify(&out, &Progress::new(false)).unwrap();
    assert!(matches!(report.outcomes[0].status, ChunkStatus::HashMismatch { .. }));
    assert!(matches!(report.outcomes[1].status, ChunkStatus::HashMismatch { .. }));
    assert_eq!(report.outcomes[2].status, ChunkStatus::Valid);
    assert_eq!(report.outcomes[3].status, ChunkStatus::Valid);

    // Reconstruction only guards aggregate size, so the swap slips through
    // and the output differs from the original. Known weak guarantee.
    let rebuilt = td.path().join("rebuilt.bin");
    let rr = reconstruct::reconstruct(&out, &rebuilt, &Progress::new(false)).unwrap();
    assert_eq!(rr.bytes_written, data.len() as u64);
    assert_ne!(fs::read(&rebuilt).unwrap(), data);
}

#[test]
fn verify_requires_manifest() {
    let td = tempfile::tempdir().unwrap();
    let empty = td.path().join("no_manifest");
    fs::create_dir(&empty).unwrap();

    let err = verify::verify(&empty, &Progress::new(false)).unwrap_err();
    assert!(matches!(err, ChunkError::ManifestMissing(_)));

    let err = reconstruct::reconstruct(&empty, &td.path().join("out.bin"), &Progress::new(false))
        .unwrap_err();
    assert!(matches!(err, ChunkError::ManifestMissing(_)));
}

#[test]
fn reconstruct_size_guard_catches_grown_chunk() {
    let td = tempfile::tempdir().unwrap();
    let (out, _) = chunked_dir(&td, 2 * CHUNK as usize, 6);

    // Append garbage to a chunk after chunking.
    let mut f = OpenOptions::new().append(true).open(out.join("model_chunk_001.bin")).unwrap();
    f.write_all(&[0u8; 64]).unwrap();
    drop(f);

    let err = reconstruct::reconstruct(&out, &td.path().join("rebuilt.bin"), &Progress::new(false))
        .unwrap_err();
    match err {
        ChunkError::ReconstructionSizeMismatch { expected, actual } => {
            assert_eq!(expected, 2 * CHUNK);
            assert_eq!(actual, 2 * CHUNK + 64);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn malformed_manifest_is_rejected() {
    let td = tempfile::tempdir().unwrap();
    let (out, _) = chunked_dir(&td, 2 * CHUNK as usize, 7);

    // Garbage JSON
    fs::write(out.join("model_metadata.json"), b"{not json").unwrap();
    let err = verify::verify(&out, &Progress::new(false)).unwrap_err();
    assert!(matches!(err, ChunkError::MalformedManifest(_)));

    // Well-formed JSON with a missing required field
    fs::write(out.join("model_metadata.json"), br#"{"original_file": "m.bin"}"#).unwrap();
    let err = verify::verify(&out, &Progress::new(false)).unwrap_err();
    assert!(matches!(err, ChunkError::MalformedManifest(_)));
}

#[test]
fn manifest_with_traversal_filename_is_rejected() {
    let td = tempfile::tempdir().unwrap();
    let (out, _) = chunked_dir(&td, CHUNK as usize, 8);

    let mut manifest = Manifest::load(&out).unwrap();
    manifest.chunks[0].filename = "../outside.bin".to_string();
    manifest.save(&out).unwrap();

    let err = verify::verify(&out, &Progress::new(false)).unwrap_err();
    assert!(matches!(err, ChunkError::MalformedManifest(_)));
}
