//! Streaming SHA-256 of files.
//!
//! Reads in fixed-size windows so memory stays bounded regardless of file
//! size; model artifacts can run to gigabytes.

use crate::error::ChunkError;
use crate::progress::Progress;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Compute SHA-256 of a file and return the digest as lowercase hex.
pub fn sha256_file(path: &Path) -> Result<String, ChunkError> {
    digest_file(path, None)
}

/// Same as [`sha256_file`], but feeds byte counts into `progress`.
/// The digest loop itself stays free of display concerns.
pub fn sha256_file_tracked(path: &Path, progress: &Progress) -> Result<String, ChunkError> {
    digest_file(path, Some(progress))
}

fn digest_file(path: &Path, progress: Option<&Progress>) -> Result<String, ChunkError> {
    let mut f = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        if let Some(p) = progress {
            p.add_bytes(n);
        }
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sha256_empty_file() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let digest = sha256_file(f.path()).unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_known_content() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let digest = sha256_file(f.path()).unwrap();
        assert_eq!(
            digest,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn sha256_deterministic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[7u8; 100_000]).unwrap();
        f.flush().unwrap();
        assert_eq!(sha256_file(f.path()).unwrap(), sha256_file(f.path()).unwrap());
    }

    #[test]
    fn sha256_missing_file_is_io_error() {
        let err = sha256_file(Path::new("/nonexistent/nope.bin")).unwrap_err();
        assert!(matches!(err, ChunkError::Io(_)));
    }
}
