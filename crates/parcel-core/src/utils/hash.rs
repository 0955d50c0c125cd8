//! SHA-1 hashing utilities for bundle integrity.
//!
//! Archives are hashed in fixed-size chunks so large bundles never have to
//! be held in memory.

use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{ParcelError, ParcelResult};

/// Chunk size used when streaming data through the hasher
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Compute the SHA-1 hex digest of `data`
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Compute the SHA-1 hex digest of everything readable from `reader`
pub fn sha1_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the SHA-1 hex digest of a file
pub fn sha1_file(path: &Path) -> ParcelResult<String> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ParcelError::ArchiveNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ParcelError::io(format!("Failed to open {}", path.display()), e)
        }
    })?;

    sha1_reader(file).map_err(|e| ParcelError::io(format!("Failed to hash {}", path.display()), e))
}

/// Verify a file against an expected SHA-1 hex digest
pub fn verify_sha1(path: &Path, expected: &str) -> ParcelResult<()> {
    let actual = sha1_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ParcelError::IntegrityFailure {
            bundle: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Check that `value` looks like a SHA-1 hex digest
pub fn is_sha1_hex(value: &str) -> bool {
    value.len() == 40 && value.chars().all(|c| c.is_ascii_hexdigit())
}
