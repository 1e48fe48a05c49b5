//! Streaming SHA-256 file hashing.
//!
//! Quarantine integrity is anchored on SHA-256 digests computed before a
//! file is moved and recomputed at restore time. Hashing streams the file
//! in fixed-size chunks so arbitrarily large files never have to fit in
//! memory.

use crate::core::error::{FileOperationError, FileOperationResult};

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Chunk size for streaming reads.
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Computes SHA-256 digests of file content.
///
/// # Examples
///
/// ```rust,ignore
/// use qvault::core::FileHasher;
///
/// let hasher = FileHasher::new();
/// let digest = hasher.hash_file("/tmp/sample.bin".as_ref())?;
/// assert_eq!(digest.len(), 64);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FileHasher;

impl FileHasher {
    /// Creates a new `FileHasher`.
    pub fn new() -> Self {
        Self
    }

    /// Computes the hash of a byte slice.
    pub fn hash_bytes(&self, data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    /// Computes the hash of a file on disk.
    ///
    /// Streams the file so large files are never loaded fully into memory.
    pub fn hash_file(&self, path: &Path) -> FileOperationResult<String> {
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                FileOperationError::file_not_found(path.display().to_string())
            }
            std::io::ErrorKind::PermissionDenied => {
                FileOperationError::permission_denied(path.display().to_string(), e.to_string())
            }
            _ => FileOperationError::Io(e),
        })?;

        let mut reader = std::io::BufReader::new(file);
        self.hash_reader(&mut reader)
    }

    /// Computes the hash of everything a reader yields.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> FileOperationResult<String> {
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; HASH_CHUNK_SIZE];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}
