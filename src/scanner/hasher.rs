//! Content fingerprinting with full and sampled passes.
//!
//! # Overview
//!
//! Files below the size threshold are hashed completely, streaming
//! [`BLOCK_SIZE`] blocks through FNV-64. Files at or above the threshold are
//! sampled: one block at offsets `0, B*S, 2*B*S, ...` where `B` is the block
//! size and `S` the skip factor. Only the sampled bytes reach the hash, so two
//! large files that differ only between sample points get the same
//! fingerprint. That false-positive surface is accepted in exchange for
//! bounded I/O on huge files.
//!
//! # Example
//!
//! ```no_run
//! use dupspot::scanner::Fingerprinter;
//! use std::path::Path;
//!
//! let fingerprinter = Fingerprinter::default().with_skip_blocks(100);
//! let fp = fingerprinter.fingerprint(Path::new("big.iso"), 4_700_000_000).unwrap();
//! println!("{:016x}", fp);
//! ```

use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use fnv::FnvHasher;

use super::HashError;

/// Block size used for both full and sampled reads (8 KiB).
pub const BLOCK_SIZE: usize = 8192;

/// Files of this size or larger are sampled rather than fully hashed.
pub const DEFAULT_SIZE_THRESHOLD: u64 = 8 * BLOCK_SIZE as u64;

/// Number of blocks between two sample offsets.
pub const DEFAULT_SKIP_BLOCKS: u64 = 1000;

/// 64-bit content fingerprint. Equal fingerprints mark candidates, not proof.
pub type Fingerprint = u64;

/// Render a fingerprint as 16 lowercase hex digits.
#[must_use]
pub fn fingerprint_to_hex(fp: Fingerprint) -> String {
    format!("{fp:016x}")
}

/// Computes content fingerprints for files.
///
/// The fingerprinter is stateless apart from its policy, so one instance is
/// shared by every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprinter {
    size_threshold: u64,
    skip_blocks: u64,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self {
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            skip_blocks: DEFAULT_SKIP_BLOCKS,
        }
    }
}

impl Fingerprinter {
    /// Create a fingerprinter with the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size at which hashing switches from full to sampled.
    #[must_use]
    pub fn with_size_threshold(mut self, threshold: u64) -> Self {
        self.size_threshold = threshold;
        self
    }

    /// Set the sampling stride in blocks (clamped to at least 1).
    #[must_use]
    pub fn with_skip_blocks(mut self, skip_blocks: u64) -> Self {
        self.skip_blocks = skip_blocks.max(1);
        self
    }

    /// Size threshold in bytes.
    #[must_use]
    pub fn size_threshold(&self) -> u64 {
        self.size_threshold
    }

    /// Sampling stride in blocks.
    #[must_use]
    pub fn skip_blocks(&self) -> u64 {
        self.skip_blocks
    }

    /// Distance in bytes between the starts of two sampled blocks.
    #[must_use]
    pub fn sample_stride(&self) -> u64 {
        BLOCK_SIZE as u64 * self.skip_blocks
    }

    /// Whether a file of `size` bytes would be sampled rather than fully read.
    #[must_use]
    pub fn is_sampled(&self, size: u64) -> bool {
        size >= self.size_threshold
    }

    /// Compute the fingerprint of the file at `path`.
    ///
    /// `size` selects the strategy and bounds the sampled pass; it is the size
    /// observed by the caller, not re-read from the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or a read fails for
    /// any reason other than end of file.
    pub fn fingerprint(&self, path: &Path, size: u64) -> Result<Fingerprint, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;

        let result = if self.is_sampled(size) {
            log::trace!("Sampled hash: {} ({} bytes)", path.display(), size);
            self.sampled_hash(&mut file, size)
        } else {
            log::trace!("Full hash: {} ({} bytes)", path.display(), size);
            full_hash(&mut file)
        };

        result.map_err(|e| HashError::from_io(path, e))
    }

    fn sampled_hash<R: Read + Seek>(&self, reader: &mut R, size: u64) -> io::Result<Fingerprint> {
        let mut hasher = FnvHasher::default();
        let mut buffer = vec![0u8; BLOCK_SIZE];
        let stride = self.sample_stride();

        let mut offset = 0u64;
        while offset < size {
            reader.seek(SeekFrom::Start(offset))?;
            let read = read_block(reader, &mut buffer)?;
            if read == 0 {
                // File shrank since it was stat'ed
                break;
            }
            hasher.write(&buffer[..read]);
            offset = offset.saturating_add(stride);
        }

        Ok(hasher.finish())
    }
}

/// Hash a whole stream block by block.
fn full_hash<R: Read>(reader: &mut R) -> io::Result<Fingerprint> {
    let mut hasher = FnvHasher::default();
    let mut buffer = vec![0u8; BLOCK_SIZE];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.write(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(hasher.finish())
}

/// Fill `buffer` from the reader, stopping early only at end of file.
fn read_block<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
