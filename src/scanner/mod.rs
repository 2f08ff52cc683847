//! Scanner module for path intake and content fingerprinting.
//!
//! This module provides functionality for:
//! - Reading candidate paths from a line-oriented stream
//! - Classifying paths (regular file, directory, symlink, special file)
//! - Filesystem-type lookup with a blacklist cache
//! - Full and sampled FNV-64 content fingerprints
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`intake`]: Line reading and path classification
//! - [`fstype`]: `statfs` lookup and filesystem blacklist
//! - [`hasher`]: Content fingerprinting (full or sampled)
//!
//! # Example
//!
//! ```no_run
//! use dupspot::scanner::{Fingerprinter, FileEntry};
//! use std::path::PathBuf;
//!
//! let fingerprinter = Fingerprinter::default();
//! let entry = FileEntry::new(PathBuf::from("notes.txt"), 42);
//! match fingerprinter.fingerprint(&entry.path, entry.size) {
//!     Ok(fp) => println!("{}: {:016x}", entry.path.display(), fp),
//!     Err(e) => eprintln!("Warning: {}", e),
//! }
//! ```

pub mod fstype;
pub mod hasher;
pub mod intake;

use std::io;
use std::path::{Path, PathBuf};

// Re-export main types
pub use fstype::{fs_type, fs_type_name, BlacklistCache, DEFAULT_BLACKLIST};
pub use hasher::{
    fingerprint_to_hex, Fingerprint, Fingerprinter, BLOCK_SIZE, DEFAULT_SIZE_THRESHOLD,
    DEFAULT_SKIP_BLOCKS,
};
pub use intake::{Intake, PathIntake, SkipReason};

/// A file accepted for duplicate analysis.
///
/// This is the intake item handed to the analyser: a regular file with a
/// non-zero size, consumed exactly once by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path as it was read from the input
    pub path: PathBuf,
    /// File size in bytes (always > 0)
    pub size: u64,
}

impl FileEntry {
    /// Create a new FileEntry.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file
    /// * `size` - File size in bytes
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }
}

/// Errors that can occur while classifying input paths.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when accessing a path.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Filesystem type could not be determined.
    #[error("statfs failed for {path}: {source}")]
    Statfs {
        /// Path that was queried
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An I/O error occurred while accessing a path.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Build a scan error from an I/O error, keeping the common kinds distinct.
    #[must_use]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Errors that can occur while fingerprinting a file.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {path}: {source}")]
    NotFound {
        /// Missing file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Permission was denied when reading the file.
    #[error("Permission denied: {path}: {source}")]
    PermissionDenied {
        /// Unreadable file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// Build a hash error from an I/O error, keeping the common kinds distinct.
    #[must_use]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path, source },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::Io { path, source },
        }
    }

    /// The path whose fingerprint could not be computed.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path, .. }
            | Self::PermissionDenied { path, .. }
            | Self::Io { path, .. } => path,
        }
    }
}
