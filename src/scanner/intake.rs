//! Path intake: turns raw input lines into analyser work items.
//!
//! # Overview
//!
//! Each line names one candidate path. [`PathIntake::classify_line`] trims it,
//! rejects blanks and repeats, `lstat`s the path and keeps only non-empty
//! regular files that do not live on a blacklisted filesystem. Everything
//! else comes back as a [`SkipReason`] so the caller can count it.
//!
//! # Example
//!
//! ```no_run
//! use dupspot::scanner::{Intake, PathIntake};
//! use std::io::BufRead;
//!
//! let mut intake = PathIntake::default();
//! for line in std::io::stdin().lock().split(b'\n') {
//!     match intake.classify_line(&line.unwrap()) {
//!         Intake::Accept(entry) => println!("{} ({} bytes)", entry.path.display(), entry.size),
//!         Intake::Skip(reason) => eprintln!("skipped: {}", reason),
//!     }
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use super::fstype::{fs_type, BlacklistCache};
use super::{FileEntry, ScanError};

/// Outcome of classifying one input line.
#[derive(Debug)]
pub enum Intake {
    /// A regular, non-empty file to analyse.
    Accept(FileEntry),
    /// The line was not submitted for analysis.
    Skip(SkipReason),
}

/// Why an input line was not submitted.
#[derive(Debug)]
pub enum SkipReason {
    /// Empty or whitespace-only line.
    BlankLine,
    /// The same path was already read in this run.
    DuplicatePath(PathBuf),
    /// `lstat` failed.
    StatError(ScanError),
    /// Path is a directory.
    Directory(PathBuf),
    /// Path is a symbolic link.
    Symlink(PathBuf),
    /// Path is a FIFO, socket, device or other non-regular file.
    SpecialFile(PathBuf),
    /// Path lives on a blacklisted filesystem type.
    BlacklistedFilesystem {
        /// Skipped path
        path: PathBuf,
        /// Filesystem type name
        fstype: String,
    },
    /// File has zero length.
    ZeroLength(PathBuf),
}

impl SkipReason {
    /// Statistics key under which this skip is counted.
    #[must_use]
    pub fn stat_key(&self) -> String {
        match self {
            Self::BlankLine => "blank line".to_string(),
            Self::DuplicatePath(_) => "duplicate path".to_string(),
            Self::StatError(_) => "stat error".to_string(),
            Self::Directory(_) => "directory".to_string(),
            Self::Symlink(_) => "symlink".to_string(),
            Self::SpecialFile(_) => "special file".to_string(),
            Self::BlacklistedFilesystem { fstype, .. } => {
                format!("blacklisted filesystem: {fstype}")
            }
            Self::ZeroLength(_) => "zero length files".to_string(),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankLine => write!(f, "blank line"),
            Self::DuplicatePath(p) => write!(f, "{} already seen", p.display()),
            Self::StatError(e) => write!(f, "{e}"),
            Self::Directory(p) => write!(f, "{} is a directory", p.display()),
            Self::Symlink(p) => write!(f, "{} is a symlink", p.display()),
            Self::SpecialFile(p) => write!(f, "{} is a special file", p.display()),
            Self::BlacklistedFilesystem { path, fstype } => {
                write!(f, "{} is on a {} filesystem", path.display(), fstype)
            }
            Self::ZeroLength(p) => write!(f, "{} is empty", p.display()),
        }
    }
}

/// Stateful classifier for the path stream.
///
/// Holds the set of paths seen so far, which guarantees the analyser receives
/// each path at most once, and the filesystem blacklist cache.
#[derive(Debug, Default)]
pub struct PathIntake {
    blacklist: BlacklistCache,
    seen: HashSet<PathBuf>,
}

impl PathIntake {
    /// Create an intake using the given filesystem blacklist.
    #[must_use]
    pub fn new(blacklist: Vec<String>) -> Self {
        Self {
            blacklist: BlacklistCache::new(blacklist),
            seen: HashSet::new(),
        }
    }

    /// Classify one raw input line (without or with its trailing newline).
    pub fn classify_line(&mut self, line: &[u8]) -> Intake {
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            return Intake::Skip(SkipReason::BlankLine);
        }
        self.classify_path(path_from_bytes(trimmed))
    }

    /// Classify a path.
    pub fn classify_path(&mut self, path: PathBuf) -> Intake {
        if self.seen.contains(&path) {
            return Intake::Skip(SkipReason::DuplicatePath(path));
        }
        self.seen.insert(path.clone());

        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                let err = ScanError::from_io(&path, e);
                log::warn!("Error getting file info: {}", err);
                return Intake::Skip(SkipReason::StatError(err));
            }
        };

        let file_type = metadata.file_type();
        if file_type.is_dir() {
            return Intake::Skip(SkipReason::Directory(path));
        }
        if file_type.is_symlink() {
            return Intake::Skip(SkipReason::Symlink(path));
        }
        if !file_type.is_file() {
            log::warn!("Skipping special file: {}", path.display());
            return Intake::Skip(SkipReason::SpecialFile(path));
        }

        match fs_type(&path) {
            Ok(fstype) => {
                if self.blacklist.is_blacklisted(&fstype) {
                    log::warn!("Skipping {}, it is on a {} filesystem", path.display(), fstype);
                    return Intake::Skip(SkipReason::BlacklistedFilesystem { path, fstype });
                }
            }
            Err(e) => log::warn!("Couldn't determine filesystem type: {}", e),
        }

        let size = metadata.len();
        if size == 0 {
            return Intake::Skip(SkipReason::ZeroLength(path));
        }

        log::trace!("Accepted {} ({} bytes)", path.display(), size);
        Intake::Accept(FileEntry::new(path, size))
    }

    /// Number of distinct paths read so far.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    Path::new(OsStr::from_bytes(bytes)).to_path_buf()
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}
