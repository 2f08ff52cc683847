//! JSON output formatter for analysis results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "fingerprint": "9f1c0a5e3b7d2214",
//!       "size": 1024,
//!       "files": ["/path/to/file1.txt", "/path/to/file2.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "files_analysed": 100,
//!     "total_size": 1048576,
//!     "size_buckets": 40,
//!     "duplicate_groups": 5,
//!     "duplicate_files": 10,
//!     "wasted_space": 51200,
//!     "failed_files": 0
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{AnalysisSummary, CandidateGroup};
use crate::scanner::fingerprint_to_hex;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Fingerprint as 16 hex digits
    pub fingerprint: String,
    /// File size in bytes
    pub size: u64,
    /// Paths as read from the input
    pub files: Vec<String>,
}

impl From<&CandidateGroup> for JsonDuplicateGroup {
    fn from(group: &CandidateGroup) -> Self {
        Self {
            fingerprint: fingerprint_to_hex(group.fingerprint),
            size: group.size,
            files: group
                .paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Paths present in the index
    pub files_analysed: usize,
    /// Bytes across all indexed paths
    pub total_size: u64,
    /// Distinct file sizes
    pub size_buckets: usize,
    /// Groups with 2+ members
    pub duplicate_groups: usize,
    /// Files in those groups
    pub duplicate_files: usize,
    /// Bytes held by redundant copies
    pub wasted_space: u64,
    /// Files that could not be fingerprinted
    pub failed_files: usize,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the JSON document from the reportable groups and their summary.
    #[must_use]
    pub fn new(groups: &[CandidateGroup], summary: &AnalysisSummary) -> Self {
        Self {
            duplicates: groups.iter().map(JsonDuplicateGroup::from).collect(),
            summary: JsonSummary {
                files_analysed: summary.files_analysed,
                total_size: summary.total_bytes,
                size_buckets: summary.size_buckets,
                duplicate_groups: summary.duplicate_groups,
                duplicate_files: summary.duplicate_files,
                wasted_space: summary.wasted_bytes,
                failed_files: summary.failed_files,
            },
        }
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)
    }
}
