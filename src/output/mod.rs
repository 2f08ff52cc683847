//! Output formatters for analysis results.
//!
//! This module provides the output formats for duplicate groups:
//! - Plain text, one path per line with blank lines between groups
//! - JSON for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use dupspot::duplicates::DuplicateAnalyser;
//! use dupspot::output::{write_results, OutputFormat};
//!
//! let analysis = DuplicateAnalyser::with_defaults().finish().unwrap();
//! let groups = analysis.duplicate_groups();
//! let summary = analysis.summary_of(&groups);
//! write_results(&mut std::io::stdout().lock(), &groups, &summary, OutputFormat::Text).unwrap();
//! ```

pub mod json;
pub mod text;

use std::io::{self, Write};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::duplicates::{AnalysisSummary, CandidateGroup};

// Re-export main types
pub use json::JsonOutput;

/// Output format for duplicate groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One path per line, groups separated by a blank line
    #[default]
    Text,
    /// JSON document with groups and summary
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Write reportable groups in the requested format.
///
/// `summary` is only used by the JSON document.
///
/// # Errors
///
/// Returns any error from the writer or serializer.
pub fn write_results<W: Write>(
    writer: &mut W,
    groups: &[CandidateGroup],
    summary: &AnalysisSummary,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => text::write_groups(writer, groups),
        OutputFormat::Json => JsonOutput::new(groups, summary).write_to(&mut *writer),
    }
}
