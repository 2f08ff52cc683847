//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - The concurrent size → fingerprint → paths index ([`index`])
//! - The worker pool, error channel and drain protocol ([`finder`])
//! - Candidate group extraction after drain ([`groups`])

pub mod finder;
pub mod groups;
pub mod index;

pub use finder::{
    AnalyserConfig, AnalyserError, Analysis, AnalysisStats, AnalysisSummary, DuplicateAnalyser,
    ErrorReporter, DEFAULT_WORKERS,
};
pub use groups::{extract_duplicate_groups, extract_groups, reportable_groups, CandidateGroup};
pub use index::{BucketId, FrozenBucket, FrozenIndex, SizeBucket, SizeHashIndex};
