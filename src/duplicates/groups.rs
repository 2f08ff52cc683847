//! Candidate group extraction from a drained index.
//!
//! # Overview
//!
//! After the analyser drains, every (size, fingerprint) slot of the index
//! becomes one [`CandidateGroup`]. Singletons are included; only groups with
//! two or more members are reported as probable duplicates.
//!
//! # Example
//!
//! ```
//! use dupspot::duplicates::{extract_groups, SizeHashIndex};
//! use std::path::PathBuf;
//!
//! let index = SizeHashIndex::new();
//! index.insert(1024, 0xfeed, PathBuf::from("/a.bin"));
//! index.insert(1024, 0xfeed, PathBuf::from("/b.bin"));
//! index.insert(2048, 0xbeef, PathBuf::from("/c.bin"));
//!
//! let groups = extract_groups(&index.into_frozen());
//! assert_eq!(groups.len(), 2);
//! assert_eq!(groups.iter().filter(|g| g.is_duplicate()).count(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::index::FrozenIndex;
use crate::scanner::{fingerprint_to_hex, Fingerprint};

/// Paths sharing one size and one fingerprint: probable duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateGroup {
    /// File size in bytes (shared by all files in the group)
    pub size: u64,
    /// Content fingerprint shared by all files in the group
    #[serde(with = "hex_fingerprint")]
    pub fingerprint: Fingerprint,
    /// Paths in insertion order
    pub paths: Vec<PathBuf>,
}

impl CandidateGroup {
    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether the group is reportable (2+ files).
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.paths.len() > 1
    }

    /// Bytes that removing all but one copy would free.
    #[must_use]
    pub fn wasted_bytes(&self) -> u64 {
        self.size * (self.paths.len() as u64).saturating_sub(1)
    }
}

/// Flatten every slot of every bucket into candidate groups.
///
/// Order across groups follows bucket creation and hash map iteration and is
/// not meaningful; order within a group is insertion order.
#[must_use]
pub fn extract_groups(index: &FrozenIndex) -> Vec<CandidateGroup> {
    index
        .buckets()
        .iter()
        .flat_map(|bucket| {
            bucket
                .slots
                .iter()
                .map(move |(&fingerprint, paths)| CandidateGroup {
                    size: bucket.size,
                    fingerprint,
                    paths: paths.clone(),
                })
        })
        .collect()
}

/// Reportable groups straight from the index, in [`reportable_groups`] order.
///
/// Singleton slots are skipped before their paths are cloned.
#[must_use]
pub fn extract_duplicate_groups(index: &FrozenIndex) -> Vec<CandidateGroup> {
    let groups = index
        .buckets()
        .iter()
        .flat_map(|bucket| {
            bucket
                .slots
                .iter()
                .filter(|(_, paths)| paths.len() > 1)
                .map(move |(&fingerprint, paths)| CandidateGroup {
                    size: bucket.size,
                    fingerprint,
                    paths: paths.clone(),
                })
        })
        .collect();
    reportable_groups(groups)
}

/// Keep groups with 2+ members, ordered by size (largest first) then
/// fingerprint, with the paths of each group sorted.
#[must_use]
pub fn reportable_groups(groups: Vec<CandidateGroup>) -> Vec<CandidateGroup> {
    let mut reportable: Vec<CandidateGroup> = groups
        .into_iter()
        .filter(CandidateGroup::is_duplicate)
        .map(|mut group| {
            group.paths.sort();
            group
        })
        .collect();
    reportable.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });
    reportable
}

mod hex_fingerprint {
    use super::{fingerprint_to_hex, Fingerprint};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(fp: &Fingerprint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&fingerprint_to_hex(*fp))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fingerprint, D::Error> {
        let s = String::deserialize(deserializer)?;
        u64::from_str_radix(&s, 16).map_err(de::Error::custom)
    }
}
