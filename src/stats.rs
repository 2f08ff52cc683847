//! Skip and failure counters for the ingestion side.
//!
//! Counters are keyed by a short label ("directory", "stat error", ...) and
//! shared between the ingestion thread and the error handler thread.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};

/// Thread-safe named counters.
#[derive(Debug, Default)]
pub struct ScanStats {
    counts: Mutex<BTreeMap<String, u64>>,
}

impl ScanStats {
    /// Create an empty set of counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to the counter called `name`.
    pub fn increment(&self, name: &str) {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        *counts.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Current value of one counter.
    #[must_use]
    pub fn get(&self, name: &str) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all counters.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// Render the counters, sorted by name.
    #[must_use]
    pub fn dump(&self) -> String {
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        if counts.is_empty() {
            return "No files stats".to_string();
        }

        let mut result = String::from("Skipped files:\n");
        for (name, count) in counts.iter() {
            let _ = writeln!(result, "  {name}: {count}");
        }
        result
    }
}
