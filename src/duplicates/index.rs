//! Concurrent two-level size → fingerprint → paths index.
//!
//! # Overview
//!
//! The outer level maps a file size to a handle into an arena of
//! [`SizeBucket`]s. Each bucket owns its own mutex guarding the
//! fingerprint → paths map for that one size, so workers hashing files of
//! unrelated sizes never contend.
//!
//! ## Bucket creation
//!
//! [`SizeHashIndex::ensure_bucket`] uses double-checked locking: a shared read
//! lock for the common "size already known" case, then on a miss the exclusive
//! write lock and a second lookup before creating the bucket. The re-check is
//! required for correctness, not speed: two workers can both observe a size as
//! absent under the read lock, and without it the second would replace the
//! first worker's bucket and lose its insertions.
//!
//! ## Lock scope
//!
//! A call holds at most one lock at a time. `insert` resolves the bucket
//! handle (outer lock released) before taking the bucket lock, so there is no
//! lock ordering across buckets, and no lock is ever held across file I/O.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::scanner::Fingerprint;

/// Stable handle to a bucket in the index arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketId(usize);

/// All files seen so far with one exact size.
#[derive(Debug)]
pub struct SizeBucket {
    size: u64,
    slots: Mutex<HashMap<Fingerprint, Vec<PathBuf>>>,
}

impl SizeBucket {
    fn new(size: u64) -> Self {
        Self {
            size,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// File size shared by every path in this bucket.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Append `path` to the slot for `fingerprint`, creating the slot if needed.
    pub fn insert(&self, fingerprint: Fingerprint, path: PathBuf) {
        // A poisoned bucket still holds only whole appends
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(fingerprint).or_default().push(path);
    }

    fn into_slots(self) -> HashMap<Fingerprint, Vec<PathBuf>> {
        self.slots
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Default)]
struct Arena {
    by_size: HashMap<u64, BucketId>,
    buckets: Vec<Arc<SizeBucket>>,
}

/// The shared size/fingerprint index mutated by analyser workers.
#[derive(Debug, Default)]
pub struct SizeHashIndex {
    arena: RwLock<Arena>,
}

impl SizeHashIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the bucket for `size`, if one has been created.
    #[must_use]
    pub fn bucket_id(&self, size: u64) -> Option<BucketId> {
        self.read_arena().by_size.get(&size).copied()
    }

    /// Return the bucket for `size`, creating it on first touch.
    ///
    /// Safe under concurrent first touch: exactly one bucket is ever created
    /// per size, and every caller receives that same bucket.
    pub fn ensure_bucket(&self, size: u64) -> (BucketId, Arc<SizeBucket>) {
        {
            let arena = self.read_arena();
            if let Some(&id) = arena.by_size.get(&size) {
                return (id, Arc::clone(&arena.buckets[id.0]));
            }
        }

        let mut arena = self.arena.write().unwrap_or_else(PoisonError::into_inner);
        // Re-check: another worker may have created it between the two locks
        if let Some(&id) = arena.by_size.get(&size) {
            return (id, Arc::clone(&arena.buckets[id.0]));
        }

        let id = BucketId(arena.buckets.len());
        let bucket = Arc::new(SizeBucket::new(size));
        arena.buckets.push(Arc::clone(&bucket));
        arena.by_size.insert(size, id);
        log::trace!("Created size bucket {} for {} bytes", id.0, size);
        (id, bucket)
    }

    /// Record `path` under (`size`, `fingerprint`).
    pub fn insert(&self, size: u64, fingerprint: Fingerprint, path: PathBuf) {
        let (_, bucket) = self.ensure_bucket(size);
        bucket.insert(fingerprint, path);
    }

    /// Number of size buckets created so far.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.read_arena().buckets.len()
    }

    /// Freeze the index into plain owned data.
    ///
    /// Taking `self` by value proves no writer remains, so no locks are
    /// taken. Callers must have dropped every bucket handle first; a bucket
    /// still shared elsewhere is copied out under its lock instead.
    #[must_use]
    pub fn into_frozen(self) -> FrozenIndex {
        let arena = self
            .arena
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        let buckets = arena
            .buckets
            .into_iter()
            .map(|bucket| match Arc::try_unwrap(bucket) {
                Ok(owned) => FrozenBucket {
                    size: owned.size,
                    slots: owned.into_slots(),
                },
                Err(shared) => FrozenBucket {
                    size: shared.size,
                    slots: shared
                        .slots
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone(),
                },
            })
            .collect();

        FrozenIndex { buckets }
    }

    fn read_arena(&self) -> std::sync::RwLockReadGuard<'_, Arena> {
        self.arena.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One size bucket after the analyser has drained.
#[derive(Debug, Clone)]
pub struct FrozenBucket {
    /// Size shared by every path in the bucket
    pub size: u64,
    /// Fingerprint → paths in insertion order
    pub slots: HashMap<Fingerprint, Vec<PathBuf>>,
}

/// Read-only snapshot of the index, in bucket creation order.
#[derive(Debug, Clone, Default)]
pub struct FrozenIndex {
    buckets: Vec<FrozenBucket>,
}

impl FrozenIndex {
    /// All buckets, in creation order.
    #[must_use]
    pub fn buckets(&self) -> &[FrozenBucket] {
        &self.buckets
    }

    /// Number of size buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of paths across every slot.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.buckets
            .iter()
            .flat_map(|b| b.slots.values())
            .map(Vec::len)
            .sum()
    }

    /// Total bytes across every indexed path.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.buckets
            .iter()
            .map(|b| b.size * b.slots.values().map(|v| v.len() as u64).sum::<u64>())
            .sum()
    }
}
