//! Concurrent duplicate analyser: worker pool, error channel and drain.
//!
//! # Overview
//!
//! [`DuplicateAnalyser`] starts a fixed pool of worker threads at
//! construction. The ingestion side calls [`DuplicateAnalyser::submit`] for
//! each `(path, size)`; items travel through a bounded intake queue, so
//! `submit` blocks when every worker is busy and the queue is full. Each
//! worker fingerprints its item outside any lock and inserts it into the
//! shared [`SizeHashIndex`]. Failures go to an unbounded error channel and
//! never stop a worker.
//!
//! # Shutdown
//!
//! [`DuplicateAnalyser::finish`] consumes the analyser, so it runs once and
//! no `submit` can follow it. It drains in two distinct steps:
//!
//! 1. close the intake queue and join every worker (all insertions done);
//! 2. with the last worker gone the error channel is closed; join the error
//!    handler thread so every delivered error has been handled.
//!
//! Only then is the index frozen into an [`Analysis`].
//!
//! # Example
//!
//! ```no_run
//! use dupspot::duplicates::{AnalyserConfig, DuplicateAnalyser};
//! use dupspot::scanner::FileEntry;
//! use std::path::PathBuf;
//!
//! let mut analyser = DuplicateAnalyser::new(AnalyserConfig::default().with_workers(4));
//! analyser.consume_errors(|e| eprintln!("error analysing: {e}")).unwrap();
//!
//! analyser.submit(FileEntry::new(PathBuf::from("a.txt"), 10)).unwrap();
//! analyser.submit(FileEntry::new(PathBuf::from("b.txt"), 10)).unwrap();
//!
//! let analysis = analyser.finish().unwrap();
//! for group in analysis.duplicate_groups() {
//!     println!("{:?}", group.paths);
//! }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytesize::ByteSize;
use crossbeam_channel::{Receiver, Sender};

use super::groups::{extract_duplicate_groups, extract_groups, CandidateGroup};
use super::index::{FrozenIndex, SizeHashIndex};
use crate::progress::ProgressCallback;
use crate::scanner::{FileEntry, Fingerprinter, HashError};

/// Default number of hashing workers.
pub const DEFAULT_WORKERS: usize = 8;

/// Configuration for the analyser.
#[derive(Clone)]
pub struct AnalyserConfig {
    /// Number of worker threads hashing files.
    pub workers: usize,
    /// Intake queue capacity; 0 hands each item directly to a waiting worker.
    pub queue_capacity: usize,
    /// Fingerprinting policy shared by all workers.
    pub fingerprinter: Fingerprinter,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl fmt::Debug for AnalyserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyserConfig")
            .field("workers", &self.workers)
            .field("queue_capacity", &self.queue_capacity)
            .field("fingerprinter", &self.fingerprinter)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: 0,
            fingerprinter: Fingerprinter::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl AnalyserConfig {
    /// Set the worker count (at least 1).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the intake queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the fingerprinting policy.
    #[must_use]
    pub fn with_fingerprinter(mut self, fingerprinter: Fingerprinter) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// Errors returned by the analyser lifecycle.
#[derive(thiserror::Error, Debug)]
pub enum AnalyserError {
    /// The run was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Analysis interrupted by user")]
    Interrupted,

    /// Zero-length files must be filtered out before submission.
    #[error("Zero-length file submitted: {0}")]
    ZeroLength(PathBuf),

    /// The intake queue has no receivers left.
    #[error("Intake queue closed: no workers are running")]
    Closed,

    /// An error handler has already been registered.
    #[error("An error handler is already registered")]
    HandlerAlreadyRegistered,

    /// A worker thread panicked; its in-flight item is lost.
    #[error("Worker thread panicked")]
    WorkerPanicked,

    /// The error handler panicked before draining the channel.
    #[error("Error handler thread panicked")]
    HandlerPanicked,

    /// A thread could not be spawned.
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Worker-side handle onto the error channel.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    tx: Sender<HashError>,
}

impl ErrorReporter {
    /// Deliver one per-item failure. Never blocks.
    pub fn report(&self, err: HashError) {
        // Receiver lives as long as the analyser or its handler thread
        let _ = self.tx.send(err);
    }
}

/// Per-worker counters, summed into [`AnalysisStats`] at drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct WorkerStats {
    hashed: usize,
    sampled: usize,
    failed: usize,
    skipped: usize,
    bytes: u64,
}

impl WorkerStats {
    fn merge(&mut self, other: WorkerStats) {
        self.hashed += other.hashed;
        self.sampled += other.sampled;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.bytes += other.bytes;
    }
}

/// Counters describing a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    /// Items accepted by `submit`
    pub submitted: usize,
    /// Items fingerprinted and inserted into the index
    pub hashed_files: usize,
    /// Of those, items fingerprinted with the sampled pass
    pub sampled_files: usize,
    /// Items whose fingerprint failed (reported on the error channel)
    pub failed_files: usize,
    /// Items drained without hashing after shutdown was requested
    pub skipped_files: usize,
    /// Sum of sizes of hashed items
    pub hashed_bytes: u64,
    /// Errors seen by the registered handler
    pub handled_errors: usize,
}

/// Everything the analyser learned, frozen after drain.
#[derive(Debug)]
pub struct Analysis {
    index: FrozenIndex,
    stats: AnalysisStats,
    unhandled_errors: Vec<HashError>,
    interrupted: bool,
}

impl Analysis {
    /// Every (size, fingerprint) slot as a list of paths, singletons included.
    #[must_use]
    pub fn groups(&self) -> Vec<Vec<PathBuf>> {
        self.candidate_groups()
            .into_iter()
            .map(|group| group.paths)
            .collect()
    }

    /// Every slot with its size and fingerprint, singletons included.
    #[must_use]
    pub fn candidate_groups(&self) -> Vec<CandidateGroup> {
        extract_groups(&self.index)
    }

    /// Groups of 2+ probable duplicates in stable order.
    #[must_use]
    pub fn duplicate_groups(&self) -> Vec<CandidateGroup> {
        extract_duplicate_groups(&self.index)
    }

    /// Run counters.
    #[must_use]
    pub fn stats(&self) -> &AnalysisStats {
        &self.stats
    }

    /// The frozen index.
    #[must_use]
    pub fn index(&self) -> &FrozenIndex {
        &self.index
    }

    /// Errors reported while no handler was registered.
    #[must_use]
    pub fn unhandled_errors(&self) -> &[HashError] {
        &self.unhandled_errors
    }

    /// Whether shutdown was requested during the run.
    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Summary of the run for display.
    #[must_use]
    pub fn summary(&self) -> AnalysisSummary {
        self.summary_of(&self.duplicate_groups())
    }

    /// Summary using groups already taken from [`Self::duplicate_groups`].
    #[must_use]
    pub fn summary_of(&self, duplicates: &[CandidateGroup]) -> AnalysisSummary {
        AnalysisSummary {
            files_analysed: self.index.file_count(),
            total_bytes: self.index.total_bytes(),
            size_buckets: self.index.bucket_count(),
            duplicate_groups: duplicates.len(),
            duplicate_files: duplicates.iter().map(CandidateGroup::len).sum(),
            wasted_bytes: duplicates.iter().map(CandidateGroup::wasted_bytes).sum(),
            failed_files: self.stats.failed_files,
        }
    }
}

/// Human-oriented summary of an [`Analysis`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Paths present in the index
    pub files_analysed: usize,
    /// Bytes across all indexed paths
    pub total_bytes: u64,
    /// Distinct file sizes
    pub size_buckets: usize,
    /// Groups with 2+ members
    pub duplicate_groups: usize,
    /// Files in those groups
    pub duplicate_files: usize,
    /// Bytes held by redundant copies
    pub wasted_bytes: u64,
    /// Files that could not be fingerprinted
    pub failed_files: usize,
}

impl fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files analysed ({}), {} size buckets, {} duplicate groups ({} files, {} redundant)",
            self.files_analysed,
            ByteSize::b(self.total_bytes),
            self.size_buckets,
            self.duplicate_groups,
            self.duplicate_files,
            ByteSize::b(self.wasted_bytes),
        )?;
        if self.failed_files > 0 {
            write!(f, ", {} unreadable", self.failed_files)?;
        }
        Ok(())
    }
}

/// Shared state handed to each worker.
struct WorkerContext {
    index: Arc<SizeHashIndex>,
    fingerprinter: Fingerprinter,
    errors: ErrorReporter,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    completed: Arc<AtomicUsize>,
}

impl WorkerContext {
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn run(self, intake: Receiver<FileEntry>) -> WorkerStats {
        let mut stats = WorkerStats::default();

        for entry in intake.iter() {
            if self.is_shutdown_requested() {
                // Drain without hashing; nothing reaches the index half-done
                stats.skipped += 1;
                continue;
            }
            self.process(entry, &mut stats);
        }

        stats
    }

    fn process(&self, entry: FileEntry, stats: &mut WorkerStats) {
        let FileEntry { path, size } = entry;

        match self.fingerprinter.fingerprint(&path, size) {
            Ok(fingerprint) => {
                if let Some(ref callback) = self.progress_callback {
                    let current = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
                    callback.on_progress(current, path.to_string_lossy().as_ref());
                    callback.on_item_completed(size);
                }
                stats.hashed += 1;
                stats.bytes += size;
                if self.fingerprinter.is_sampled(size) {
                    stats.sampled += 1;
                }
                self.index.insert(size, fingerprint, path);
            }
            Err(e) => {
                log::debug!("Failed to fingerprint: {}", e);
                stats.failed += 1;
                self.errors.report(e);
            }
        }
    }
}

/// Concurrent duplicate analyser.
///
/// See the [module documentation](self) for the lifecycle.
pub struct DuplicateAnalyser {
    intake: Sender<FileEntry>,
    workers: Vec<JoinHandle<WorkerStats>>,
    index: Arc<SizeHashIndex>,
    error_rx: Option<Receiver<HashError>>,
    error_handler: Option<JoinHandle<usize>>,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    submitted: usize,
}

impl fmt::Debug for DuplicateAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplicateAnalyser")
            .field("workers", &self.workers.len())
            .field("submitted", &self.submitted)
            .field("handler_registered", &self.error_handler.is_some())
            .finish()
    }
}

impl DuplicateAnalyser {
    /// Create an analyser and start its worker pool.
    ///
    /// # Panics
    ///
    /// Panics if a worker thread cannot be spawned. Use [`Self::try_new`] to
    /// handle that case.
    #[must_use]
    pub fn new(config: AnalyserConfig) -> Self {
        match Self::try_new(config) {
            Ok(analyser) => analyser,
            Err(e) => panic!("failed to start analyser: {e}"),
        }
    }

    /// Create an analyser and start its worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyserError::Spawn`] if a worker thread cannot be spawned.
    pub fn try_new(config: AnalyserConfig) -> Result<Self, AnalyserError> {
        let worker_count = config.workers.max(1);
        let (intake_tx, intake_rx) = crossbeam_channel::bounded::<FileEntry>(config.queue_capacity);
        let (error_tx, error_rx) = crossbeam_channel::unbounded::<HashError>();
        let index = Arc::new(SizeHashIndex::new());
        let completed = Arc::new(AtomicUsize::new(0));

        if let Some(ref callback) = config.progress_callback {
            callback.on_phase_start("hashing");
        }

        let mut workers = Vec::with_capacity(worker_count);
        for worker_idx in 0..worker_count {
            let context = WorkerContext {
                index: Arc::clone(&index),
                fingerprinter: config.fingerprinter,
                errors: ErrorReporter {
                    tx: error_tx.clone(),
                },
                shutdown_flag: config.shutdown_flag.clone(),
                progress_callback: config.progress_callback.clone(),
                completed: Arc::clone(&completed),
            };
            let rx = intake_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("dupspot-worker-{worker_idx}"))
                .spawn(move || context.run(rx))?;
            workers.push(handle);
        }

        // Workers hold the only senders, so the error channel closes exactly
        // when the last worker exits.
        drop(error_tx);

        log::debug!(
            "Started {} workers (queue capacity {}, threshold {} bytes, skip {} blocks)",
            worker_count,
            config.queue_capacity,
            config.fingerprinter.size_threshold(),
            config.fingerprinter.skip_blocks()
        );

        Ok(Self {
            intake: intake_tx,
            workers,
            index,
            error_rx: Some(error_rx),
            error_handler: None,
            shutdown_flag: config.shutdown_flag,
            progress_callback: config.progress_callback,
            submitted: 0,
        })
    }

    /// Create an analyser with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(AnalyserConfig::default())
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Register the handler invoked once per reported error.
    ///
    /// The handler runs on its own thread until the error channel closes,
    /// which happens during [`Self::finish`].
    ///
    /// # Errors
    ///
    /// Returns [`AnalyserError::HandlerAlreadyRegistered`] on a second call,
    /// or [`AnalyserError::Spawn`] if the handler thread cannot be started.
    pub fn consume_errors<F>(&mut self, mut handler: F) -> Result<(), AnalyserError>
    where
        F: FnMut(HashError) + Send + 'static,
    {
        let rx = self
            .error_rx
            .take()
            .ok_or(AnalyserError::HandlerAlreadyRegistered)?;

        let handle = thread::Builder::new()
            .name("dupspot-errors".to_string())
            .spawn(move || {
                let mut handled = 0usize;
                for err in rx.iter() {
                    handler(err);
                    handled += 1;
                }
                handled
            })?;

        self.error_handler = Some(handle);
        Ok(())
    }

    /// Queue one file for analysis, blocking while the pool is saturated.
    ///
    /// # Errors
    ///
    /// - [`AnalyserError::ZeroLength`] if `entry.size` is 0
    /// - [`AnalyserError::Interrupted`] once shutdown has been requested
    /// - [`AnalyserError::Closed`] if every worker has exited
    pub fn submit(&mut self, entry: FileEntry) -> Result<(), AnalyserError> {
        if entry.size == 0 {
            return Err(AnalyserError::ZeroLength(entry.path));
        }
        if self.is_shutdown_requested() {
            return Err(AnalyserError::Interrupted);
        }

        self.intake
            .send(entry)
            .map_err(|_| AnalyserError::Closed)?;
        self.submitted += 1;
        Ok(())
    }

    /// Close intake, wait for workers, then for the error handler, and freeze
    /// the index.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyserError::WorkerPanicked`] or
    /// [`AnalyserError::HandlerPanicked`] if a thread died instead of draining.
    pub fn finish(self) -> Result<Analysis, AnalyserError> {
        let Self {
            intake,
            workers,
            index,
            error_rx,
            error_handler,
            shutdown_flag,
            progress_callback,
            submitted,
        } = self;

        // Drain 1: no more intake, every worker finishes its queued items
        drop(intake);
        let mut totals = WorkerStats::default();
        let mut worker_panicked = false;
        for handle in workers {
            match handle.join() {
                Ok(stats) => totals.merge(stats),
                Err(_) => worker_panicked = true,
            }
        }
        log::debug!(
            "Workers drained: {} hashed, {} failed, {} skipped",
            totals.hashed,
            totals.failed,
            totals.skipped
        );

        if let Some(ref callback) = progress_callback {
            callback.on_phase_end("hashing");
        }

        // Drain 2: channel is closed now, wait until the handler has seen it all
        let mut handled_errors = 0;
        let mut handler_panicked = false;
        if let Some(handle) = error_handler {
            match handle.join() {
                Ok(count) => handled_errors = count,
                Err(_) => handler_panicked = true,
            }
        }
        let unhandled_errors: Vec<HashError> = error_rx
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default();

        if worker_panicked {
            return Err(AnalyserError::WorkerPanicked);
        }
        if handler_panicked {
            return Err(AnalyserError::HandlerPanicked);
        }

        let index = Arc::into_inner(index).ok_or(AnalyserError::WorkerPanicked)?;
        let interrupted = shutdown_flag.is_some_and(|f| f.load(Ordering::SeqCst));
        if interrupted {
            log::info!("Analysis interrupted by shutdown signal");
        }

        Ok(Analysis {
            index: index.into_frozen(),
            stats: AnalysisStats {
                submitted,
                hashed_files: totals.hashed,
                sampled_files: totals.sampled,
                failed_files: totals.failed,
                skipped_files: totals.skipped,
                hashed_bytes: totals.bytes,
                handled_errors,
            },
            unhandled_errors,
            interrupted,
        })
    }
}
