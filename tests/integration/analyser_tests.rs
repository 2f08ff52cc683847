use crossbeam_channel::{Receiver, Sender};
use dupspot::duplicates::{AnalyserConfig, AnalyserError, DuplicateAnalyser};
use dupspot::progress::ProgressCallback;
use dupspot::scanner::{FileEntry, Fingerprinter, HashError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &[u8]) -> FileEntry {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    FileEntry::new(path, content.len() as u64)
}

fn all_paths(groups: Vec<Vec<PathBuf>>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = groups.into_iter().flatten().collect();
    paths.sort();
    paths
}

#[test]
fn test_groups_partition_accepted_paths() {
    let dir = TempDir::new().unwrap();
    let mut entries = Vec::new();
    for i in 0..40 {
        // 4 distinct contents, two of them sharing a size
        let content = match i % 4 {
            0 => "alpha".to_string(),
            1 => "bravo".to_string(),
            2 => "charlie-long".to_string(),
            _ => format!("unique-{i:04}"),
        };
        entries.push(write(dir.path(), &format!("f{i:02}"), content.as_bytes()));
    }

    let mut analyser = DuplicateAnalyser::new(AnalyserConfig::default().with_workers(6));
    for entry in &entries {
        analyser.submit(entry.clone()).unwrap();
    }
    let analysis = analyser.finish().unwrap();

    let mut expected: Vec<PathBuf> = entries.iter().map(|e| e.path.clone()).collect();
    expected.sort();
    assert_eq!(all_paths(analysis.groups()), expected);

    // alpha and bravo share a size but not a fingerprint
    let duplicates = analysis.duplicate_groups();
    assert_eq!(duplicates.len(), 3);
    for group in &duplicates {
        assert_eq!(group.len(), 10);
    }
    assert_eq!(analysis.index().bucket_count(), 3);
}

#[test]
fn test_every_group_member_has_group_size() {
    let dir = TempDir::new().unwrap();
    let mut analyser = DuplicateAnalyser::new(AnalyserConfig::default().with_workers(4));
    for i in 1..=20usize {
        let content = vec![b'x'; i % 7 + 1];
        analyser
            .submit(write(dir.path(), &format!("g{i}"), &content))
            .unwrap();
    }
    let analysis = analyser.finish().unwrap();

    for group in analysis.candidate_groups() {
        for path in &group.paths {
            assert_eq!(fs::metadata(path).unwrap().len(), group.size);
        }
    }
}

#[test]
fn test_unreadable_files_reported_and_excluded() {
    let dir = TempDir::new().unwrap();
    let ok = write(dir.path(), "ok.txt", b"payload");
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);

    let mut analyser = DuplicateAnalyser::new(AnalyserConfig::default().with_workers(3));
    analyser
        .consume_errors(move |e: HashError| sink.lock().unwrap().push(e))
        .unwrap();

    analyser.submit(ok.clone()).unwrap();
    for i in 0..5 {
        analyser
            .submit(FileEntry::new(dir.path().join(format!("missing-{i}")), 7))
            .unwrap();
    }
    let analysis = analyser.finish().unwrap();

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 5);
    assert!(errors.iter().all(|e| matches!(e, HashError::NotFound { .. })));
    assert_eq!(all_paths(analysis.groups()), vec![ok.path]);
    assert_eq!(analysis.stats().failed_files, 5);
    assert_eq!(analysis.stats().handled_errors, 5);
}

#[test]
fn test_handler_finishes_before_finish_returns() {
    let dir = TempDir::new().unwrap();
    let handled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&handled);

    let mut analyser = DuplicateAnalyser::new(AnalyserConfig::default().with_workers(2));
    analyser
        .consume_errors(move |_| {
            std::thread::sleep(std::time::Duration::from_millis(5));
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    for i in 0..10 {
        analyser
            .submit(FileEntry::new(dir.path().join(format!("nope-{i}")), 1))
            .unwrap();
    }
    analyser.finish().unwrap();

    assert_eq!(handled.load(Ordering::SeqCst), 10);
}

#[test]
fn test_sampled_files_differing_between_samples_are_grouped() {
    let dir = TempDir::new().unwrap();
    let fingerprinter = Fingerprinter::new()
        .with_size_threshold(16 * 1024)
        .with_skip_blocks(2);

    // Blocks 0, 2, 4 are sampled; block 1 differs between the files
    let mut first = vec![7u8; 5 * 8192];
    let mut second = first.clone();
    first[8192 + 10] = 1;
    second[8192 + 10] = 2;
    let a = write(dir.path(), "a.bin", &first);
    let b = write(dir.path(), "b.bin", &second);

    // A change inside a sampled block separates the files
    let mut third = first.clone();
    third[2 * 8192 + 5] = 9;
    let c = write(dir.path(), "c.bin", &third);

    let mut analyser = DuplicateAnalyser::new(
        AnalyserConfig::default()
            .with_workers(2)
            .with_fingerprinter(fingerprinter),
    );
    for entry in [a.clone(), b.clone(), c] {
        analyser.submit(entry).unwrap();
    }
    let analysis = analyser.finish().unwrap();

    let duplicates = analysis.duplicate_groups();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].paths, vec![a.path, b.path]);
    assert_eq!(analysis.stats().sampled_files, 3);
}

#[test]
fn test_queue_capacity_does_not_change_results() {
    let dir = TempDir::new().unwrap();
    let entries: Vec<FileEntry> = (0..30)
        .map(|i| write(dir.path(), &format!("q{i}"), format!("c{}", i % 3).as_bytes()))
        .collect();

    let mut results = Vec::new();
    for capacity in [0, 1, 64] {
        let mut analyser = DuplicateAnalyser::new(
            AnalyserConfig::default()
                .with_workers(4)
                .with_queue_capacity(capacity),
        );
        for entry in &entries {
            analyser.submit(entry.clone()).unwrap();
        }
        results.push(analyser.finish().unwrap().duplicate_groups());
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
    assert_eq!(results[0].len(), 3);
}

#[test]
fn test_shutdown_mid_run_stops_submission() {
    let dir = TempDir::new().unwrap();
    let flag = Arc::new(AtomicBool::new(false));
    let mut analyser = DuplicateAnalyser::new(
        AnalyserConfig::default()
            .with_workers(2)
            .with_shutdown_flag(Arc::clone(&flag)),
    );

    analyser.submit(write(dir.path(), "before", b"data")).unwrap();
    flag.store(true, Ordering::SeqCst);
    let err = analyser
        .submit(write(dir.path(), "after", b"data"))
        .unwrap_err();
    assert!(matches!(err, AnalyserError::Interrupted));

    let analysis = analyser.finish().unwrap();
    assert!(analysis.was_interrupted());
    assert_eq!(analysis.stats().submitted, 1);
    assert!(analysis.groups().into_iter().flatten().count() <= 1);
}

/// Parks the worker on its first successful item until released.
struct HoldFirst {
    release: Mutex<Option<Receiver<()>>>,
    held: Sender<()>,
}

impl ProgressCallback for HoldFirst {
    fn on_phase_start(&self, _phase: &str) {}

    fn on_progress(&self, _current: usize, _path: &str) {
        let release = self.release.lock().unwrap().take();
        if let Some(release) = release {
            self.held.send(()).unwrap();
            release.recv().unwrap();
        }
    }

    fn on_phase_end(&self, _phase: &str) {}
}

#[test]
fn test_shutdown_accounts_for_every_submitted_item() {
    let dir = TempDir::new().unwrap();
    let (release_tx, release_rx) = crossbeam_channel::bounded(1);
    let (held_tx, held_rx) = crossbeam_channel::bounded(1);
    let flag = Arc::new(AtomicBool::new(false));
    let mut analyser = DuplicateAnalyser::new(
        AnalyserConfig::default()
            .with_workers(1)
            .with_queue_capacity(64)
            .with_shutdown_flag(Arc::clone(&flag))
            .with_progress_callback(Arc::new(HoldFirst {
                release: Mutex::new(Some(release_rx)),
                held: held_tx,
            })),
    );

    analyser
        .submit(FileEntry::new(dir.path().join("missing"), 7))
        .unwrap();
    analyser.submit(write(dir.path(), "first", b"first")).unwrap();
    for i in 0..40 {
        if i % 4 == 0 {
            analyser
                .submit(FileEntry::new(dir.path().join(format!("gone{i}")), 3))
                .unwrap();
        } else {
            analyser
                .submit(write(dir.path(), &format!("q{i}"), b"same"))
                .unwrap();
        }
    }

    held_rx.recv().unwrap();
    flag.store(true, Ordering::SeqCst);
    release_tx.send(()).unwrap();

    let analysis = analyser.finish().unwrap();
    let stats = analysis.stats();
    assert!(analysis.was_interrupted());
    assert_eq!(stats.submitted, 42);
    assert_eq!(stats.failed_files, 1);
    assert_eq!(stats.hashed_files, 1);
    assert!(stats.skipped_files > 0);
    assert_eq!(
        stats.hashed_files + stats.skipped_files + stats.failed_files,
        stats.submitted
    );
    assert_eq!(analysis.index().file_count(), stats.hashed_files);
    assert_eq!(analysis.unhandled_errors().len(), 1);
    assert!(analysis.duplicate_groups().is_empty());
}
