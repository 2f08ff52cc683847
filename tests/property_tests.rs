use dupspot::duplicates::{AnalyserConfig, DuplicateAnalyser};
use dupspot::scanner::{FileEntry, Fingerprinter, BLOCK_SIZE};
use proptest::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_fingerprint_determinism(content in prop::collection::vec(any::<u8>(), 1..20_000)) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.bin");
        fs::write(&path, &content).unwrap();

        let fingerprinter = Fingerprinter::new().with_size_threshold(10_000).with_skip_blocks(1);
        let size = content.len() as u64;
        let first = fingerprinter.fingerprint(&path, size).unwrap();
        let second = fingerprinter.fingerprint(&path, size).unwrap();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_skip_one_samples_every_block(content in prop::collection::vec(any::<u8>(), 1..40_000)) {
        // With a stride of one block the sampled pass reads the whole file
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.bin");
        fs::write(&path, &content).unwrap();

        let size = content.len() as u64;
        let full = Fingerprinter::new().with_size_threshold(u64::MAX);
        let sampled = Fingerprinter::new().with_size_threshold(1).with_skip_blocks(1);

        prop_assert_eq!(
            full.fingerprint(&path, size).unwrap(),
            sampled.fingerprint(&path, size).unwrap()
        );
    }

    #[test]
    fn test_bytes_outside_samples_ignored(
        skip in 2u64..5,
        blocks in 3usize..12,
        seed in any::<u8>(),
        flip_at in any::<prop::sample::Index>(),
    ) {
        let size = blocks * BLOCK_SIZE;
        let base: Vec<u8> = (0..size).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect();
        let stride = BLOCK_SIZE * skip as usize;

        // Pick a byte that no sampled block covers
        let unsampled: Vec<usize> = (0..size).filter(|i| i % stride >= BLOCK_SIZE).collect();
        prop_assume!(!unsampled.is_empty());
        let target = unsampled[flip_at.index(unsampled.len())];

        let mut changed = base.clone();
        changed[target] ^= 0xff;

        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        fs::write(&a, &base).unwrap();
        fs::write(&b, &changed).unwrap();

        let fingerprinter = Fingerprinter::new().with_size_threshold(1).with_skip_blocks(skip);
        prop_assert_eq!(
            fingerprinter.fingerprint(&a, size as u64).unwrap(),
            fingerprinter.fingerprint(&b, size as u64).unwrap()
        );
    }

    #[test]
    fn test_paths_conserved_for_any_worker_count(
        contents in prop::collection::vec(0u8..6, 1..30),
        workers in 1usize..9,
        capacity in 0usize..4,
    ) {
        let dir = TempDir::new().unwrap();
        let entries: Vec<FileEntry> = contents
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let path = dir.path().join(format!("f{i}"));
                let data = vec![c; usize::from(c) + 1];
                fs::write(&path, &data).unwrap();
                FileEntry::new(path, data.len() as u64)
            })
            .collect();

        let mut analyser = DuplicateAnalyser::new(
            AnalyserConfig::default()
                .with_workers(workers)
                .with_queue_capacity(capacity),
        );
        for entry in &entries {
            analyser.submit(entry.clone()).unwrap();
        }
        let analysis = analyser.finish().unwrap();

        let paths: Vec<PathBuf> = analysis.groups().into_iter().flatten().collect();
        let unique: HashSet<&PathBuf> = paths.iter().collect();
        prop_assert_eq!(paths.len(), entries.len());
        prop_assert_eq!(unique.len(), entries.len());

        let distinct: HashSet<u8> = contents.iter().copied().collect();
        prop_assert_eq!(analysis.candidate_groups().len(), distinct.len());
    }
}
