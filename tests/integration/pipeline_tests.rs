use dupspot::config::Config;
use dupspot::output::OutputFormat;
use dupspot::pipeline::{run, RunOptions, READ_ERROR_KEY};
use dupspot::progress::Progress;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn test_config() -> Config {
    Config {
        workers: 4,
        blacklist: Vec::new(),
        ..Config::default()
    }
}

fn lines(paths: &[&Path]) -> String {
    paths
        .iter()
        .map(|p| format!("{}\n", p.display()))
        .collect()
}

fn create(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_text_output_groups_in_stable_order() {
    let dir = TempDir::new().unwrap();
    let small_a = create(&dir, "s/a", b"tiny");
    let small_b = create(&dir, "s/b", b"tiny");
    let big_a = create(&dir, "b/a", &[3u8; 4096]);
    let big_b = create(&dir, "b/b", &[3u8; 4096]);
    let lonely = create(&dir, "lonely", b"only one of me");

    let input = lines(&[&small_b, &big_b, &lonely, &small_a, &big_a]);
    let mut out = Vec::new();
    let report = run(&test_config(), Cursor::new(input), &mut out, RunOptions::default()).unwrap();

    let expected = format!(
        "{}\n{}\n\n{}\n{}\n\n",
        big_a.display(),
        big_b.display(),
        small_a.display(),
        small_b.display()
    );
    assert_eq!(String::from_utf8(out).unwrap(), expected);
    assert_eq!(report.groups_written, 2);
    assert_eq!(report.summary.files_analysed, 5);
    assert_eq!(report.summary.duplicate_files, 4);
}

#[test]
fn test_json_output_document() {
    let dir = TempDir::new().unwrap();
    let a = create(&dir, "a.txt", b"0123456789");
    let b = create(&dir, "b.txt", b"0123456789");
    let c = create(&dir, "c.txt", b"abcdefghij");

    let options = RunOptions {
        format: OutputFormat::Json,
        ..RunOptions::default()
    };
    let mut out = Vec::new();
    run(&test_config(), Cursor::new(lines(&[&a, &b, &c])), &mut out, options).unwrap();

    let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let duplicates = doc["duplicates"].as_array().unwrap();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0]["size"], 10);
    assert_eq!(duplicates[0]["fingerprint"].as_str().unwrap().len(), 16);
    assert_eq!(
        duplicates[0]["files"],
        serde_json::json!([a.to_string_lossy(), b.to_string_lossy()])
    );
    assert_eq!(doc["summary"]["files_analysed"], 3);
    assert_eq!(doc["summary"]["size_buckets"], 1);
    assert_eq!(doc["summary"]["wasted_space"], 10);
    assert!(doc["summary"].get("interrupted").is_none());
}

#[test]
fn test_missing_paths_counted_as_stat_errors() {
    let dir = TempDir::new().unwrap();
    let present = create(&dir, "present", b"here");
    let missing = dir.path().join("missing");

    let mut out = Vec::new();
    let report = run(
        &test_config(),
        Cursor::new(lines(&[&present, &missing])),
        &mut out,
        RunOptions::default(),
    )
    .unwrap();

    assert!(out.is_empty());
    assert_eq!(report.stats.get("stat error"), 1);
    assert_eq!(report.stats.get(READ_ERROR_KEY), 0);
    assert_eq!(report.submitted, 1);
}

#[test]
fn test_whitespace_and_crlf_trimmed() {
    let dir = TempDir::new().unwrap();
    let a = create(&dir, "a", b"same");
    let b = create(&dir, "b", b"same");

    let input = format!("  {}\r\n\t{}  \n   \n", a.display(), b.display());
    let mut out = Vec::new();
    let report = run(&test_config(), Cursor::new(input), &mut out, RunOptions::default()).unwrap();

    assert_eq!(report.groups_written, 1);
    assert_eq!(report.stats.get("blank line"), 1);
}

#[test]
fn test_last_line_without_newline_is_read() {
    let dir = TempDir::new().unwrap();
    let a = create(&dir, "a", b"same");
    let b = create(&dir, "b", b"same");

    let input = format!("{}\n{}", a.display(), b.display());
    let mut out = Vec::new();
    let report = run(&test_config(), Cursor::new(input), &mut out, RunOptions::default()).unwrap();

    assert_eq!(report.lines_read, 2);
    assert_eq!(report.groups_written, 1);
}

#[test]
fn test_quiet_progress_tracks_bytes() {
    let dir = TempDir::new().unwrap();
    let a = create(&dir, "a", &[1u8; 100]);
    let b = create(&dir, "b", &[2u8; 50]);

    let progress = Arc::new(Progress::new(true));
    let options = RunOptions {
        progress: Some(progress.clone()),
        ..RunOptions::default()
    };
    let mut out = Vec::new();
    run(&test_config(), Cursor::new(lines(&[&a, &b])), &mut out, options).unwrap();

    assert_eq!(progress.bytes_completed(), 150);
}

#[cfg(unix)]
#[test]
fn test_symlinks_skipped() {
    let dir = TempDir::new().unwrap();
    let target = create(&dir, "target", b"content");
    let link = dir.path().join("link");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let mut out = Vec::new();
    let report = run(
        &test_config(),
        Cursor::new(lines(&[&target, &link])),
        &mut out,
        RunOptions::default(),
    )
    .unwrap();

    assert!(out.is_empty());
    assert_eq!(report.stats.get("symlink"), 1);
}

#[cfg(target_os = "linux")]
#[test]
fn test_blacklisted_filesystem_skipped() {
    let path = Path::new("/proc/self/status");
    let config = Config {
        blacklist: vec!["proc".to_string()],
        ..test_config()
    };

    let mut out = Vec::new();
    let report = run(&config, Cursor::new(lines(&[path])), &mut out, RunOptions::default()).unwrap();

    assert_eq!(report.submitted, 0);
    assert_eq!(report.stats.get("blacklisted filesystem: proc"), 1);
}
