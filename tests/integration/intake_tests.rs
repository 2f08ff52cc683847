use dupspot::scanner::{Intake, PathIntake, SkipReason};
use std::fs;
use tempfile::TempDir;

fn intake() -> PathIntake {
    PathIntake::new(Vec::new())
}

#[test]
fn test_regular_file_accepted_with_size() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("file.txt");
    fs::write(&path, b"12345").unwrap();

    match intake().classify_path(path.clone()) {
        Intake::Accept(entry) => {
            assert_eq!(entry.path, path);
            assert_eq!(entry.size, 5);
        }
        Intake::Skip(reason) => panic!("unexpected skip: {reason}"),
    }
}

#[test]
fn test_repeat_path_skipped_once_seen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("file.txt");
    fs::write(&path, b"x").unwrap();

    let mut intake = intake();
    assert!(matches!(intake.classify_path(path.clone()), Intake::Accept(_)));
    match intake.classify_path(path) {
        Intake::Skip(reason @ SkipReason::DuplicatePath(_)) => {
            assert_eq!(reason.stat_key(), "duplicate path");
        }
        other => panic!("expected duplicate path, got {other:?}"),
    }
    assert_eq!(intake.seen_count(), 1);
}

#[test]
fn test_directory_and_empty_file_skipped() {
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("empty");
    fs::write(&empty, b"").unwrap();

    let mut intake = intake();
    match intake.classify_path(dir.path().to_path_buf()) {
        Intake::Skip(reason) => assert_eq!(reason.stat_key(), "directory"),
        Intake::Accept(_) => panic!("directory accepted"),
    }
    match intake.classify_path(empty) {
        Intake::Skip(reason) => assert_eq!(reason.stat_key(), "zero length files"),
        Intake::Accept(_) => panic!("empty file accepted"),
    }
}

#[test]
fn test_missing_path_is_stat_error() {
    let dir = TempDir::new().unwrap();
    match intake().classify_line(dir.path().join("nope").to_string_lossy().as_bytes()) {
        Intake::Skip(reason @ SkipReason::StatError(_)) => {
            assert_eq!(reason.stat_key(), "stat error");
            assert!(reason.to_string().contains("nope"));
        }
        other => panic!("expected stat error, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn test_fifo_is_special_file() {
    let dir = TempDir::new().unwrap();
    let fifo = dir.path().join("pipe");
    let status = std::process::Command::new("mkfifo").arg(&fifo).status();
    if !status.is_ok_and(|s| s.success()) {
        // mkfifo unavailable in this environment
        return;
    }

    match intake().classify_path(fifo) {
        Intake::Skip(reason) => assert_eq!(reason.stat_key(), "special file"),
        Intake::Accept(_) => panic!("fifo accepted"),
    }
}

#[cfg(unix)]
#[test]
fn test_non_utf8_path_preserved() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = TempDir::new().unwrap();
    let name = OsStr::from_bytes(b"caf\xe9.txt");
    let path = dir.path().join(name);
    if fs::write(&path, b"bytes").is_err() {
        // Filesystem rejects non-UTF-8 names
        return;
    }

    let mut line = dir.path().as_os_str().as_bytes().to_vec();
    line.push(b'/');
    line.extend_from_slice(b"caf\xe9.txt");

    match intake().classify_line(&line) {
        Intake::Accept(entry) => assert_eq!(entry.path, path),
        Intake::Skip(reason) => panic!("unexpected skip: {reason}"),
    }
}
