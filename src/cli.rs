//! Command-line interface definitions for dupspot.
//!
//! dupspot takes no positional arguments: it reads newline-separated paths
//! on stdin and writes groups of probable duplicates on stdout.
//!
//! # Example
//!
//! ```bash
//! # Everything under ~/Downloads, text output
//! find ~/Downloads -type f | dupspot
//!
//! # Sixteen workers, sample files of 1 MiB and up, JSON output
//! find /srv -type f | dupspot -j 16 --threshold 1MiB --output json
//!
//! # Debug logging
//! find . | dupspot -v
//! ```

use std::path::PathBuf;

use clap::Parser;

use crate::output::OutputFormat;

/// Spot probable duplicate files among paths read from stdin.
///
/// Files are grouped by size, then by a content fingerprint. Small files
/// are hashed whole; files at or above the threshold are hashed from
/// evenly spaced blocks only, so groups are candidates rather than proof.
#[derive(Debug, Parser)]
#[command(name = "dupspot")]
#[command(author, version, about)]
#[command(long_about = "Spot probable duplicate files among paths read from stdin.

Reads one path per line from stdin, skips directories, symlinks, special
files, empty files and files on blacklisted filesystems, then fingerprints
the rest with a pool of worker threads. Files smaller than --threshold are
hashed in full; larger files are sampled one block every --skip-blocks
blocks. Each group of two or more files with the same size and fingerprint
is printed, one path per line, followed by a blank line.

Example:
  find ~/photos -type f | dupspot -j 16")]
pub struct Cli {
    /// Number of worker threads hashing files
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Files of at least this size are sampled instead of fully hashed
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub threshold: Option<u64>,

    /// Stride between sampled blocks, in blocks
    #[arg(long, value_name = "N")]
    pub skip_blocks: Option<u64>,

    /// Paths buffered ahead of the workers (0 hands each path straight to a worker)
    #[arg(long, value_name = "N")]
    pub queue_capacity: Option<usize>,

    /// Filesystem type to skip (repeatable); replaces the configured list
    #[arg(long = "blacklist", value_name = "FS")]
    pub blacklist: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Configuration file (TOML) to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Do not draw the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

/// Parse a human-readable size string into bytes.
///
/// Supports the following formats:
/// - Plain numbers: "1024" (bytes)
/// - Decimal units: "1KB", "1MB", "1GB", "1TB" (powers of 1000)
/// - Binary units: "1KiB", "1MiB", "1GiB", "1TiB" (powers of 1024)
///
/// Suffixes are case-insensitive and may be separated by whitespace.
///
/// # Errors
///
/// Returns an error string if the format is invalid.
///
/// # Examples
///
/// ```
/// use dupspot::cli::parse_size;
///
/// assert_eq!(parse_size("64KiB").unwrap(), 65_536);
/// assert_eq!(parse_size("1.5MB").unwrap(), 1_500_000);
/// ```
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
