//! The stdin-to-stdout pipeline: read paths, analyse, write groups.
//!
//! [`run`] is independent of the process streams so it can be driven from
//! tests with in-memory input and output.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::duplicates::{AnalyserError, AnalysisSummary, DuplicateAnalyser};
use crate::output::{write_results, OutputFormat};
use crate::progress::ProgressCallback;
use crate::scanner::{Intake, PathIntake};
use crate::stats::ScanStats;

/// Statistics key for items whose fingerprint failed.
pub const READ_ERROR_KEY: &str = "reading files";

/// Per-run options that do not belong in the configuration file.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Output format for the groups.
    pub format: OutputFormat,
    /// Set by Ctrl+C.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Progress display.
    pub progress: Option<Arc<dyn ProgressCallback>>,
}

/// What a completed run did.
#[derive(Debug)]
pub struct RunReport {
    /// Input lines read
    pub lines_read: usize,
    /// Paths submitted to the analyser
    pub submitted: usize,
    /// Groups written to the output
    pub groups_written: usize,
    /// Skip and failure counters
    pub stats: Arc<ScanStats>,
    /// Analysis totals
    pub summary: AnalysisSummary,
}

/// Read newline-separated paths from `input`, analyse them and write the
/// duplicate groups to `output`.
///
/// Nothing is written when the run is interrupted.
///
/// # Errors
///
/// Returns [`AnalyserError::Interrupted`] if the shutdown flag was set,
/// or an error if the analyser fails or the output cannot be written.
pub fn run<R, W>(config: &Config, input: R, output: &mut W, options: RunOptions) -> Result<RunReport>
where
    R: BufRead,
    W: Write,
{
    let RunOptions {
        format,
        shutdown_flag,
        progress,
    } = options;

    let mut analyser_config = config.analyser_config();
    if let Some(ref flag) = shutdown_flag {
        analyser_config = analyser_config.with_shutdown_flag(Arc::clone(flag));
    }
    if let Some(progress) = progress {
        analyser_config = analyser_config.with_progress_callback(progress);
    }

    let stats = Arc::new(ScanStats::new());
    let mut analyser = DuplicateAnalyser::try_new(analyser_config)?;
    {
        let stats = Arc::clone(&stats);
        analyser.consume_errors(move |e| {
            log::warn!("error analysing: {}", e);
            stats.increment(READ_ERROR_KEY);
        })?;
    }

    let is_shutdown = || {
        shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    };

    let mut intake = PathIntake::new(config.blacklist.clone());
    let mut lines_read = 0usize;
    for line in input.split(b'\n') {
        if is_shutdown() {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("Error reading input: {}", e);
                break;
            }
        };
        lines_read += 1;

        match intake.classify_line(&line) {
            Intake::Accept(entry) => match analyser.submit(entry) {
                Ok(()) => {}
                Err(AnalyserError::Interrupted) => break,
                Err(e) => return Err(e).context("Failed to queue file"),
            },
            Intake::Skip(reason) => {
                log::trace!("Skipped: {}", reason);
                stats.increment(&reason.stat_key());
            }
        }
    }
    log::debug!(
        "Input done: {} lines, {} distinct paths",
        lines_read,
        intake.seen_count()
    );

    let analysis = analyser.finish()?;
    if analysis.was_interrupted() {
        log::info!("{}", stats.dump());
        return Err(AnalyserError::Interrupted.into());
    }

    let groups = analysis.duplicate_groups();
    let summary = analysis.summary_of(&groups);
    write_results(output, &groups, &summary, format).context("Failed to write results")?;
    let groups_written = groups.len();
    drop(groups);

    log::info!("{}", stats.dump());
    log::info!("{}", summary);

    Ok(RunReport {
        lines_read,
        submitted: analysis.stats().submitted,
        groups_written,
        stats,
        summary,
    })
}
