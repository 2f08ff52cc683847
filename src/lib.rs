//! dupspot - probable duplicate file spotter
//!
//! Reads candidate paths on stdin, fingerprints them concurrently (whole
//! files when small, evenly spaced blocks when large) and prints groups of
//! files sharing a size and fingerprint.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod stats;

use std::io;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::ExitCode;
use crate::pipeline::RunOptions;
use crate::progress::{Progress, ProgressCallback};

/// Run the binary against the process's stdin and stdout.
///
/// # Errors
///
/// Returns an error for invalid configuration, a failed analysis, an
/// output failure, or an interrupted run (see [`ExitCode::for_error`]).
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref())?.with_cli_overrides(&cli);
    config.validate()?;
    log::debug!("Configuration: {:?}", config);

    let handler = signal::install_handler()?;

    let progress: Option<Arc<dyn ProgressCallback>> = if cli.quiet || cli.no_progress {
        None
    } else {
        Some(Arc::new(Progress::new(false)))
    };

    let options = RunOptions {
        format: cli.output,
        shutdown_flag: Some(handler.get_flag()),
        progress,
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    pipeline::run(&config, stdin.lock(), &mut stdout.lock(), options)?;

    Ok(ExitCode::Success)
}
