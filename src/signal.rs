//! Ctrl+C handling.
//!
//! The handler only sets a shared `AtomicBool`. The ingestion loop stops
//! reading stdin once it sees the flag, workers stop hashing, and the
//! process exits with [`EXIT_CODE_INTERRUPTED`] after the pool has drained.
//!
//! ```rust,no_run
//! use dupspot::duplicates::AnalyserConfig;
//! use dupspot::signal::install_handler;
//!
//! let handler = install_handler().unwrap();
//! let config = AnalyserConfig::default().with_shutdown_flag(handler.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// 128 + SIGINT.
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether Ctrl+C was pressed or [`Self::request_shutdown`] called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set the flag by hand.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// The flag to hand to the analyser.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: Mutex<Option<ShutdownHandler>> = Mutex::new(None);

/// Install the process-wide Ctrl+C hook, or reuse the one already installed.
///
/// `ctrlc` allows a single hook per process. Later calls get the same
/// handler back with its flag cleared, so the application can run several
/// times in one test binary. Concurrent first calls are serialized and all
/// receive the handler whose flag the hook sets.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if the hook cannot be registered
/// and no handler exists yet.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    let mut global = GLOBAL_HANDLER.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(ref handler) = *global {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    let installed = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Finishing queued files...");
        let _ = stderr.flush();
    });

    match installed {
        Ok(()) => {}
        Err(ctrlc::Error::MultipleHandlers) => {
            // Hook registered outside this module; the flag is only settable
            // through request_shutdown.
            log::debug!("Ctrl+C hook already registered, using an unhooked handler");
        }
        Err(e) => return Err(SignalError::InstallFailed(e)),
    }

    *global = Some(handler.clone());
    Ok(handler)
}
