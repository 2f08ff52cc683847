//! Layered run configuration.
//!
//! Settings are merged with `figment`, later layers winning:
//!
//! 1. built-in defaults
//! 2. a TOML file: `--config <PATH>`, or `config.toml` in the platform
//!    config directory when it exists
//! 3. `DUPSPOT_*` environment variables (`DUPSPOT_WORKERS=16`)
//! 4. command-line flags
//!
//! ```toml
//! workers = 16
//! size_threshold = 1048576
//! skip_blocks = 500
//! queue_capacity = 0
//! blacklist = ["tmpfs", "sysfs", "nfs"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::duplicates::{AnalyserConfig, DEFAULT_WORKERS};
use crate::scanner::{Fingerprinter, DEFAULT_BLACKLIST, DEFAULT_SIZE_THRESHOLD, DEFAULT_SKIP_BLOCKS};

/// Prefix of the environment variables read into the configuration.
pub const ENV_PREFIX: &str = "DUPSPOT_";

/// Run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker threads hashing files.
    pub workers: usize,
    /// Files of at least this many bytes are sampled.
    pub size_threshold: u64,
    /// Stride between sampled blocks, in blocks.
    pub skip_blocks: u64,
    /// Intake queue capacity.
    pub queue_capacity: usize,
    /// Filesystem type names (substrings) whose files are skipped.
    pub blacklist: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            skip_blocks: DEFAULT_SKIP_BLOCKS,
            queue_capacity: 0,
            blacklist: DEFAULT_BLACKLIST.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl Config {
    /// Load defaults, the config file and the environment.
    ///
    /// An explicit `path` must exist; the default location is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing or any layer fails
    /// to parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => {
                if !p.is_file() {
                    bail!("Config file not found: {}", p.display());
                }
                Some(p.to_path_buf())
            }
            None => Self::default_path().filter(|p| p.is_file()),
        };

        if let Some(ref f) = file {
            log::debug!("Loading config from {}", f.display());
        }

        Self::figment(file.as_deref())
            .extract()
            .context("Invalid configuration")
    }

    /// The merged provider chain without CLI flags.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(f) = file {
            figment = figment.merge(Toml::file(f));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// `config.toml` in the platform config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dupspot").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply the flags the user actually passed.
    #[must_use]
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if let Some(jobs) = cli.jobs {
            self.workers = jobs;
        }
        if let Some(threshold) = cli.threshold {
            self.size_threshold = threshold;
        }
        if let Some(skip) = cli.skip_blocks {
            self.skip_blocks = skip;
        }
        if let Some(capacity) = cli.queue_capacity {
            self.queue_capacity = capacity;
        }
        if !cli.blacklist.is_empty() {
            self.blacklist.clone_from(&cli.blacklist);
        }
        self
    }

    /// Reject settings the analyser cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.skip_blocks == 0 {
            bail!("skip_blocks must be at least 1");
        }
        if self.size_threshold == 0 {
            bail!("size_threshold must be at least 1 byte");
        }
        Ok(())
    }

    /// Fingerprinting policy for these settings.
    #[must_use]
    pub fn fingerprinter(&self) -> Fingerprinter {
        Fingerprinter::new()
            .with_size_threshold(self.size_threshold)
            .with_skip_blocks(self.skip_blocks)
    }

    /// Analyser settings, without shutdown flag or progress callback.
    #[must_use]
    pub fn analyser_config(&self) -> AnalyserConfig {
        AnalyserConfig::default()
            .with_workers(self.workers)
            .with_queue_capacity(self.queue_capacity)
            .with_fingerprinter(self.fingerprinter())
    }
}
