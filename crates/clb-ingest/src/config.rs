//! Import configuration
//!
//! Values are layered, later sources win: built-in defaults, an optional
//! TOML file, `CLB_*` environment variables, then command line flags.

use std::path::{Path, PathBuf};

use clb_common::{ClbError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Defaults
// ============================================================================

/// Writes per committed transaction
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Walk events between progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: usize = 5_000;

pub const DEFAULT_DELIMITER: char = '\t';

pub const ENV_BATCH_SIZE: &str = "CLB_BATCH_SIZE";
pub const ENV_PROGRESS_INTERVAL: &str = "CLB_PROGRESS_INTERVAL";
pub const ENV_DELIMITER: &str = "CLB_DELIMITER";

/// Settings of one import run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Taxa or walk events per committed batch
    pub batch_size: usize,
    /// Walk events between progress log lines, 0 to disable
    pub progress_interval: usize,
    /// Column delimiter of the core file
    pub delimiter: char,
    /// Where to write the JSON import report
    pub report_path: Option<PathBuf>,
    /// Check the interval index after the walk
    pub verify_intervals: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            delimiter: DEFAULT_DELIMITER,
            report_path: None,
            verify_intervals: true,
        }
    }
}

impl ImportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, then the optional file, then the environment; validated
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::layered(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Same layers as [`ImportConfig::load`] without validation, for callers
    /// that apply further overrides and call [`ImportConfig::validate`] last
    pub fn layered(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_env()
    }

    /// Read a TOML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| ClbError::config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ClbError::config(e.to_string()))
    }

    /// Override from `CLB_*` environment variables
    pub fn merge_env(self) -> Result<Self> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Override from any variable lookup
    pub fn merge_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup(ENV_BATCH_SIZE) {
            self.batch_size = parse_number(ENV_BATCH_SIZE, &value)?;
        }
        if let Some(value) = lookup(ENV_PROGRESS_INTERVAL) {
            self.progress_interval = parse_number(ENV_PROGRESS_INTERVAL, &value)?;
        }
        if let Some(value) = lookup(ENV_DELIMITER) {
            self.delimiter = parse_delimiter(&value)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ClbError::config("batch_size must be greater than zero"));
        }
        if !self.delimiter.is_ascii() {
            return Err(ClbError::config(format!(
                "delimiter {:?} is not a single-byte character",
                self.delimiter
            )));
        }
        Ok(())
    }

    /// Delimiter as the byte the reader expects
    pub fn delimiter_byte(&self) -> u8 {
        // validate() rejects non-ASCII delimiters
        u8::try_from(self.delimiter).unwrap_or(b'\t')
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    pub fn with_verify_intervals(mut self, verify: bool) -> Self {
        self.verify_intervals = verify;
        self
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| ClbError::config(format!("{} must be a non-negative integer, got {:?}", key, value)))
}

/// Parse a delimiter given as a single character or a name (`tab`, `comma`, ...)
pub fn parse_delimiter(value: &str) -> Result<char> {
    let delimiter = match value.to_ascii_lowercase().as_str() {
        "tab" | "\\t" => '\t',
        "comma" => ',',
        "semicolon" => ';',
        "pipe" => '|',
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(ClbError::config(format!("invalid delimiter {:?}", value))),
            }
        },
    };
    Ok(delimiter)
}
