//! Merge configuration, loadable from a `crisol.toml` in the project root.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Name of the optional per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "crisol.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extra directories searched for first-party modules, in addition to
    /// the project root derived from the entry file.
    pub src: Vec<PathBuf>,

    /// Standalone calls to this name are treated as no-ops and removed.
    pub noop_function: String,

    /// Safety cap on merge passes. The loop is naturally bounded by the
    /// number of reachable local modules; exceeding the cap is an error.
    pub max_passes: usize,

    /// Minor version of Python 3 used for standard-library classification
    /// (10 means 3.10).
    pub python_version: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src: Vec::new(),
            noop_function: "print".to_owned(),
            max_passes: 512,
            python_version: 10,
        }
    }
}

impl Config {
    /// Load configuration from a specific TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load `crisol.toml` from the given directory when present, otherwise
    /// fall back to defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let candidate = root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            log::debug!("using config file {}", candidate.display());
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}
