//! Prover configuration

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::error::{ProverError, Result};
use crate::seed::SeedScheme;

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "VRFGEN_CONFIG";

/// Prover configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    /// Worker task count; `None` uses the available parallelism
    pub workers: Option<usize>,

    /// Bound on records in flight between workers and the merge step
    pub channel_capacity: usize,

    /// Final seed derivation scheme
    pub seed_scheme: SeedScheme,

    /// Whether the JSON output starts with the header row
    pub include_header: bool,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            workers: None,
            channel_capacity: 256,
            seed_scheme: SeedScheme::default(),
            include_header: true,
        }
    }
}

impl ProverConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the configuration for a run: an explicit path must exist;
    /// otherwise `VRFGEN_CONFIG`, then the per-user default location, are
    /// used if present, falling back to defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/vrfgen/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vrfgen").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(ProverError::Config(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(ProverError::InvalidWorkerCount(0));
        }
        Ok(())
    }

    /// Worker count to use, given an optional per-request override
    pub fn effective_workers(&self, requested: Option<usize>) -> Result<usize> {
        match requested.or(self.workers) {
            Some(0) => Err(ProverError::InvalidWorkerCount(0)),
            Some(n) => Ok(n),
            None => Ok(std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)),
        }
    }
}
