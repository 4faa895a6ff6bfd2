//! Engine configuration and logging setup
//!
//! The engines run with built-in constants. A TOML file may override the
//! per-loop shortening table, the symmetry limit and logging. The file is
//! resolved in priority order:
//!
//! 1. Explicit path passed by the caller
//! 2. `PARAMOT_RIGGING_CONFIG` environment variable
//! 3. `<config dir>/paramot/rigging.toml` (e.g. `~/.config/paramot/rigging.toml`)
//! 4. Built-in defaults
//!
//! ```toml
//! [loops]
//! shortening_mm = [10.0, 15.0, 25.0, 35.0, 45.0]
//!
//! [symmetry]
//! limit_mm = 15.0
//!
//! [logging]
//! level = "debug"
//! file = "/var/log/paramot/rigging.log"
//! ```

use crate::trim::{LoopShortening, SYMMETRY_LIMIT_MM};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PARAMOT_RIGGING_CONFIG";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub loops: LoopConfig,
    #[serde(default)]
    pub symmetry: SymmetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Shortening per loop for loop types 1..=5
    #[serde(default = "default_shortening")]
    pub shortening_mm: [f64; 5],
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            shortening_mm: default_shortening(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymmetryConfig {
    #[serde(default = "default_symmetry_limit")]
    pub limit_mm: f64,
}

impl Default for SymmetryConfig {
    fn default() -> Self {
        Self {
            limit_mm: default_symmetry_limit(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_shortening() -> [f64; 5] {
    LoopShortening::default().0
}

fn default_symmetry_limit() -> f64 {
    SYMMETRY_LIMIT_MM
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Resolve and load the configuration
    ///
    /// A path that was asked for (explicitly or via the environment) but
    /// does not exist is logged and falls back to defaults. A file that
    /// exists but does not parse or validate is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let Some(path) = resolve_config_path(explicit) else {
            debug!("No rigging config file found, using built-in defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Config file {:?} not found, using built-in defaults", path);
            return Ok(Self::default());
        }

        let config = Self::from_file(&path)?;
        info!("Loaded rigging configuration from {:?}", path);
        Ok(config)
    }

    /// Read, parse and validate one TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engines cannot work with
    pub fn validate(&self) -> Result<()> {
        let table = &self.loops.shortening_mm;
        if table.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(Error::Config(format!(
                "loops.shortening_mm must be positive, got {:?}",
                table
            )));
        }
        if table.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::Config(format!(
                "loops.shortening_mm must increase with loop type, got {:?}",
                table
            )));
        }

        let limit = self.symmetry.limit_mm;
        if !limit.is_finite() || limit <= 0.0 {
            return Err(Error::Config(format!(
                "symmetry.limit_mm must be positive, got {}",
                limit
            )));
        }
        Ok(())
    }

    pub fn loop_shortening(&self) -> LoopShortening {
        LoopShortening(self.loops.shortening_mm)
    }
}

/// Config file to load, if any
///
/// Explicit and environment paths are returned even when missing so the
/// caller can report them. The user config dir path only counts if it exists.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("paramot").join("rigging.toml"))
        .filter(|p| p.exists())
}

/// Install a global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Fails if the
/// filter does not parse, the log file cannot be opened, or a global
/// subscriber is already installed.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level).map_err(|e| {
            Error::Config(format!("Invalid log level {:?}: {}", logging.level, e))
        })?,
    };

    let installed = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {}", e)))
}
