//! Application settings using Figment
//!
//! Settings are merged from, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. `lltf.toml` (or the file passed to [`Settings::load_from`])
//! 3. Environment variables prefixed with `LLTF_`
//!
//! # Environment Variable Overrides
//!
//! Nested keys are separated with a double underscore:
//!
//! ```text
//! LLTF_LOG_LEVEL=debug
//! LLTF_CALIBRATION__PATH=xml_files/M000010263.xml
//! LLTF_SIMULATION__ENABLED=true
//! LLTF_SIMULATION__UNCERTAINTY_NM=0.2
//! ```
//!
//! # Example
//!
//! ```toml
//! log_level = "info"
//!
//! [calibration]
//! search_dir = "xml_files"
//!
//! [simulation]
//! enabled = true
//! uncertainty_nm = 0.1
//! seed = 42
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::calibration::{CalibrationSource, DEFAULT_CALIBRATION_DIR};
use crate::session::ConnectionMode;
use crate::simulation::SimulationOptions;

/// Default settings file name.
pub const DEFAULT_SETTINGS_FILE: &str = "lltf.toml";

/// Settings error types
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Figment could not load or extract the settings.
    #[error("Settings load error: {0}")]
    LoadError(#[from] Box<figment::Error>),
    /// Values were loaded but are not acceptable.
    #[error("Settings validation error: {0}")]
    ValidationError(String),
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Where the calibration document comes from
    #[serde(default)]
    pub calibration: CalibrationSettings,
    /// Simulation defaults
    #[serde(default)]
    pub simulation: SimulationSettings,
}

/// Calibration document location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// Explicit document; when unset, `search_dir` is scanned
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Directory scanned for `*.xml` documents
    #[serde(default = "default_search_dir")]
    pub search_dir: PathBuf,
}

/// Simulation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SimulationSettings {
    /// Run without hardware
    #[serde(default)]
    pub enabled: bool,
    /// Standard deviation of the fixed read-back offset, in nm
    #[serde(default)]
    pub uncertainty_nm: f64,
    /// Seed for the offset draw; random when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_search_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CALIBRATION_DIR)
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            path: None,
            search_dir: default_search_dir(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            calibration: CalibrationSettings::default(),
            simulation: SimulationSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `lltf.toml` in the working directory and the environment.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(DEFAULT_SETTINGS_FILE)
    }

    /// Load settings from a specific file path and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let settings: Self = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("LLTF_").split("__"))
            .extract()
            .map_err(|e| SettingsError::LoadError(Box::new(e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Simulation uncertainty is finite and non-negative
    pub fn validate(&self) -> Result<(), SettingsError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(SettingsError::ValidationError(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        let uncertainty = self.simulation.uncertainty_nm;
        if !uncertainty.is_finite() || uncertainty < 0.0 {
            return Err(SettingsError::ValidationError(format!(
                "Invalid simulation.uncertainty_nm {}. Must be a finite value >= 0",
                uncertainty
            )));
        }

        Ok(())
    }

    /// Calibration source described by these settings.
    pub fn calibration_source(&self) -> CalibrationSource {
        match &self.calibration.path {
            Some(path) => CalibrationSource::File(path.clone()),
            None => CalibrationSource::Discover(self.calibration.search_dir.clone()),
        }
    }

    /// Connection mode described by these settings.
    pub fn connection_mode(&self) -> ConnectionMode {
        if self.simulation.enabled {
            ConnectionMode::Simulated(SimulationOptions {
                uncertainty_nm: self.simulation.uncertainty_nm,
                seed: self.simulation.seed,
            })
        } else {
            ConnectionMode::Real
        }
    }
}
