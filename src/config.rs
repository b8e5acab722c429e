use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{swlog_debug, Error, Result};

pub const DEFAULT_DUE_SOON_WINDOW_DAYS: i64 = 7;
pub const DEFAULT_AGING_THRESHOLD_DAYS: i64 = 5;
pub const DEFAULT_OWNER_LOAD_THRESHOLD: i64 = 3;
pub const DEFAULT_CHOKEPOINT_FAN_IN_THRESHOLD: i64 = 3;

/// Weight constants for the additive risk score.
///
/// Finding weights are applied once per finding kind a task belongs to;
/// `unresolved_dependency` is applied per unfinished direct prerequisite,
/// and `dependency_depth` is scaled by how exposed the upstream chain is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub due_proximity: f64,
    pub critical_path: f64,
    pub owner_overload: f64,
    pub blocked: f64,
    pub circular_dependency: f64,
    pub aging: f64,
    pub dependency_chokepoint: f64,
    pub unresolved_dependency: f64,
    pub dependency_depth: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            due_proximity: 0.6,
            critical_path: 0.35,
            owner_overload: 0.25,
            blocked: 0.25,
            circular_dependency: 0.25,
            aging: 0.15,
            dependency_chokepoint: 0.15,
            unresolved_dependency: 0.05,
            dependency_depth: 0.2,
        }
    }
}

impl RiskWeights {
    fn entries(&self) -> [(&'static str, f64); 9] {
        [
            ("weights.due_proximity", self.due_proximity),
            ("weights.critical_path", self.critical_path),
            ("weights.owner_overload", self.owner_overload),
            ("weights.blocked", self.blocked),
            ("weights.circular_dependency", self.circular_dependency),
            ("weights.aging", self.aging),
            ("weights.dependency_chokepoint", self.dependency_chokepoint),
            ("weights.unresolved_dependency", self.unresolved_dependency),
            ("weights.dependency_depth", self.dependency_depth),
        ]
    }
}

/// Thresholds and weights for one analysis run.
///
/// Passed explicitly into every stage; nothing reads it from a global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub due_soon_window_days: i64,
    pub aging_threshold_days: i64,
    pub owner_load_threshold: i64,
    /// Direct prerequisites at which an unfinished task counts as a chokepoint.
    pub chokepoint_fan_in_threshold: i64,
    /// Run detector passes on separate threads.
    pub parallel_passes: bool,
    pub weights: RiskWeights,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            due_soon_window_days: DEFAULT_DUE_SOON_WINDOW_DAYS,
            aging_threshold_days: DEFAULT_AGING_THRESHOLD_DAYS,
            owner_load_threshold: DEFAULT_OWNER_LOAD_THRESHOLD,
            chokepoint_fan_in_threshold: DEFAULT_CHOKEPOINT_FAN_IN_THRESHOLD,
            parallel_passes: false,
            weights: RiskWeights::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn stallwatch_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or(Error::NoHomeDir)?
            .join(".stallwatch"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::stallwatch_dir()?.join("config.toml"))
    }

    /// Load `~/.stallwatch/config.toml`, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            swlog_debug!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate a config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        swlog_debug!("AnalysisConfig::load_from path={}", path.display());
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        swlog_debug!(
            "Config loaded: window={} aging={} load={} parallel={}",
            config.due_soon_window_days,
            config.aging_threshold_days,
            config.owner_load_threshold,
            config.parallel_passes
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let dir = Self::stallwatch_dir()?;
        if !dir.exists() {
            swlog_debug!("Creating stallwatch directory: {}", dir.display());
            fs::create_dir_all(&dir)?;
        }
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        swlog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Reject thresholds and weights the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.due_soon_window_days <= 0 {
            return Err(Error::configuration(
                "due_soon_window_days",
                format!("must be positive, got {}", self.due_soon_window_days),
            ));
        }
        if self.aging_threshold_days < 0 {
            return Err(Error::configuration(
                "aging_threshold_days",
                format!("must not be negative, got {}", self.aging_threshold_days),
            ));
        }
        if self.owner_load_threshold <= 0 {
            return Err(Error::configuration(
                "owner_load_threshold",
                format!("must be positive, got {}", self.owner_load_threshold),
            ));
        }
        if self.chokepoint_fan_in_threshold <= 0 {
            return Err(Error::configuration(
                "chokepoint_fan_in_threshold",
                format!("must be positive, got {}", self.chokepoint_fan_in_threshold),
            ));
        }
        for (field, weight) in self.weights.entries() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::configuration(
                    field,
                    format!("must be a non-negative number, got {}", weight),
                ));
            }
        }
        Ok(())
    }
}
