//! Configuration management for hypso.
//!
//! This module handles the layered configuration system with the following
//! precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)
//!
//! All selectable behavior lives in an explicit [`Config`] object handed to
//! the orchestrator at construction; there is no package-global state.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{HypsoError, Result};

/// Hard ceiling for target heights (m). Requests above this fail unless the
/// caller explicitly opts in to extrapolation far above the surface layer.
pub const DEFAULT_HEIGHT_CEILING: f64 = 130.0;

/// Default cap (m) on the model levels used for the surface-layer
/// log-linear regression.
pub const DEFAULT_REGRESSION_CAP: f64 = 100.0;

/// Command-line arguments for hypso
#[derive(Parser, Debug)]
#[command(name = "hypso")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the model output NetCDF file to interpolate
    pub input_file: PathBuf,

    /// Path to JSON configuration file
    #[arg(short, long, env = "HYPSO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Target heights above ground in meters (comma-separated, strictly increasing)
    #[arg(long, env = "HYPSO_HEIGHTS", value_delimiter = ',')]
    pub heights: Vec<f64>,

    /// Quantities to interpolate
    #[arg(long, env = "HYPSO_VARS", value_delimiter = ',', value_enum)]
    pub vars: Vec<InterpVar>,

    /// Permit target heights above the surface-layer ceiling
    #[arg(long)]
    pub allow_above_ceiling: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HYPSO_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Physical quantities the engine can interpolate onto the height grid
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InterpVar {
    /// Horizontal wind components (earth-relative after rotation)
    Wind,
    /// Potential temperature
    Theta,
    /// Air pressure
    Pres,
    /// Air density
    Rho,
    /// Dew point temperature
    Dpt,
    /// Cloud fraction bands
    Cld,
}

impl fmt::Display for InterpVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterpVar::Wind => "wind",
            InterpVar::Theta => "theta",
            InterpVar::Pres => "pres",
            InterpVar::Rho => "rho",
            InterpVar::Dpt => "dpt",
            InterpVar::Cld => "cld",
        };
        write!(f, "{}", name)
    }
}

/// Interpolation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpConfig {
    /// Target heights above ground (m), strictly increasing
    #[serde(default = "default_heights")]
    pub heights: Vec<f64>,

    /// Quantities to interpolate
    #[serde(default = "default_vars")]
    pub vars: Vec<InterpVar>,

    /// Hard ceiling (m) on target heights
    #[serde(default = "default_height_ceiling")]
    pub height_ceiling: f64,

    /// Explicit override for target heights above the ceiling
    #[serde(default)]
    pub allow_above_ceiling: bool,

    /// Cap (m) on model levels used for the surface-layer regression
    #[serde(default = "default_regression_cap")]
    pub regression_cap: f64,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Interpolation configuration
    #[serde(default)]
    pub interp: InterpConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, PathBuf)> {
        let args = Args::parse();
        let config = Self::from_args(args.config.as_deref(), &args)?;
        Ok((config, args.input_file))
    }

    /// Build a configuration from parsed arguments and an optional JSON file
    fn from_args(config_path: Option<&std::path::Path>, args: &Args) -> Result<Self> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(path) = config_path {
            let json_config = Self::load_from_file(path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments
        if !args.heights.is_empty() {
            config.interp.heights = args.heights.clone();
        }
        if !args.vars.is_empty() {
            config.interp.vars = args.vars.clone();
        }
        if args.allow_above_ceiling {
            config.interp.allow_above_ceiling = true;
        }
        config.log_level = args.log_level.clone();

        Ok(config)
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.interp = other.interp;
        self.log_level = other.log_level;
    }

    /// Returns true if the given quantity was requested
    pub fn wants(&self, var: InterpVar) -> bool {
        self.interp.vars.contains(&var)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let interp = &self.interp;

        if interp.heights.is_empty() {
            return Err(HypsoError::Config {
                message: "At least one target height must be requested".to_string(),
            });
        }

        for &h in &interp.heights {
            if !h.is_finite() || h < 0.0 {
                return Err(HypsoError::Config {
                    message: format!("Target heights must be non-negative, got {}", h),
                });
            }
        }

        for pair in interp.heights.windows(2) {
            if pair[1] <= pair[0] {
                return Err(HypsoError::Config {
                    message: format!(
                        "Target heights must be strictly increasing, got {} after {}",
                        pair[1], pair[0]
                    ),
                });
            }
        }

        // Refuse to extrapolate far above the surface layer without an
        // explicit override.
        if !interp.allow_above_ceiling {
            if let Some(&h) = interp
                .heights
                .iter()
                .find(|&&h| h > interp.height_ceiling)
            {
                return Err(HypsoError::Config {
                    message: format!(
                        "Target height {} m exceeds the {} m ceiling; \
                         pass --allow-above-ceiling to permit it",
                        h, interp.height_ceiling
                    ),
                });
            }
        }

        if interp.vars.is_empty() {
            return Err(HypsoError::Config {
                message: "At least one variable must be requested".to_string(),
            });
        }

        if !(interp.regression_cap.is_finite() && interp.regression_cap > 0.0) {
            return Err(HypsoError::Config {
                message: format!(
                    "Regression cap must be a positive height, got {}",
                    interp.regression_cap
                ),
            });
        }

        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(HypsoError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interp: InterpConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for InterpConfig {
    fn default() -> Self {
        Self {
            heights: default_heights(),
            vars: default_vars(),
            height_ceiling: default_height_ceiling(),
            allow_above_ceiling: false,
            regression_cap: default_regression_cap(),
        }
    }
}

// Default value functions for serde
fn default_heights() -> Vec<f64> {
    vec![5.0, 10.0, 50.0, 90.0]
}

fn default_vars() -> Vec<InterpVar> {
    vec![InterpVar::Wind]
}

fn default_height_ceiling() -> f64 {
    DEFAULT_HEIGHT_CEILING
}

fn default_regression_cap() -> f64 {
    DEFAULT_REGRESSION_CAP
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.interp.heights, vec![5.0, 10.0, 50.0, 90.0]);
        assert_eq!(config.interp.vars, vec![InterpVar::Wind]);
        assert_eq!(config.interp.height_ceiling, DEFAULT_HEIGHT_CEILING);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_merge() {
        let mut config1 = Config::default();
        let mut config2 = Config::default();

        config2.interp.heights = vec![10.0, 40.0];
        config2.interp.vars = vec![InterpVar::Wind, InterpVar::Theta];

        config1.merge(config2);

        assert_eq!(config1.interp.heights, vec![10.0, 40.0]);
        assert_eq!(
            config1.interp.vars,
            vec![InterpVar::Wind, InterpVar::Theta]
        );
    }

    #[test]
    fn test_config_validation() {
        // Valid config should pass
        let config = Config::default();
        assert!(config.validate().is_ok());

        // Empty heights
        let mut config = Config::default();
        config.interp.heights = vec![];
        assert!(config.validate().is_err());

        // Negative height
        let mut config = Config::default();
        config.interp.heights = vec![-5.0, 10.0];
        assert!(config.validate().is_err());

        // Non-increasing heights
        let mut config = Config::default();
        config.interp.heights = vec![10.0, 10.0];
        assert!(config.validate().is_err());

        // Invalid log level
        let mut config = Config::default();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ceiling_requires_override() {
        let mut config = Config::default();
        config.interp.heights = vec![10.0, 150.0];
        let err = config.validate().unwrap_err();
        assert!(matches!(err, HypsoError::Config { .. }));

        config.interp.allow_above_ceiling = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wants() {
        let mut config = Config::default();
        config.interp.vars = vec![InterpVar::Wind, InterpVar::Cld];
        assert!(config.wants(InterpVar::Wind));
        assert!(config.wants(InterpVar::Cld));
        assert!(!config.wants(InterpVar::Dpt));
    }

    #[test]
    fn test_interp_var_from_json() {
        let vars: Vec<InterpVar> =
            serde_json::from_str(r#"["wind", "theta", "cld"]"#).unwrap();
        assert_eq!(
            vars,
            vec![InterpVar::Wind, InterpVar::Theta, InterpVar::Cld]
        );
    }
}
