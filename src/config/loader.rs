// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_FUEL_LEVEL, DEFAULT_MAX_INPUT_SIZE, DEFAULT_MAX_MODULE_SIZE, MAX_FUEL_LEVEL,
    MIN_FUEL_LEVEL,
};
use crate::errors::ConfigError;
use crate::runtime::InstanceLimits;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for the image host.
///
/// Describes the resource limits applied to guest modules and which guest binaries make
/// up the pipeline. Loaded from YAML or TOML, selected by file extension.
///
/// # Fields
/// * `runtime` - Fuel and size limits (optional, defaults apply)
/// * `pipeline` - Topology and guest module paths
///
/// # Example
/// ```yaml
/// runtime:
///   fuel:
///     default: 10000000000
///   max_input_size: 67108864
/// pipeline:
///   topology: multi
///   modules:
///     decode: wasm/wimg_jpeg_decode.wasm
///     resize: wasm/wimg_resize.wasm
///     encode: wasm/wimg_jpeg_encode.wasm
/// ```
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    pub pipeline: PipelineConfig,
    /// Directory relative module paths are resolved against; set by the loader.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Config {
    /// Resolves a module path from the config against the config file's directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Checks that the selected topology has the module paths it needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.runtime.fuel.validate()?;
        match self.pipeline.topology {
            Topology::Single if self.pipeline.module.is_none() => Err(ConfigError::MissingField {
                topology: Topology::Single.as_str(),
                field: "module",
            }),
            Topology::Multi if self.pipeline.modules.is_none() => Err(ConfigError::MissingField {
                topology: Topology::Multi.as_str(),
                field: "modules",
            }),
            _ => Ok(()),
        }
    }
}

/// Resource limits for guest modules.
///
/// # Fields
/// * `fuel` - Fuel budget per guest call
/// * `max_module_size` - Largest guest binary accepted, in bytes (defaults to 32 MB)
/// * `max_input_size` - Largest input image accepted, in bytes (defaults to 64 MB)
#[derive(Debug, Default, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub fuel: FuelConfig,
    pub max_module_size: Option<usize>,
    pub max_input_size: Option<usize>,
}

impl RuntimeConfig {
    pub fn get_max_module_size(&self) -> usize {
        self.max_module_size.unwrap_or(DEFAULT_MAX_MODULE_SIZE)
    }

    pub fn get_max_input_size(&self) -> usize {
        self.max_input_size.unwrap_or(DEFAULT_MAX_INPUT_SIZE)
    }

    /// Limits handed to every guest module built from this configuration.
    pub fn limits(&self) -> InstanceLimits {
        InstanceLimits {
            fuel: self.fuel.validate_and_clamp(self.fuel.get_default()),
            max_input_size: self.get_max_input_size(),
        }
    }
}

/// Fuel consumption configuration for guest calls.
///
/// Fuel limits stop a misbehaving codec from spinning forever. The budget is refilled
/// before every guest call, so it bounds a single decode, resize or encode.
///
/// # Fields
/// * `default` - Fuel per guest call (defaults to 10B)
/// * `minimum` - Minimum allowed fuel level (defaults to 1M)
/// * `maximum` - Maximum allowed fuel level (defaults to 100B) - security limit
///
/// # Example
/// ```yaml
/// fuel:
///   default: 10000000000    # 10 billion instructions
///   minimum: 1000000        # 1 million instructions
///   maximum: 100000000000   # 100 billion instructions (hard limit)
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct FuelConfig {
    pub default: Option<u64>,
    pub minimum: Option<u64>,
    pub maximum: Option<u64>,
}

impl FuelConfig {
    /// Get the default fuel level, using built-in default if not configured.
    pub fn get_default(&self) -> u64 {
        self.default.unwrap_or(DEFAULT_FUEL_LEVEL)
    }

    /// Get the minimum fuel level, using built-in default if not configured.
    pub fn get_minimum(&self) -> u64 {
        self.minimum.unwrap_or(MIN_FUEL_LEVEL)
    }

    /// Get the maximum fuel level, using built-in default if not configured.
    pub fn get_maximum(&self) -> u64 {
        self.maximum.unwrap_or(MAX_FUEL_LEVEL)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (minimum, maximum) = (self.get_minimum(), self.get_maximum());
        if minimum > maximum {
            return Err(ConfigError::InvalidFuelBounds { minimum, maximum });
        }
        Ok(())
    }

    /// Validate and clamp a fuel level to configured bounds.
    ///
    /// # Example
    /// ```
    /// use wimg_host::config::FuelConfig;
    ///
    /// let config = FuelConfig::default();
    /// let fuel = config.validate_and_clamp(1_000_000_000_000); // Too high
    /// assert_eq!(fuel, 100_000_000_000); // Clamped to maximum
    /// ```
    pub fn validate_and_clamp(&self, requested: u64) -> u64 {
        let min = self.get_minimum();
        let max = self.get_maximum();
        if requested < min || requested > max {
            tracing::warn!(
                requested,
                min,
                max,
                "Requested fuel level outside configured bounds, clamping"
            );
        }
        requested.clamp(min, max.max(min))
    }
}

/// How guest modules are arranged into a pipeline.
///
/// # Variants
/// * `Single` - one guest binary exposes decode, resize and encode
/// * `Multi` - one guest binary per stage, each in its own instance
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Single,
    Multi,
}

impl Topology {
    pub fn as_str(self) -> &'static str {
        match self {
            Topology::Single => "single",
            Topology::Multi => "multi",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline topology and guest binaries.
///
/// # Fields
/// * `topology` - `single` or `multi`
/// * `module` - Guest binary for the single-instance topology
/// * `modules` - Per-stage guest binaries for the multi-instance topology
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    pub topology: Topology,
    pub module: Option<PathBuf>,
    pub modules: Option<StageModules>,
}

/// Guest binaries for each stage of a multi-instance pipeline.
#[derive(Debug, Deserialize)]
pub struct StageModules {
    pub decode: PathBuf,
    pub resize: PathBuf,
    pub encode: PathBuf,
}

/// Load a config from a YAML or TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut cfg: Config = match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "toml" => toml::from_str(&content)?,
        other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
    };

    cfg.base_dir = path.parent().map(Path::to_path_buf);
    Ok(cfg)
}

/// Load and validate a config from a YAML or TOML file
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    cfg.validate()?;
    Ok(cfg)
}
