// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors raised while loading or validating a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file extension is neither `.yaml`/`.yml` nor `.toml`.
    #[error("unsupported configuration file extension: '{0}'")]
    UnsupportedFormat(String),

    /// A field the selected topology needs is absent.
    #[error("{topology} pipeline requires '{field}'")]
    MissingField {
        topology: &'static str,
        field: &'static str,
    },

    #[error("fuel minimum {minimum} exceeds maximum {maximum}")]
    InvalidFuelBounds { minimum: u64, maximum: u64 },
}
