// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use wasmtime::Engine;

use crate::config::{Config, Topology};
use crate::errors::ConfigError;
use crate::pipeline::{MultiInstancePipeline, SingleInstancePipeline};
use crate::runtime::{create_engine, GuestModule, HostResult};
use crate::traits::ImagePipeline;

/// Builds the pipeline a configuration describes.
///
/// Guest binaries are read and compiled once here; every pipeline run instantiates them
/// again from the compiled modules.
pub struct PipelineBuilder {
    engine: Engine,
}

impl PipelineBuilder {
    pub fn new() -> HostResult<Self> {
        Ok(Self::with_engine(create_engine()?))
    }

    /// Shares an existing engine, e.g. between pipelines built from several configs.
    pub fn with_engine(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn from_config(config: &Config) -> HostResult<Arc<dyn ImagePipeline>> {
        Self::new()?.build(config)
    }

    pub fn build(&self, config: &Config) -> HostResult<Arc<dyn ImagePipeline>> {
        config.validate()?;
        let limits = config.runtime.limits();
        let max_module_size = config.runtime.get_max_module_size();
        let load = |path: &std::path::Path| {
            GuestModule::from_file(&self.engine, config.resolve(path), max_module_size, limits)
        };

        match config.pipeline.topology {
            Topology::Single => {
                let path = config
                    .pipeline
                    .module
                    .as_deref()
                    .ok_or(ConfigError::MissingField {
                        topology: Topology::Single.as_str(),
                        field: "module",
                    })?;
                Ok(Arc::new(SingleInstancePipeline::new(load(path)?)))
            }
            Topology::Multi => {
                let modules =
                    config
                        .pipeline
                        .modules
                        .as_ref()
                        .ok_or(ConfigError::MissingField {
                            topology: Topology::Multi.as_str(),
                            field: "modules",
                        })?;
                Ok(Arc::new(MultiInstancePipeline::new(
                    load(&modules.decode)?,
                    load(&modules.resize)?,
                    load(&modules.encode)?,
                )?))
            }
        }
    }
}
