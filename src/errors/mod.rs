// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;

pub use crate::runtime::error::{HostError, HostResult};
pub use config::ConfigError;
