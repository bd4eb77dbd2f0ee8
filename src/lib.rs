// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;     // YAML/TOML config + limits
pub mod errors;     // error handling
pub mod observability;
pub mod pipeline;   // single- and multi-instance orchestration
pub mod runtime;    // shim, loader, buffers, marshaling
pub mod traits;     // unified abstractions
