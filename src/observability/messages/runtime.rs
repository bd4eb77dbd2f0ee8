// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for guest module loading and execution events.
//!
//! This module contains message types for logging events related to:
//! * Guest binary loading and size validation
//! * ABI generation detection
//! * Instance creation and memory binding
//! * Guest call failures and cleanup problems

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Guest binary loaded from disk.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use wimg_host::observability::messages::runtime::ModuleLoaded;
///
/// let msg = ModuleLoaded {
///     module_path: "wasm/wimg_jpeg_decode.wasm",
///     size_bytes: 4096,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ModuleLoaded<'a> {
    pub module_path: &'a str,
    pub size_bytes: usize,
}

impl Display for ModuleLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded guest module: {} ({} bytes)",
            self.module_path, self.size_bytes
        )
    }
}

impl StructuredLog for ModuleLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            module_path = self.module_path,
            size_bytes = self.size_bytes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "module_loaded",
            span_name = name,
            module_path = self.module_path,
            size_bytes = self.size_bytes,
        )
    }
}

/// Guest binary could not be loaded.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use wimg_host::observability::messages::runtime::ModuleLoadFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
/// let msg = ModuleLoadFailed {
///     module_path: "wasm/missing.wasm",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct ModuleLoadFailed<'a> {
    pub module_path: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ModuleLoadFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to load guest module '{}': {}",
            self.module_path, self.error
        )
    }
}

impl StructuredLog for ModuleLoadFailed<'_> {
    fn log(&self) {
        tracing::error!(
            module_path = self.module_path,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "module_load_failed",
            span_name = name,
            module_path = self.module_path,
            error = %self.error,
        )
    }
}

/// ABI generation detected for a compiled guest module.
///
/// # Log Level
/// `info!` - Important operational event
pub struct AbiDetected<'a> {
    pub module_name: &'a str,
    pub generation: &'a str,
}

impl Display for AbiDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Detected {} ABI for guest module: {}",
            self.generation, self.module_name
        )
    }
}

impl StructuredLog for AbiDetected<'_> {
    fn log(&self) {
        tracing::info!(
            module_name = self.module_name,
            generation = self.generation,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "abi_detected",
            span_name = name,
            module_name = self.module_name,
            generation = self.generation,
        )
    }
}

/// Guest instance created and its memory bound into the shim.
///
/// # Log Level
/// `debug!` - One per pipeline stage, noisy under load
pub struct InstanceCreated<'a> {
    pub instance_id: u64,
    pub module_name: &'a str,
    pub memory_bytes: usize,
}

impl Display for InstanceCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Instantiated guest '{}' as instance {} with {} bytes of linear memory",
            self.module_name, self.instance_id, self.memory_bytes
        )
    }
}

impl StructuredLog for InstanceCreated<'_> {
    fn log(&self) {
        tracing::debug!(
            instance_id = self.instance_id,
            module_name = self.module_name,
            memory_bytes = self.memory_bytes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "guest_instance",
            span_name = name,
            instance_id = self.instance_id,
            module_name = self.module_name,
        )
    }
}

/// A guest export call failed.
///
/// # Log Level
/// `warn!` - The caller decides whether this is fatal
///
/// # Example
/// ```
/// use wimg_host::observability::messages::runtime::GuestCallFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::InvalidData, "not a JPEG");
/// let msg = GuestCallFailed {
///     instance_id: 7,
///     export: "jpeg_decode",
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct GuestCallFailed<'a> {
    pub instance_id: u64,
    pub export: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for GuestCallFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Guest call '{}' on instance {} failed: {}",
            self.export, self.instance_id, self.error
        )
    }
}

impl StructuredLog for GuestCallFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            instance_id = self.instance_id,
            export = self.export,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "guest_call_failed",
            span_name = name,
            instance_id = self.instance_id,
            export = self.export,
        )
    }
}

/// Releasing guest memory failed during cleanup of an already-failing path.
///
/// # Log Level
/// `warn!` - The original error is still reported to the caller
pub struct CleanupFailed<'a> {
    pub instance_id: u64,
    pub what: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for CleanupFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to release {} on instance {}: {}",
            self.what, self.instance_id, self.error
        )
    }
}

impl StructuredLog for CleanupFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            instance_id = self.instance_id,
            what = self.what,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "cleanup_failed",
            span_name = name,
            instance_id = self.instance_id,
            what = self.what,
        )
    }
}
