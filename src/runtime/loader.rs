// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Guest binary loading and validation
//!
//! Reads guest codec binaries from disk and enforces the configured size ceiling.
//! Parsing the binary is the job of the detector module.

use crate::runtime::error::{HostError, HostResult};
use std::path::Path;

pub use crate::config::consts::DEFAULT_MAX_MODULE_SIZE;

/// Loads guest bytes from a file and validates the size
///
/// # Arguments
/// * `path` - Path to the `.wasm` file
/// * `max_size` - Largest accepted binary, in bytes
///
/// # Returns
/// * `Ok(Vec<u8>)` - The WASM binary bytes
/// * `Err(HostError)` - If the file cannot be read or exceeds `max_size`
pub fn load_wasm_bytes<P: AsRef<Path>>(path: P, max_size: usize) -> HostResult<Vec<u8>> {
    use crate::observability::messages::runtime::{ModuleLoadFailed, ModuleLoaded};
    use crate::observability::messages::StructuredLog;

    let path = path.as_ref();
    let module_path = path.display().to_string();

    let bytes = std::fs::read(path).map_err(|e| {
        let error = HostError::IoError(e);
        ModuleLoadFailed {
            module_path: &module_path,
            error: &error,
        }
        .log();
        error
    })?;

    if bytes.len() > max_size {
        let error = HostError::ValidationError(format!(
            "WASM file too large: {} bytes (max: {} bytes)",
            bytes.len(),
            max_size
        ));
        ModuleLoadFailed {
            module_path: &module_path,
            error: &error,
        }
        .log();
        return Err(error);
    }

    ModuleLoaded {
        module_path: &module_path,
        size_bytes: bytes.len(),
    }
    .log();

    Ok(bytes)
}
