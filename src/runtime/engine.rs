// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wasmtime engine configuration for guest codec modules.

use crate::runtime::error::{HostError, HostResult};
use wasmtime::{Config, Engine};

/// Creates a Wasmtime engine for classic (non-component) guest modules.
///
/// Guest codecs are plain core modules compiled for `wasm32-wasi`, so the component
/// model is off. Fuel consumption is always on: every guest call is metered and the
/// budget is refilled before each call by the instance.
///
/// **Disabled features:** threads, multi-memory, memory64. A guest must expose exactly
/// one 32-bit linear memory for the marshaling protocol to address it.
pub fn create_engine() -> HostResult<Engine> {
    let mut config = Config::new();

    config.wasm_component_model(false);
    config.wasm_threads(false); // single-threaded guests only
    config.wasm_multi_memory(false);
    config.wasm_memory64(false); // pointers are u32 offsets
    config.consume_fuel(true);
    config.epoch_interruption(false);

    tracing::debug!("Creating engine for classic guest codec modules");
    Engine::new(&config).map_err(|e| HostError::EngineError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_engine() {
        let engine = create_engine();
        assert!(engine.is_ok(), "Should create guest module engine");
    }

    #[test]
    fn test_engine_compiles_minimal_module() {
        let engine = create_engine().unwrap();
        let bytes = wat::parse_str("(module (memory (export \"memory\") 1))").unwrap();
        assert!(wasmtime::Module::new(&engine, &bytes).is_ok());
    }
}
