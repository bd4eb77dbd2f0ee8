// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Guest module compilation and instantiation.
//!
//! A [`GuestModule`] is a compiled guest binary plus its detected ABI generation; it is
//! compiled once and instantiated per pipeline run. A [`GuestInstance`] owns one store,
//! one linear memory and the shim bound to that memory. Instances never share memory,
//! even when created from the same module.

use crate::config::consts::{DEFAULT_FUEL_LEVEL, DEFAULT_MAX_INPUT_SIZE};
use crate::observability::messages::runtime::{AbiDetected, GuestCallFailed, InstanceCreated};
use crate::observability::messages::StructuredLog;
use crate::runtime::detector::{detect_abi_generation, detect_from_exports, AbiGeneration};
use crate::runtime::error::{HostError, HostResult};
use crate::runtime::loader::load_wasm_bytes;
use crate::runtime::shim::{self, ShimState};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use wasmtime::{Engine, Instance, Linker, Memory, Module, Store, WasmParams, WasmResults};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a guest instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resource limits applied to every instance of a module.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InstanceLimits {
    /// Fuel granted to each guest call; refilled before every call.
    pub fuel: u64,
    /// Largest byte buffer the host will copy into guest memory.
    pub max_input_size: usize,
}

impl Default for InstanceLimits {
    fn default() -> Self {
        Self {
            fuel: DEFAULT_FUEL_LEVEL,
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
        }
    }
}

/// A compiled guest binary ready to be instantiated.
#[derive(Clone)]
pub struct GuestModule {
    name: String,
    engine: Engine,
    module: Module,
    generation: AbiGeneration,
    limits: InstanceLimits,
}

impl GuestModule {
    /// Compiles raw guest bytes after classifying their ABI generation.
    pub fn from_bytes(
        engine: &Engine,
        name: impl Into<String>,
        bytes: &[u8],
        limits: InstanceLimits,
    ) -> HostResult<Self> {
        let name = name.into();
        let generation = detect_abi_generation(bytes)?;
        let module = Module::new(engine, bytes).map_err(|e| {
            HostError::ModuleError(format!("failed to compile '{}': {}", name, e))
        })?;

        AbiDetected {
            module_name: &name,
            generation: generation.as_str(),
        }
        .log();

        Ok(Self {
            name,
            engine: engine.clone(),
            module,
            generation,
            limits,
        })
    }

    /// Reads, size-checks and compiles a guest binary from disk.
    pub fn from_file<P: AsRef<Path>>(
        engine: &Engine,
        path: P,
        max_module_size: usize,
        limits: InstanceLimits,
    ) -> HostResult<Self> {
        let path = path.as_ref();
        let bytes = load_wasm_bytes(path, max_module_size)?;
        Self::from_bytes(engine, path.display().to_string(), &bytes, limits)
    }

    /// Wraps a module compiled elsewhere. The generation is read from its export types.
    pub fn from_module(
        name: impl Into<String>,
        module: Module,
        limits: InstanceLimits,
    ) -> HostResult<Self> {
        let name = name.into();
        let generation = detect_from_exports(module.exports().map(|export| export.name()))?;

        AbiDetected {
            module_name: &name,
            generation: generation.as_str(),
        }
        .log();

        Ok(Self {
            name,
            engine: module.engine().clone(),
            module,
            generation,
            limits,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generation(&self) -> AbiGeneration {
        self.generation
    }

    pub fn limits(&self) -> InstanceLimits {
        self.limits
    }

    /// Instantiates with the default shim (OS randomness, console output to tracing).
    pub fn instantiate(&self) -> HostResult<GuestInstance> {
        self.instantiate_with(ShimState::default())
    }

    /// Instantiates against `shim`, requires a `memory` export and binds it into the shim.
    ///
    /// # Errors
    /// * `ShimUnbound` if a guest start function calls a shim import
    /// * `MissingMemoryExport` if the instance exports no memory named `memory`
    /// * `ModuleError` for link failures (unknown imports, signature mismatches)
    pub fn instantiate_with(&self, shim: ShimState) -> HostResult<GuestInstance> {
        let mut store = Store::new(&self.engine, shim);
        store
            .set_fuel(self.limits.fuel)
            .map_err(|e| HostError::EngineError(e.to_string()))?;

        let mut linker = Linker::new(&self.engine);
        shim::add_to_linker(&mut linker)?;

        let start = Instant::now();
        let instance = linker
            .instantiate(&mut store, &self.module)
            .map_err(|e| match HostError::from_guest_call(e, start.elapsed()) {
                HostError::ExecutionError(e) => HostError::ModuleError(format!(
                    "failed to instantiate '{}': {}",
                    self.name, e
                )),
                other => other,
            })?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or(HostError::MissingMemoryExport)?;
        store.data_mut().bind(memory);

        let id = InstanceId::next();
        InstanceCreated {
            instance_id: id.as_u64(),
            module_name: &self.name,
            memory_bytes: memory.data_size(&store),
        }
        .log();

        Ok(GuestInstance {
            id,
            store,
            instance,
            memory,
            generation: self.generation,
            limits: self.limits,
        })
    }
}

impl fmt::Debug for GuestModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuestModule")
            .field("name", &self.name)
            .field("generation", &self.generation)
            .field("limits", &self.limits)
            .finish()
    }
}

/// One running copy of a guest module.
///
/// Every guest call takes `&mut self`, so a memory is never touched by two calls at once.
pub struct GuestInstance {
    id: InstanceId,
    store: Store<ShimState>,
    instance: Instance,
    memory: Memory,
    generation: AbiGeneration,
    limits: InstanceLimits,
}

impl GuestInstance {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn generation(&self) -> AbiGeneration {
        self.generation
    }

    pub fn limits(&self) -> InstanceLimits {
        self.limits
    }

    /// Current contents of guest linear memory.
    pub fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    pub(crate) fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.data_mut(&mut self.store)
    }

    pub fn has_export(&mut self, name: &str) -> bool {
        self.instance.get_func(&mut self.store, name).is_some()
    }

    /// First name in `candidates` the instance exports as a function.
    pub(crate) fn find_export(&mut self, candidates: &[&'static str]) -> Option<&'static str> {
        candidates
            .iter()
            .copied()
            .find(|name| self.has_export(name))
    }

    /// Calls a typed export with a full fuel budget.
    pub fn call<P, R>(&mut self, name: &str, params: P) -> HostResult<R>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| HostError::MissingExport(name.to_string()))?;
        let typed = func.typed::<P, R>(&self.store).map_err(|e| {
            HostError::ModuleError(format!("export '{}' has an unexpected signature: {}", name, e))
        })?;

        self.store
            .set_fuel(self.limits.fuel)
            .map_err(|e| HostError::EngineError(e.to_string()))?;

        let start = Instant::now();
        typed.call(&mut self.store, params).map_err(|e| {
            let error = HostError::from_guest_call(e, start.elapsed());
            GuestCallFailed {
                instance_id: self.id.as_u64(),
                export: name,
                error: &error,
            }
            .log();
            error
        })
    }

    /// `alloc(len)`; a null result is `AllocationFailed`.
    pub fn alloc(&mut self, len: u32) -> HostResult<u32> {
        let address: u32 = self.call("alloc", len)?;
        if address == 0 {
            return Err(HostError::AllocationFailed(len as usize));
        }
        Ok(address)
    }

    /// `dealloc(address, len)` with the exact values `alloc` was called with.
    pub fn dealloc(&mut self, address: u32, len: u32) -> HostResult<()> {
        self.call("dealloc", (address, len))
    }
}

impl fmt::Debug for GuestInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuestInstance")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
