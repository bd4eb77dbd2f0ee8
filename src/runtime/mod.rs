// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Host runtime for guest image codec modules.
//!
//! # Architecture
//!
//! ```text
//! load_wasm_bytes ──▶ detect_abi_generation ──▶ GuestModule
//!                                                   │ instantiate (shim linked, memory bound)
//!                                                   ▼
//!                                             GuestInstance ◀── marshal::{decode, resize, encode, hash}
//!                                                   │
//!                                     GuestBuffer / GuestAllocation / GuestContext
//! ```
//!
//! - **shim**: the `wasi_snapshot_preview1` subset guests import
//! - **instance**: compilation, instantiation, metered calls
//! - **buffer**: move-only handles for guest-owned memory
//! - **marshal**: alloc, write, call, free
//! - **guest_error**: last-error message retrieval

pub mod buffer;
pub mod detector;
pub mod engine;
pub mod error;
pub mod format;
pub mod guest_error;
pub mod instance;
pub mod loader;
pub mod marshal;
mod memory;
pub mod shim;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use buffer::{BufferHeader, GuestAllocation, GuestBuffer, GuestContext};
pub use detector::{detect_abi_generation, AbiGeneration};
pub use engine::create_engine;
pub use error::{HostError, HostResult};
pub use format::{OutputFormat, SourceFormat};
pub use instance::{GuestInstance, GuestModule, InstanceId, InstanceLimits};
pub use loader::load_wasm_bytes;
pub use shim::{
    BufferedSink, ConsoleSink, ConsoleStream, OsRandom, RandomSource, ShimState, TracingSink,
};
