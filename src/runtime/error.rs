// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for the guest runtime.
//!
//! Every failure that can happen while loading a guest codec module, servicing its
//! system calls, or marshaling buffers across linear memory is a [`HostError`].
//! Errors raised inside shim host functions travel through wasmtime as trap payloads;
//! [`HostError::from_guest_call`] recovers them on the other side.

use std::time::Duration;
use thiserror::Error;

/// Error type for all guest runtime operations.
#[derive(Error, Debug)]
pub enum HostError {
    /// The guest instance does not export a linear memory named `memory`.
    #[error("guest module does not export a linear memory named 'memory'")]
    MissingMemoryExport,

    /// A guest decode/resize/encode/hash call returned its failure sentinel.
    #[error("guest {operation} failed: {message}")]
    GuestOperationFailed {
        operation: &'static str,
        message: String,
    },

    /// `fd_write` was called with a descriptor other than stdout or stderr.
    #[error("bad file descriptor: {0}")]
    BadDescriptor(i32),

    /// The guest called a system interface function the shim does not implement.
    #[error("unsupported system call: {0}")]
    UnsupportedSystemCall(&'static str),

    /// The guest called `proc_exit`.
    #[error("guest process terminated with exit code {code}")]
    ProcessTerminated { code: i32 },

    /// A shim function ran before the instance memory was bound.
    #[error("capability shim called before guest memory was bound: {0}")]
    ShimUnbound(&'static str),

    /// The injected random source could not produce bytes for `random_get`.
    #[error("random source unavailable: {0}")]
    EntropyUnavailable(String),

    /// A required export is absent from the guest instance.
    #[error("guest module does not export '{0}'")]
    MissingExport(String),

    /// A buffer or allocation was used with an instance that did not produce it.
    #[error("buffer belongs to guest instance {owner}, not instance {used_with}")]
    ForeignBuffer { owner: u64, used_with: u64 },

    /// A read or write fell outside guest linear memory.
    #[error("guest memory access out of bounds: {0}")]
    OutOfBounds(String),

    /// The guest allocator returned a null pointer.
    #[error("guest allocation of {0} bytes failed")]
    AllocationFailed(usize),

    /// Input validation error (size limits, unsupported combination, ...).
    #[error("invalid input: {0}")]
    ValidationError(String),

    /// The binary exports match none of the supported ABI generations.
    #[error("unsupported guest ABI: {0}")]
    UnsupportedAbi(String),

    /// Module compilation, linking or export typing error.
    #[error("WASM module error: {0}")]
    ModuleError(String),

    /// Wasmtime engine creation or configuration error.
    #[error("engine creation error: {0}")]
    EngineError(String),

    /// Guest call ran past its fuel budget.
    #[error("guest call exhausted its fuel budget after {0:?}")]
    FuelExhausted(Duration),

    /// File I/O error while loading a module.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A guest string was not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// Trap or other wasmtime runtime failure.
    #[error("WASM execution error: {0}")]
    ExecutionError(wasmtime::Error),

    /// WASM binary parsing error from wasmparser.
    #[error("WASM parser error: {0}")]
    ParserError(#[from] wasmparser::BinaryReaderError),

    /// Pipeline configuration could not be turned into a pipeline.
    #[error("configuration error: {0}")]
    Config(#[from] crate::errors::ConfigError),

    /// A blocking pipeline task panicked or was cancelled.
    #[error("pipeline task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl HostError {
    /// Convert an error returned by a wasmtime call back into a `HostError`.
    ///
    /// Shim host functions fail by returning a `HostError` wrapped in `wasmtime::Error`;
    /// that payload is recovered here so callers see e.g. `ProcessTerminated` rather than
    /// an opaque trap.
    pub fn from_guest_call(error: wasmtime::Error, elapsed: Duration) -> Self {
        if matches!(
            error.downcast_ref::<wasmtime::Trap>(),
            Some(wasmtime::Trap::OutOfFuel)
        ) {
            return HostError::FuelExhausted(elapsed);
        }
        match error.downcast::<HostError>() {
            Ok(host_error) => host_error,
            Err(other) => HostError::ExecutionError(other),
        }
    }

    /// True for errors after which the instance must not be called again.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HostError::MissingMemoryExport
                | HostError::UnsupportedSystemCall(_)
                | HostError::ProcessTerminated { .. }
                | HostError::ShimUnbound(_)
                | HostError::ExecutionError(_)
                | HostError::FuelExhausted(_)
        )
    }
}

/// Result type alias for guest runtime operations.
pub type HostResult<T> = Result<T, HostError>;
