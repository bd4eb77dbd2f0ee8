// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Minimal system interface for guest codec modules.
//!
//! Guest codecs are compiled for `wasm32-wasi` and import a handful of
//! `wasi_snapshot_preview1` functions even though they never touch files or sockets.
//! This shim satisfies exactly that subset:
//!
//! | Import | Behavior |
//! |---|---|
//! | `fd_write` | fd 1 and 2 are forwarded to the [`ConsoleSink`]; any other fd is `EBADF` |
//! | `environ_sizes_get` / `environ_get` | an empty environment |
//! | `random_get` | bytes from the injected [`RandomSource`] |
//! | `sched_yield` | no-op |
//! | `proc_exit` | traps with `ProcessTerminated` |
//! | `fd_close` / `fd_seek` | trap with `UnsupportedSystemCall` |
//!
//! The shim is created [`Binding::Unbound`] and only becomes usable once the loader binds
//! the instance's exported memory. Any import invoked before that (for example from a
//! guest start function) traps with `ShimUnbound`.

use crate::observability::messages::shim::{
    BadDescriptorRejected, GuestTerminated, ShimCalledUnbound, UnsupportedSystemCallInvoked,
};
use crate::observability::messages::StructuredLog;
use crate::runtime::error::{HostError, HostResult};
use crate::runtime::memory::{read_u32_le, span, span_mut, write_u32_le};
use std::fmt;
use std::sync::{Arc, Mutex};
use wasmtime::{Caller, Linker, Memory};

/// Import module name used by `wasm32-wasi` guests.
pub const WASI_MODULE: &str = "wasi_snapshot_preview1";

pub const ERRNO_SUCCESS: i32 = 0;
pub const ERRNO_BADF: i32 = 8;

const STDOUT_FD: i32 = 1;
const STDERR_FD: i32 = 2;
const IOVEC_SIZE: u32 = 8;

/// Console stream a guest wrote to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

impl ConsoleStream {
    fn from_fd(fd: i32) -> Option<Self> {
        match fd {
            STDOUT_FD => Some(ConsoleStream::Stdout),
            STDERR_FD => Some(ConsoleStream::Stderr),
            _ => None,
        }
    }
}

/// Receives text the guest writes to stdout or stderr.
pub trait ConsoleSink: Send + Sync {
    fn write(&self, stream: ConsoleStream, text: &str);
}

/// Routes guest stdout to `info!` and stderr to `error!` under the `guest` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ConsoleSink for TracingSink {
    fn write(&self, stream: ConsoleStream, text: &str) {
        match stream {
            ConsoleStream::Stdout => tracing::info!(target: "guest", "{}", text),
            ConsoleStream::Stderr => tracing::error!(target: "guest", "{}", text),
        }
    }
}

/// Keeps every guest write in memory. Useful for capturing codec diagnostics.
#[derive(Debug, Default, Clone)]
pub struct BufferedSink {
    lines: Arc<Mutex<Vec<(ConsoleStream, String)>>>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn lines(&self) -> Vec<(ConsoleStream, String)> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ConsoleSink for BufferedSink {
    fn write(&self, stream: ConsoleStream, text: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push((stream, text.to_string()));
    }
}

/// Source of bytes for `random_get`.
pub trait RandomSource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> HostResult<()>;
}

/// Operating system CSPRNG via `getrandom`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> HostResult<()> {
        getrandom::getrandom(dest).map_err(|e| HostError::EntropyUnavailable(e.to_string()))
    }
}

/// Whether the shim has a guest memory to operate on.
#[derive(Debug, Clone, Copy)]
pub enum Binding {
    Unbound,
    Bound(Memory),
}

/// Per-store state backing the shim imports.
pub struct ShimState {
    binding: Binding,
    random: Arc<dyn RandomSource>,
    sink: Arc<dyn ConsoleSink>,
}

impl ShimState {
    pub fn new(random: Arc<dyn RandomSource>, sink: Arc<dyn ConsoleSink>) -> Self {
        Self {
            binding: Binding::Unbound,
            random,
            sink,
        }
    }

    pub(crate) fn binding(&self) -> Binding {
        self.binding
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.binding, Binding::Bound(_))
    }

    /// Transition to `Bound`. Called by the loader right after instantiation.
    pub(crate) fn bind(&mut self, memory: Memory) {
        self.binding = Binding::Bound(memory);
    }

    fn bound_memory(&self, call: &'static str) -> HostResult<Memory> {
        match self.binding {
            Binding::Bound(memory) => Ok(memory),
            Binding::Unbound => {
                ShimCalledUnbound { call }.log();
                Err(HostError::ShimUnbound(call))
            }
        }
    }
}

impl Default for ShimState {
    fn default() -> Self {
        Self::new(Arc::new(OsRandom), Arc::new(TracingSink))
    }
}

impl fmt::Debug for ShimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShimState")
            .field("bound", &self.is_bound())
            .finish_non_exhaustive()
    }
}

/// Gathers an iovec list, forwards it to the sink and records the byte count.
///
/// On a bad descriptor nothing reaches the sink and `nwritten` is zeroed if it lies in
/// memory; an unaddressable `nwritten` does not turn the BADF errno into a trap.
pub fn fd_write(
    memory: &mut [u8],
    sink: &dyn ConsoleSink,
    fd: i32,
    iovs: u32,
    iovs_len: u32,
    nwritten: u32,
) -> HostResult<u32> {
    let Some(stream) = ConsoleStream::from_fd(fd) else {
        let _ = write_u32_le(memory, nwritten, 0);
        return Err(HostError::BadDescriptor(fd));
    };

    let mut bytes = Vec::new();
    for index in 0..iovs_len {
        let entry = index
            .checked_mul(IOVEC_SIZE)
            .and_then(|offset| iovs.checked_add(offset))
            .ok_or_else(|| HostError::OutOfBounds(format!("iovec {} overflows", index)))?;
        let offset = read_u32_le(memory, entry)?;
        let len = read_u32_le(memory, entry + 4)?;
        bytes.extend_from_slice(span(memory, offset, len)?);
    }

    let total = u32::try_from(bytes.len())
        .map_err(|_| HostError::OutOfBounds("iovec total exceeds u32".to_string()))?;

    if !bytes.is_empty() {
        let text = String::from_utf8_lossy(&bytes);
        sink.write(stream, text.strip_suffix('\n').unwrap_or(&text));
    }

    write_u32_le(memory, nwritten, total)?;
    Ok(total)
}

/// Reports an empty environment: zero variables, zero bytes of storage.
pub fn environ_sizes_get(memory: &mut [u8], count: u32, buf_size: u32) -> HostResult<()> {
    write_u32_le(memory, count, 0)?;
    write_u32_le(memory, buf_size, 0)
}

pub fn random_get(
    memory: &mut [u8],
    random: &dyn RandomSource,
    offset: u32,
    len: u32,
) -> HostResult<()> {
    random.fill(span_mut(memory, offset, len)?)
}

/// Registers every shim import on `linker`.
pub fn add_to_linker(linker: &mut Linker<ShimState>) -> HostResult<()> {
    let link_error = |e: wasmtime::Error| HostError::ModuleError(e.to_string());

    linker
        .func_wrap(
            WASI_MODULE,
            "fd_write",
            |mut caller: Caller<'_, ShimState>,
             fd: i32,
             iovs: i32,
             iovs_len: i32,
             nwritten: i32|
             -> wasmtime::Result<i32> {
                let memory = caller.data().bound_memory("fd_write")?;
                let (data, state) = memory.data_and_store_mut(&mut caller);
                let sink = Arc::clone(&state.sink);
                match fd_write(
                    data,
                    sink.as_ref(),
                    fd,
                    iovs as u32,
                    iovs_len as u32,
                    nwritten as u32,
                ) {
                    Ok(_) => Ok(ERRNO_SUCCESS),
                    Err(HostError::BadDescriptor(fd)) => {
                        BadDescriptorRejected { fd }.log();
                        Ok(ERRNO_BADF)
                    }
                    Err(e) => Err(e.into()),
                }
            },
        )
        .map_err(link_error)?;

    linker
        .func_wrap(
            WASI_MODULE,
            "environ_sizes_get",
            |mut caller: Caller<'_, ShimState>,
             count: i32,
             buf_size: i32|
             -> wasmtime::Result<i32> {
                let memory = caller.data().bound_memory("environ_sizes_get")?;
                environ_sizes_get(
                    memory.data_mut(&mut caller),
                    count as u32,
                    buf_size as u32,
                )?;
                Ok(ERRNO_SUCCESS)
            },
        )
        .map_err(link_error)?;

    linker
        .func_wrap(
            WASI_MODULE,
            "environ_get",
            |caller: Caller<'_, ShimState>, _environ: i32, _buf: i32| -> wasmtime::Result<i32> {
                caller.data().bound_memory("environ_get")?;
                Ok(ERRNO_SUCCESS)
            },
        )
        .map_err(link_error)?;

    linker
        .func_wrap(
            WASI_MODULE,
            "random_get",
            |mut caller: Caller<'_, ShimState>, offset: i32, len: i32| -> wasmtime::Result<i32> {
                let memory = caller.data().bound_memory("random_get")?;
                let (data, state) = memory.data_and_store_mut(&mut caller);
                random_get(data, state.random.as_ref(), offset as u32, len as u32)?;
                Ok(ERRNO_SUCCESS)
            },
        )
        .map_err(link_error)?;

    linker
        .func_wrap(
            WASI_MODULE,
            "sched_yield",
            |caller: Caller<'_, ShimState>| -> wasmtime::Result<i32> {
                caller.data().bound_memory("sched_yield")?;
                Ok(ERRNO_SUCCESS)
            },
        )
        .map_err(link_error)?;

    linker
        .func_wrap(
            WASI_MODULE,
            "proc_exit",
            |caller: Caller<'_, ShimState>, code: i32| -> wasmtime::Result<()> {
                caller.data().bound_memory("proc_exit")?;
                GuestTerminated { code }.log();
                Err(HostError::ProcessTerminated { code }.into())
            },
        )
        .map_err(link_error)?;

    linker
        .func_wrap(
            WASI_MODULE,
            "fd_close",
            |caller: Caller<'_, ShimState>, _fd: i32| -> wasmtime::Result<i32> {
                caller.data().bound_memory("fd_close")?;
                Err(unsupported("fd_close").into())
            },
        )
        .map_err(link_error)?;

    linker
        .func_wrap(
            WASI_MODULE,
            "fd_seek",
            |caller: Caller<'_, ShimState>,
             _fd: i32,
             _offset: i64,
             _whence: i32,
             _newoffset: i32|
             -> wasmtime::Result<i32> {
                caller.data().bound_memory("fd_seek")?;
                Err(unsupported("fd_seek").into())
            },
        )
        .map_err(link_error)?;

    Ok(())
}

fn unsupported(call: &'static str) -> HostError {
    UnsupportedSystemCallInvoked { call }.log();
    HostError::UnsupportedSystemCall(call)
}
