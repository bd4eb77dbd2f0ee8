// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for system calls serviced by the capability shim.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// The guest invoked a system call the shim refuses to emulate.
///
/// # Log Level
/// `error!` - The guest instance is unusable afterwards
///
/// # Example
/// ```
/// use wimg_host::observability::messages::shim::UnsupportedSystemCallInvoked;
///
/// let msg = UnsupportedSystemCallInvoked { call: "fd_seek" };
/// assert!(msg.to_string().contains("fd_seek"));
/// ```
pub struct UnsupportedSystemCallInvoked<'a> {
    pub call: &'a str,
}

impl Display for UnsupportedSystemCallInvoked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Guest invoked unsupported system call: {}", self.call)
    }
}

impl StructuredLog for UnsupportedSystemCallInvoked<'_> {
    fn log(&self) {
        tracing::error!(call = self.call, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("unsupported_system_call", span_name = name, call = self.call)
    }
}

/// The guest called `proc_exit`.
///
/// # Log Level
/// `warn!` - Codecs exit on panic; the caller sees `ProcessTerminated`
pub struct GuestTerminated {
    pub code: i32,
}

impl Display for GuestTerminated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Guest requested process exit with code {}", self.code)
    }
}

impl StructuredLog for GuestTerminated {
    fn log(&self) {
        tracing::warn!(code = self.code, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("guest_terminated", span_name = name, code = self.code)
    }
}

/// `fd_write` targeted a descriptor other than stdout or stderr.
///
/// # Log Level
/// `warn!` - The guest receives `EBADF` and may continue
pub struct BadDescriptorRejected {
    pub fd: i32,
}

impl Display for BadDescriptorRejected {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Rejected guest write to file descriptor {}", self.fd)
    }
}

impl StructuredLog for BadDescriptorRejected {
    fn log(&self) {
        tracing::warn!(fd = self.fd, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("bad_descriptor", span_name = name, fd = self.fd)
    }
}

/// A shim function ran before the instance memory was bound.
///
/// # Log Level
/// `error!` - Usually a guest start function touching the system interface
pub struct ShimCalledUnbound<'a> {
    pub call: &'a str,
}

impl Display for ShimCalledUnbound<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "System call '{}' arrived before guest memory was bound",
            self.call
        )
    }
}

impl StructuredLog for ShimCalledUnbound<'_> {
    fn log(&self) {
        tracing::error!(call = self.call, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("shim_unbound", span_name = name, call = self.call)
    }
}
