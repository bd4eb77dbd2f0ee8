// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for human-readable output and
//! [`StructuredLog`] to emit itself as a `tracing` event with typed fields.
//!
//! # Organization
//!
//! * `runtime` - guest module loading, instantiation and guest call events
//! * `shim` - system calls serviced (or refused) by the capability shim
//! * `pipeline` - decode → resize → encode orchestration events
//!
//! # Usage Pattern
//!
//! ```rust
//! use wimg_host::observability::messages::runtime::ModuleLoaded;
//! use wimg_host::observability::messages::StructuredLog;
//!
//! let msg = ModuleLoaded {
//!     module_path: "wasm/wimg.wasm",
//!     size_bytes: 4096,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod pipeline;
pub mod runtime;
pub mod shim;

/// A log message that knows its level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a `tracing` event at its natural level.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
