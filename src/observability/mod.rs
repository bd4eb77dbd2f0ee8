// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Message types follow a struct-based pattern with a `Display` implementation so log
//! text lives in one place instead of being scattered through the runtime as string
//! literals.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::runtime` - guest loading, instantiation and call events
//! * `messages::shim` - capability shim events
//! * `messages::pipeline` - pipeline orchestration events
//!
//! # Usage
//!
//! ```rust
//! use wimg_host::observability::messages::pipeline::PipelineFailed;
//!
//! let error = std::io::Error::new(std::io::ErrorKind::Other, "test error");
//! let msg = PipelineFailed {
//!     stage: "encode",
//!     error: &error,
//! };
//!
//! tracing::error!("{}", msg);
//! ```

pub mod messages;

use std::sync::OnceLock;
use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INSTALLED: OnceLock<()> = OnceLock::new();

/// Installs the global fmt subscriber writing compact lines to stderr.
///
/// `RUST_LOG` takes precedence over `default_level` when set. Calling this more than once
/// is harmless; only the first call installs a subscriber.
pub fn init_tracing(default_level: &str) {
    TRACING_INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        let subscriber = fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact()
            .finish();
        // Another subscriber may already be installed by the embedding application.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
