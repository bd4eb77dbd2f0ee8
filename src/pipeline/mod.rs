// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Decode → resize → encode orchestration over guest codec modules.
//!
//! Two topologies are supported:
//! * [`SingleInstancePipeline`] - one guest binary exposes every operation and buffers
//!   move between stages by pointer.
//! * [`MultiInstancePipeline`] - one guest binary per stage; each result is copied out of
//!   its producer, released there, and re-marshaled into the next instance.

mod builder;
mod multi;
mod request;
mod single;


pub use builder::PipelineBuilder;
pub use multi::MultiInstancePipeline;
pub use request::{ResizeSpec, TransformOutput, TransformRequest};
pub use single::SingleInstancePipeline;

use crate::observability::messages::pipeline::PipelineFailed;
use crate::observability::messages::StructuredLog;
use crate::runtime::buffer::log_cleanup_failure;
use crate::runtime::{GuestContext, GuestInstance, HostError, HostResult};

/// Destroys the run's context and passes `result` through.
///
/// A failed run keeps its own error; a context that cannot be destroyed is only logged.
pub(crate) fn close_context<T>(
    instance: &mut GuestInstance,
    ctx: GuestContext,
    result: HostResult<T>,
) -> HostResult<T> {
    let destroyed = ctx.destroy(instance);
    match (result, destroyed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(error)) => Err(error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(cleanup)) => {
            log_cleanup_failure(instance, "context", &cleanup);
            Err(error)
        }
    }
}

/// Logs a stage failure and hands the error back for propagation.
pub(crate) fn stage_failed(stage: &str, error: HostError) -> HostError {
    PipelineFailed {
        stage,
        error: &error,
    }
    .log();
    error
}
