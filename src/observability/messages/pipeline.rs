// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline orchestration events.
//!
//! This module contains message types for logging events related to:
//! * Pipeline run start and completion
//! * Individual stage results
//! * Buffer hand-off between independent instances
//! * Pipeline failures

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A pipeline run is starting.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use wimg_host::observability::messages::pipeline::PipelineStarted;
///
/// let msg = PipelineStarted {
///     topology: "single",
///     source_format: "jpeg",
///     output_format: "webp",
///     input_bytes: 52_113,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PipelineStarted<'a> {
    pub topology: &'a str,
    pub source_format: &'a str,
    pub output_format: &'a str,
    pub input_bytes: usize,
}

impl Display for PipelineStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting {} pipeline: {} ({} bytes) -> {}",
            self.topology, self.source_format, self.input_bytes, self.output_format
        )
    }
}

impl StructuredLog for PipelineStarted<'_> {
    fn log(&self) {
        tracing::info!(
            topology = self.topology,
            source_format = self.source_format,
            output_format = self.output_format,
            input_bytes = self.input_bytes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_run",
            span_name = name,
            topology = self.topology,
            source_format = self.source_format,
            output_format = self.output_format,
        )
    }
}

/// One pipeline stage produced its result.
///
/// # Log Level
/// `debug!` - Detailed per-stage information
pub struct StageCompleted<'a> {
    pub stage: &'a str,
    pub width: u32,
    pub height: u32,
    pub duration_ms: u128,
}

impl Display for StageCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' completed in {}ms ({}x{})",
            self.stage, self.duration_ms, self.width, self.height
        )
    }
}

impl StructuredLog for StageCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            stage = self.stage,
            width = self.width,
            height = self.height,
            duration_ms = self.duration_ms,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("stage", span_name = name, stage = self.stage)
    }
}

/// A stage result was copied out of one instance and into the next.
///
/// # Log Level
/// `debug!` - Detailed per-stage information
pub struct BufferHandedOff<'a> {
    pub from_stage: &'a str,
    pub to_stage: &'a str,
    pub bytes: usize,
}

impl Display for BufferHandedOff<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Handed off {} bytes from '{}' instance to '{}' instance",
            self.bytes, self.from_stage, self.to_stage
        )
    }
}

impl StructuredLog for BufferHandedOff<'_> {
    fn log(&self) {
        tracing::debug!(
            from_stage = self.from_stage,
            to_stage = self.to_stage,
            bytes = self.bytes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "buffer_hand_off",
            span_name = name,
            from_stage = self.from_stage,
            to_stage = self.to_stage,
        )
    }
}

/// A pipeline run finished successfully.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineCompleted<'a> {
    pub output_format: &'a str,
    pub width: u32,
    pub height: u32,
    pub output_bytes: usize,
    pub duration_ms: u128,
}

impl Display for PipelineCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline completed in {}ms: {}x{} {} ({} bytes)",
            self.duration_ms, self.width, self.height, self.output_format, self.output_bytes
        )
    }
}

impl StructuredLog for PipelineCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            output_format = self.output_format,
            width = self.width,
            height = self.height,
            output_bytes = self.output_bytes,
            duration_ms = self.duration_ms,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_completed",
            span_name = name,
            output_format = self.output_format,
        )
    }
}

/// A pipeline run failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use wimg_host::observability::messages::pipeline::PipelineFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad jpeg");
/// let msg = PipelineFailed {
///     stage: "decode",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct PipelineFailed<'a> {
    pub stage: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for PipelineFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Pipeline failed at stage '{}': {}", self.stage, self.error)
    }
}

impl StructuredLog for PipelineFailed<'_> {
    fn log(&self) {
        tracing::error!(stage = self.stage, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "pipeline_failed",
            span_name = name,
            stage = self.stage,
            error = %self.error,
        )
    }
}
