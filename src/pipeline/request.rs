// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Consumer-facing request and response types.

use crate::runtime::error::{HostError, HostResult};
use crate::runtime::format::{OutputFormat, SourceFormat};
use serde::{Deserialize, Serialize};

/// Target size for the resize stage.
///
/// With `maintain_aspect` the image is scaled to the largest size that fits inside
/// `width` x `height`; without it the output is exactly `width` x `height`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub maintain_aspect: bool,
}

/// One decode → (resize) → encode run.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub input: Vec<u8>,
    pub source_format: SourceFormat,
    pub resize: Option<ResizeSpec>,
    pub output_format: OutputFormat,
    /// Also return the guest's content digest of the image that was encoded.
    pub compute_hash: bool,
}

impl TransformRequest {
    pub fn new(input: Vec<u8>, source_format: SourceFormat, output_format: OutputFormat) -> Self {
        Self {
            input,
            source_format,
            resize: None,
            output_format,
            compute_hash: false,
        }
    }

    pub fn with_resize(mut self, width: u32, height: u32, maintain_aspect: bool) -> Self {
        self.resize = Some(ResizeSpec {
            width,
            height,
            maintain_aspect,
        });
        self
    }

    pub fn with_hash(mut self) -> Self {
        self.compute_hash = true;
        self
    }

    pub fn validate(&self) -> HostResult<()> {
        if self.input.is_empty() {
            return Err(HostError::ValidationError("input is empty".to_string()));
        }
        if let Some(spec) = self.resize {
            if spec.width == 0 || spec.height == 0 {
                return Err(HostError::ValidationError(format!(
                    "invalid target dimensions {}x{}",
                    spec.width, spec.height
                )));
            }
        }
        Ok(())
    }
}

/// Encoded result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    /// Lowercase hex digest, when requested.
    pub hash: Option<String>,
}

impl TransformOutput {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    /// `stem` plus the conventional extension, e.g. `result_from_jpeg.jpg`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.extension())
    }
}
