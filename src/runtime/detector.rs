// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Guest ABI generation detection
//!
//! Guest codec modules have shipped three export conventions over time. This module
//! classifies a binary by its export names, using wasmparser to read the export section
//! without compiling the module.

use crate::runtime::error::{HostError, HostResult};
use std::collections::HashSet;
use std::fmt;

use wasmparser::{Encoding, Parser, Payload};

/// Export convention implemented by a guest binary.
///
/// - `VecParts`: one operation per binary (or `decode_jpeg`-style names), results are
///   `(ptr, len, cap)` records reclaimed with `dealloc_vec`, no error accessor.
/// - `ImageRecord`: 24-byte image records reclaimed with `image_destroy`, one global
///   last-error slot.
/// - `Context`: like `ImageRecord` but every operation takes a context handle that owns
///   the last-error slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AbiGeneration {
    VecParts,
    ImageRecord,
    Context,
}

impl AbiGeneration {
    pub fn as_str(self) -> &'static str {
        match self {
            AbiGeneration::VecParts => "VecParts",
            AbiGeneration::ImageRecord => "ImageRecord",
            AbiGeneration::Context => "Context",
        }
    }

    /// Export names that reclaim a result record, in lookup order.
    pub fn reclaim_exports(self) -> &'static [&'static str] {
        match self {
            AbiGeneration::VecParts => &["dealloc_vec"],
            AbiGeneration::ImageRecord => &["image_destroy", "image_drop"],
            AbiGeneration::Context => &["image_drop", "image_destroy"],
        }
    }

    /// Export names that free a last-error message, in lookup order.
    pub fn message_free_exports(self) -> &'static [&'static str] {
        match self {
            AbiGeneration::VecParts => &[],
            AbiGeneration::ImageRecord => &["error_message_destroy", "error_message_drop"],
            AbiGeneration::Context => &["error_message_drop", "error_message_destroy"],
        }
    }

    /// Export names that destroy a context, in lookup order.
    pub fn context_free_exports(self) -> &'static [&'static str] {
        match self {
            AbiGeneration::Context => &["context_drop", "context_destroy"],
            _ => &[],
        }
    }

    /// True when results are 24-byte image records carrying their own dimensions.
    #[inline]
    pub fn uses_image_records(self) -> bool {
        !matches!(self, AbiGeneration::VecParts)
    }

    /// True when operations take a context handle as first argument.
    #[inline]
    pub fn has_context(self) -> bool {
        matches!(self, AbiGeneration::Context)
    }
}

impl fmt::Display for AbiGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a guest by the names of its exports.
///
/// # Errors
/// Returns `UnsupportedAbi` when the allocator pair is missing or no reclaim export
/// identifies a known generation.
pub fn detect_from_exports<'a, I>(names: I) -> HostResult<AbiGeneration>
where
    I: IntoIterator<Item = &'a str>,
{
    let exports: HashSet<&str> = names.into_iter().collect();

    for required in ["alloc", "dealloc"] {
        if !exports.contains(required) {
            return Err(HostError::UnsupportedAbi(format!(
                "missing allocator export '{}'",
                required
            )));
        }
    }

    if exports.contains("context_new") {
        Ok(AbiGeneration::Context)
    } else if exports.contains("image_destroy") || exports.contains("image_drop") {
        Ok(AbiGeneration::ImageRecord)
    } else if exports.contains("dealloc_vec") {
        Ok(AbiGeneration::VecParts)
    } else {
        Err(HostError::UnsupportedAbi(
            "no result reclaim export (dealloc_vec, image_destroy or image_drop)".to_string(),
        ))
    }
}

/// Detects the ABI generation of a raw guest binary.
///
/// # Errors
/// Returns an error if the input is not a valid core module (components are rejected)
/// or if its exports match no supported generation.
pub fn detect_abi_generation(bytes: &[u8]) -> HostResult<AbiGeneration> {
    let mut encoding = None;
    let mut names = Vec::new();

    for payload in Parser::new(0).parse_all(bytes) {
        match payload? {
            Payload::Version { encoding: enc, .. } => {
                encoding = Some(enc);
            }
            Payload::ExportSection(reader) => {
                for export in reader {
                    names.push(export?.name);
                }
            }
            _ => {}
        }
    }

    match encoding {
        Some(Encoding::Module) => detect_from_exports(names),
        Some(Encoding::Component) => Err(HostError::UnsupportedAbi(
            "component model binaries are not guest codec modules".to_string(),
        )),
        None => Err(HostError::ModuleError("Invalid WASM binary".to_string())),
    }
}
