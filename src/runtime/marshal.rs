// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Marshaling of codec operations across the host/guest boundary.
//!
//! Every operation that takes host bytes follows the same shape:
//!
//! 1. `alloc(len)` in the guest
//! 2. copy the bytes into the returned span
//! 3. call the operation export with `(offset, len, ...)`
//! 4. `dealloc(offset, len)`, on success and on failure
//! 5. wrap the returned record address as a [`GuestBuffer`]
//!
//! Operations on an existing buffer pass its address (or payload span) directly, since
//! it already lives in the same memory. A null record means failure and is turned into
//! `GuestOperationFailed` through the guest's last-error accessor.

use crate::runtime::buffer::{log_cleanup_failure, GuestAllocation, GuestBuffer, GuestContext};
use crate::runtime::detector::AbiGeneration;
use crate::runtime::error::{HostError, HostResult};
use crate::runtime::format::{OutputFormat, SourceFormat};
use crate::runtime::guest_error::guest_failure;
use crate::runtime::instance::GuestInstance;

const DIGEST_SIZE: u32 = 8;

/// Largest `(width, height)` with the aspect ratio of `source` that fits in `bounds`.
///
/// Rounds to the nearest pixel and never returns a zero dimension.
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (source_width, source_height) = (u64::from(source.0), u64::from(source.1));
    let (max_width, max_height) = (u64::from(bounds.0), u64::from(bounds.1));
    if source_width == 0 || source_height == 0 {
        return bounds;
    }

    let scale = |value: u64, numerator: u64, denominator: u64| -> u32 {
        let scaled = (value * numerator * 2 + denominator) / (denominator * 2);
        u32::try_from(scaled.max(1)).unwrap_or(u32::MAX)
    };

    if source_width * max_height <= source_height * max_width {
        (scale(source_width, max_height, source_height), bounds.1)
    } else {
        (bounds.0, scale(source_height, max_width, source_width))
    }
}

fn validate_input(instance: &GuestInstance, bytes: &[u8]) -> HostResult<()> {
    if bytes.is_empty() {
        return Err(HostError::ValidationError("input is empty".to_string()));
    }
    let max = instance.limits().max_input_size;
    if bytes.len() > max {
        return Err(HostError::ValidationError(format!(
            "input too large: {} bytes (max: {} bytes)",
            bytes.len(),
            max
        )));
    }
    Ok(())
}

fn validate_target(width: u32, height: u32) -> HostResult<()> {
    if width == 0 || height == 0 {
        return Err(HostError::ValidationError(format!(
            "invalid target dimensions {}x{}",
            width, height
        )));
    }
    Ok(())
}

fn require_vec_parts(instance: &GuestInstance, operation: &str) -> HostResult<()> {
    match instance.generation() {
        AbiGeneration::VecParts => Ok(()),
        other => Err(HostError::UnsupportedAbi(format!(
            "{} from host bytes needs a VecParts guest, instance {} is {}",
            operation,
            instance.id(),
            other
        ))),
    }
}

fn find_op_export(
    instance: &mut GuestInstance,
    candidates: &'static [&'static str],
) -> HostResult<&'static str> {
    instance
        .find_export(candidates)
        .ok_or_else(|| HostError::MissingExport(candidates.join(" or ")))
}

/// Copies `bytes` into a fresh guest allocation, runs `op` on it and frees it.
fn with_input<F>(instance: &mut GuestInstance, bytes: &[u8], op: F) -> HostResult<u32>
where
    F: FnOnce(&mut GuestInstance, u32, u32) -> HostResult<u32>,
{
    validate_input(instance, bytes)?;
    let input = GuestAllocation::copy_from(instance, bytes)?;
    let result = op(instance, input.address(), input.length());
    let freed = input.free(instance);

    match (result, freed) {
        (Ok(address), Ok(())) => Ok(address),
        (Ok(_), Err(error)) => Err(error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(cleanup)) => {
            log_cleanup_failure(instance, "input allocation", &cleanup);
            Err(error)
        }
    }
}

fn checked_result(
    instance: &mut GuestInstance,
    ctx: &GuestContext,
    operation: &'static str,
    address: u32,
) -> HostResult<u32> {
    if address == 0 {
        return Err(guest_failure(instance, ctx, operation, 0));
    }
    Ok(address)
}

/// Decodes compressed `bytes` into a raster image inside `instance`.
pub fn decode(
    instance: &mut GuestInstance,
    ctx: &GuestContext,
    bytes: &[u8],
    format: SourceFormat,
) -> HostResult<GuestBuffer> {
    ctx.check_owner(instance)?;
    let generation = instance.generation();
    let export = find_op_export(instance, format.decode_exports(generation))?;

    let address = with_input(instance, bytes, |instance, offset, length| match generation {
        AbiGeneration::Context => {
            let handle = ctx.handle_for(instance)?;
            instance.call(export, (handle, offset, length))
        }
        AbiGeneration::ImageRecord | AbiGeneration::VecParts => {
            instance.call(export, (offset, length))
        }
    })?;
    let address = checked_result(instance, ctx, "decode", address)?;

    Ok(match generation {
        AbiGeneration::VecParts => GuestBuffer::with_dimension_prefix(instance, address),
        _ => GuestBuffer::new(instance, address),
    })
}

/// Resamples `image` to `width` x `height`, or to the largest size within those bounds
/// that keeps the aspect ratio when `maintain_aspect` is set.
///
/// The source buffer is left untouched; the caller still owns and releases it.
pub fn resize(
    instance: &mut GuestInstance,
    ctx: &GuestContext,
    image: &GuestBuffer,
    width: u32,
    height: u32,
    maintain_aspect: bool,
) -> HostResult<GuestBuffer> {
    ctx.check_owner(instance)?;
    validate_target(width, height)?;

    match instance.generation() {
        AbiGeneration::Context => {
            image.header(instance)?;
            let handle = ctx.handle_for(instance)?;
            let address: u32 = instance.call(
                "resize",
                (handle, image.address(), width, height, u32::from(maintain_aspect)),
            )?;
            let address = checked_result(instance, ctx, "resize", address)?;
            Ok(GuestBuffer::new(instance, address))
        }
        AbiGeneration::ImageRecord => {
            let (width, height) = if maintain_aspect {
                fit_within(image.dimensions(instance)?, (width, height))
            } else {
                (width, height)
            };
            let address: u32 = instance.call("resize", (image.address(), width, height))?;
            let address = checked_result(instance, ctx, "resize", address)?;
            Ok(GuestBuffer::new(instance, address))
        }
        AbiGeneration::VecParts => {
            let source = image.dimensions(instance)?;
            let (offset, length) = image.payload_span(instance)?;
            let target = if maintain_aspect {
                fit_within(source, (width, height))
            } else {
                (width, height)
            };
            let address: u32 = instance.call(
                "resize",
                (offset, length, source.0, source.1, target.0, target.1),
            )?;
            let address = checked_result(instance, ctx, "resize", address)?;
            Ok(GuestBuffer::with_known_dimensions(instance, address, target))
        }
    }
}

/// Encodes `image` into compressed `format` bytes.
pub fn encode(
    instance: &mut GuestInstance,
    ctx: &GuestContext,
    image: &GuestBuffer,
    format: OutputFormat,
) -> HostResult<GuestBuffer> {
    ctx.check_owner(instance)?;
    let generation = instance.generation();
    let export = find_op_export(instance, format.encode_exports(generation))?;

    match generation {
        AbiGeneration::Context => {
            image.header(instance)?;
            let handle = ctx.handle_for(instance)?;
            let address: u32 = instance.call(export, (handle, image.address()))?;
            let address = checked_result(instance, ctx, "encode", address)?;
            Ok(GuestBuffer::new(instance, address))
        }
        AbiGeneration::ImageRecord => {
            image.header(instance)?;
            let address: u32 = instance.call(export, image.address())?;
            let address = checked_result(instance, ctx, "encode", address)?;
            Ok(GuestBuffer::new(instance, address))
        }
        AbiGeneration::VecParts => {
            let dimensions = image.dimensions(instance)?;
            let (offset, length) = image.payload_span(instance)?;
            let address: u32 =
                instance.call(export, (offset, length, dimensions.0, dimensions.1))?;
            let address = checked_result(instance, ctx, "encode", address)?;
            Ok(GuestBuffer::with_known_dimensions(
                instance, address, dimensions,
            ))
        }
    }
}

/// Resizes raw RGB8 `pixels` that came from another instance.
pub fn resize_bytes(
    instance: &mut GuestInstance,
    ctx: &GuestContext,
    pixels: &[u8],
    source: (u32, u32),
    target: (u32, u32),
    maintain_aspect: bool,
) -> HostResult<GuestBuffer> {
    ctx.check_owner(instance)?;
    require_vec_parts(instance, "resize")?;
    validate_target(target.0, target.1)?;

    let target = if maintain_aspect {
        fit_within(source, target)
    } else {
        target
    };

    let address = with_input(instance, pixels, |instance, offset, length| {
        instance.call(
            "resize",
            (offset, length, source.0, source.1, target.0, target.1),
        )
    })?;
    let address = checked_result(instance, ctx, "resize", address)?;
    Ok(GuestBuffer::with_known_dimensions(instance, address, target))
}

/// Encodes raw RGB8 `pixels` that came from another instance.
pub fn encode_bytes(
    instance: &mut GuestInstance,
    ctx: &GuestContext,
    pixels: &[u8],
    dimensions: (u32, u32),
    format: OutputFormat,
) -> HostResult<GuestBuffer> {
    ctx.check_owner(instance)?;
    require_vec_parts(instance, "encode")?;
    let export = find_op_export(instance, format.encode_exports(instance.generation()))?;

    let address = with_input(instance, pixels, |instance, offset, length| {
        instance.call(export, (offset, length, dimensions.0, dimensions.1))
    })?;
    let address = checked_result(instance, ctx, "encode", address)?;
    Ok(GuestBuffer::with_known_dimensions(
        instance, address, dimensions,
    ))
}

/// Computes the guest's 8-byte content digest of `image` as lowercase hex.
pub fn hash(
    instance: &mut GuestInstance,
    ctx: &GuestContext,
    image: &GuestBuffer,
) -> HostResult<String> {
    ctx.check_owner(instance)?;
    image.header(instance)?;
    if !instance.has_export("hash") {
        return Err(HostError::MissingExport("hash".to_string()));
    }

    let scratch = GuestAllocation::new(instance, DIGEST_SIZE)?;
    let status: HostResult<i32> = match instance.generation() {
        AbiGeneration::Context => ctx.handle_for(instance).and_then(|handle| {
            instance.call("hash", (handle, image.address(), scratch.address()))
        }),
        _ => instance.call("hash", (image.address(), scratch.address())),
    };

    let digest = match status {
        Ok(status) if status < 0 => Err(guest_failure(instance, ctx, "hash", status)),
        Ok(_) => scratch.read(instance).map(|bytes| {
            bytes
                .iter()
                .map(|byte| format!("{:02x}", byte))
                .collect::<String>()
        }),
        Err(error) => Err(error),
    };

    match (digest, scratch.free(instance)) {
        (Ok(digest), Ok(())) => Ok(digest),
        (Ok(_), Err(error)) => Err(error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(cleanup)) => {
            log_cleanup_failure(instance, "hash scratch", &cleanup);
            Err(error)
        }
    }
}
