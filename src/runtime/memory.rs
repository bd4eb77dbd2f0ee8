// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounds-checked accessors over a guest linear memory slice.
//!
//! Guest pointers are untrusted `u32` offsets. Every read or write the host performs
//! goes through these helpers so a bad pointer becomes `OutOfBounds` instead of a panic.

use crate::runtime::error::{HostError, HostResult};
use std::ops::Range;

fn range(memory_len: usize, offset: u32, len: u32) -> HostResult<Range<usize>> {
    let start = offset as usize;
    let end = start.checked_add(len as usize).filter(|end| *end <= memory_len);
    match end {
        Some(end) => Ok(start..end),
        None => Err(HostError::OutOfBounds(format!(
            "span [{}, +{}) exceeds memory of {} bytes",
            offset, len, memory_len
        ))),
    }
}

pub(crate) fn span(memory: &[u8], offset: u32, len: u32) -> HostResult<&[u8]> {
    let range = range(memory.len(), offset, len)?;
    Ok(&memory[range])
}

pub(crate) fn span_mut(memory: &mut [u8], offset: u32, len: u32) -> HostResult<&mut [u8]> {
    let range = range(memory.len(), offset, len)?;
    Ok(&mut memory[range])
}

fn word(memory: &[u8], offset: u32) -> HostResult<[u8; 4]> {
    let bytes = span(memory, offset, 4)?;
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub(crate) fn read_u32_le(memory: &[u8], offset: u32) -> HostResult<u32> {
    word(memory, offset).map(u32::from_le_bytes)
}

/// Network byte order, used by the dimension prefix of VecParts decode payloads.
pub(crate) fn read_u32_be(memory: &[u8], offset: u32) -> HostResult<u32> {
    word(memory, offset).map(u32::from_be_bytes)
}

pub(crate) fn write_u32_le(memory: &mut [u8], offset: u32, value: u32) -> HostResult<()> {
    span_mut(memory, offset, 4)?.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Copies the bytes of a NUL-terminated string starting at `offset`, without the NUL.
pub(crate) fn read_c_string(memory: &[u8], offset: u32) -> HostResult<Vec<u8>> {
    let start = offset as usize;
    let tail = memory.get(start..).ok_or_else(|| {
        HostError::OutOfBounds(format!(
            "string at {} starts past memory end {}",
            offset,
            memory.len()
        ))
    })?;
    match tail.iter().position(|byte| *byte == 0) {
        Some(len) => Ok(tail[..len].to_vec()),
        None => Err(HostError::OutOfBounds(format!(
            "string at {} is not NUL-terminated",
            offset
        ))),
    }
}
