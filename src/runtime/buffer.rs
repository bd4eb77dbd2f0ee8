// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Move-only handles for memory that lives inside a guest instance.
//!
//! * [`GuestBuffer`] - a result record produced by a guest operation
//! * [`GuestAllocation`] - a host-requested span from the guest allocator
//! * [`GuestContext`] - a guest codec context (Context generation only)
//!
//! Each handle remembers the [`InstanceId`] that produced it and refuses to be used with
//! any other instance. Releasing consumes the handle, so a double free does not compile.

use crate::observability::messages::runtime::CleanupFailed;
use crate::observability::messages::StructuredLog;
use crate::runtime::detector::AbiGeneration;
use crate::runtime::error::{HostError, HostResult};
use crate::runtime::instance::{GuestInstance, InstanceId};
use crate::runtime::memory::{read_u32_be, read_u32_le, span, span_mut};

/// Size of a `(ptr, len, cap)` record.
pub const VEC_PARTS_RECORD_SIZE: u32 = 12;
/// Size of a `(ptr, len, cap, format, width, height)` record.
pub const IMAGE_RECORD_SIZE: u32 = 24;
/// Big-endian width and height in front of VecParts decode payloads.
pub const DIMENSION_PREFIX: u32 = 8;

pub(crate) fn check_owner(owner: InstanceId, instance: &GuestInstance) -> HostResult<()> {
    if owner == instance.id() {
        Ok(())
    } else {
        Err(HostError::ForeignBuffer {
            owner: owner.as_u64(),
            used_with: instance.id().as_u64(),
        })
    }
}

pub(crate) fn log_cleanup_failure(instance: &GuestInstance, what: &str, error: &HostError) {
    CleanupFailed {
        instance_id: instance.id().as_u64(),
        what,
        error,
    }
    .log();
}

/// Decoded contents of a result record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferHeader {
    pub offset: u32,
    pub length: u32,
    pub capacity: u32,
    /// Format tag, image-record generations only.
    pub format: Option<u8>,
    /// Record width and height, image-record generations only.
    pub dimensions: Option<(u32, u32)>,
}

impl BufferHeader {
    fn read(memory: &[u8], address: u32, generation: AbiGeneration) -> HostResult<Self> {
        let size = if generation.uses_image_records() {
            IMAGE_RECORD_SIZE
        } else {
            VEC_PARTS_RECORD_SIZE
        };
        let record = span(memory, address, size)?;

        let offset = read_u32_le(record, 0)?;
        let length = read_u32_le(record, 4)?;
        let capacity = read_u32_le(record, 8)?;

        if generation.uses_image_records() {
            Ok(Self {
                offset,
                length,
                capacity,
                format: Some(record[12]),
                dimensions: Some((read_u32_le(record, 16)?, read_u32_le(record, 20)?)),
            })
        } else {
            Ok(Self {
                offset,
                length,
                capacity,
                format: None,
                dimensions: None,
            })
        }
    }
}

/// A result record owned by one guest instance.
///
/// The payload is `[offset + prefix, offset + length)` in the owner's memory.
#[must_use = "guest buffers leak unless released through their owning instance"]
#[derive(Debug)]
pub struct GuestBuffer {
    owner: InstanceId,
    address: u32,
    prefix: u32,
    known_dimensions: Option<(u32, u32)>,
}

impl GuestBuffer {
    pub(crate) fn new(instance: &GuestInstance, address: u32) -> Self {
        Self {
            owner: instance.id(),
            address,
            prefix: 0,
            known_dimensions: None,
        }
    }

    /// A VecParts decode result carrying the big-endian dimension prefix.
    pub(crate) fn with_dimension_prefix(instance: &GuestInstance, address: u32) -> Self {
        Self {
            prefix: DIMENSION_PREFIX,
            ..Self::new(instance, address)
        }
    }

    /// A VecParts result whose dimensions the host already knows.
    pub(crate) fn with_known_dimensions(
        instance: &GuestInstance,
        address: u32,
        dimensions: (u32, u32),
    ) -> Self {
        Self {
            known_dimensions: Some(dimensions),
            ..Self::new(instance, address)
        }
    }

    pub fn owner(&self) -> InstanceId {
        self.owner
    }

    /// Address of the record inside the owner's memory.
    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn prefix(&self) -> u32 {
        self.prefix
    }

    pub fn header(&self, instance: &GuestInstance) -> HostResult<BufferHeader> {
        check_owner(self.owner, instance)?;
        BufferHeader::read(instance.memory(), self.address, instance.generation())
    }

    /// Offset and length of the payload, past any dimension prefix.
    ///
    /// The span is checked against the owner's memory, so it can be handed straight
    /// back to the guest.
    pub(crate) fn payload_span(&self, instance: &GuestInstance) -> HostResult<(u32, u32)> {
        let header = self.header(instance)?;
        let length = header.length.checked_sub(self.prefix).ok_or_else(|| {
            HostError::OutOfBounds(format!(
                "payload of {} bytes is shorter than its {} byte prefix",
                header.length, self.prefix
            ))
        })?;
        let offset = header.offset.checked_add(self.prefix).ok_or_else(|| {
            HostError::OutOfBounds(format!("payload offset {} overflows", header.offset))
        })?;
        span(instance.memory(), offset, length)?;
        Ok((offset, length))
    }

    /// Zero-copy view of the payload. Valid until the next call into `instance`.
    pub fn view<'a>(&self, instance: &'a GuestInstance) -> HostResult<&'a [u8]> {
        let (offset, length) = self.payload_span(instance)?;
        span(instance.memory(), offset, length)
    }

    pub fn to_vec(&self, instance: &GuestInstance) -> HostResult<Vec<u8>> {
        self.view(instance).map(<[u8]>::to_vec)
    }

    /// Width and height of the image this buffer holds.
    pub fn dimensions(&self, instance: &GuestInstance) -> HostResult<(u32, u32)> {
        let header = self.header(instance)?;
        if let Some(dimensions) = header.dimensions {
            return Ok(dimensions);
        }
        if self.prefix >= DIMENSION_PREFIX {
            let memory = instance.memory();
            return Ok((
                read_u32_be(memory, header.offset)?,
                read_u32_be(memory, header.offset.saturating_add(4))?,
            ));
        }
        self.known_dimensions.ok_or_else(|| {
            HostError::ValidationError(format!(
                "buffer at {} does not carry image dimensions",
                self.address
            ))
        })
    }

    /// Hands the record back to the guest through its reclaim export.
    pub fn release(self, instance: &mut GuestInstance) -> HostResult<()> {
        check_owner(self.owner, instance)?;
        let generation = instance.generation();
        let export = instance
            .find_export(generation.reclaim_exports())
            .ok_or_else(|| {
                HostError::MissingExport(generation.reclaim_exports().join(" or "))
            })?;
        instance.call::<u32, ()>(export, self.address)
    }

    /// Releases the buffer and passes `result` through.
    ///
    /// If both the result and the release fail, the original error wins and the release
    /// failure is logged.
    pub(crate) fn release_after<T>(
        self,
        instance: &mut GuestInstance,
        result: HostResult<T>,
    ) -> HostResult<T> {
        let released = self.release(instance);
        match (result, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(error)) => Err(error),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(cleanup)) => {
                log_cleanup_failure(instance, "result buffer", &cleanup);
                Err(error)
            }
        }
    }
}

/// A span obtained from the guest's `alloc` export.
#[must_use = "guest allocations leak unless freed through their owning instance"]
#[derive(Debug)]
pub struct GuestAllocation {
    owner: InstanceId,
    address: u32,
    length: u32,
}

impl GuestAllocation {
    pub(crate) fn new(instance: &mut GuestInstance, length: u32) -> HostResult<Self> {
        if length == 0 {
            return Err(HostError::ValidationError(
                "refusing to allocate an empty guest span".to_string(),
            ));
        }
        let address = instance.alloc(length)?;
        Ok(Self {
            owner: instance.id(),
            address,
            length,
        })
    }

    /// Allocates a span of `bytes.len()` and copies `bytes` into it.
    pub(crate) fn copy_from(instance: &mut GuestInstance, bytes: &[u8]) -> HostResult<Self> {
        let length = u32::try_from(bytes.len()).map_err(|_| {
            HostError::ValidationError(format!(
                "{} bytes do not fit a 32-bit guest memory",
                bytes.len()
            ))
        })?;
        let allocation = Self::new(instance, length)?;
        match span_mut(instance.memory_mut(), allocation.address, length) {
            Ok(target) => {
                target.copy_from_slice(bytes);
                Ok(allocation)
            }
            Err(error) => {
                if let Err(cleanup) = allocation.free(instance) {
                    log_cleanup_failure(instance, "input allocation", &cleanup);
                }
                Err(error)
            }
        }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub(crate) fn read<'a>(&self, instance: &'a GuestInstance) -> HostResult<&'a [u8]> {
        check_owner(self.owner, instance)?;
        span(instance.memory(), self.address, self.length)
    }

    /// `dealloc(address, length)` with the values the span was allocated with.
    pub fn free(self, instance: &mut GuestInstance) -> HostResult<()> {
        check_owner(self.owner, instance)?;
        instance.dealloc(self.address, self.length)
    }
}

/// Guest codec context. Owns the per-context last-error slot.
///
/// Generations without contexts get a handle-less value so pipeline code is uniform.
#[must_use = "guest contexts leak unless destroyed through their owning instance"]
#[derive(Debug)]
pub struct GuestContext {
    owner: InstanceId,
    handle: Option<u32>,
}

impl GuestContext {
    pub fn create(instance: &mut GuestInstance) -> HostResult<Self> {
        let handle = if instance.generation().has_context() {
            let handle: u32 = instance.call("context_new", ())?;
            if handle == 0 {
                return Err(HostError::GuestOperationFailed {
                    operation: "context_new",
                    message: "guest returned a null context".to_string(),
                });
            }
            Some(handle)
        } else {
            None
        };
        Ok(Self {
            owner: instance.id(),
            handle,
        })
    }

    pub fn handle(&self) -> Option<u32> {
        self.handle
    }

    /// The context handle, checked against `instance`.
    pub(crate) fn handle_for(&self, instance: &GuestInstance) -> HostResult<u32> {
        check_owner(self.owner, instance)?;
        self.handle.ok_or_else(|| {
            HostError::ValidationError(format!(
                "{} guests require a context handle",
                instance.generation()
            ))
        })
    }

    pub(crate) fn check_owner(&self, instance: &GuestInstance) -> HostResult<()> {
        check_owner(self.owner, instance)
    }

    pub fn destroy(self, instance: &mut GuestInstance) -> HostResult<()> {
        check_owner(self.owner, instance)?;
        let Some(handle) = self.handle else {
            return Ok(());
        };
        let generation = instance.generation();
        let export = instance
            .find_export(generation.context_free_exports())
            .ok_or_else(|| {
                HostError::MissingExport(generation.context_free_exports().join(" or "))
            })?;
        instance.call::<u32, ()>(export, handle)
    }
}
