// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Retrieval of guest-side error messages.
//!
//! Guests signal failure with a null result or a negative status and park a
//! NUL-terminated message in a last-error slot: one per context in the Context
//! generation, one per instance in the ImageRecord generation. Reading the slot takes
//! the message; the host copies it out and hands the guest string back before the
//! copy is decoded.

use crate::runtime::buffer::{log_cleanup_failure, GuestContext};
use crate::runtime::detector::AbiGeneration;
use crate::runtime::error::{HostError, HostResult};
use crate::runtime::instance::GuestInstance;
use crate::runtime::memory::read_c_string;

const LAST_ERROR_EXPORT: &str = "last_error_message";

/// Takes the pending guest error message, if the guest has one.
///
/// Returns `Ok(None)` for guests without an error accessor and for an empty slot.
pub fn take_last_error(
    instance: &mut GuestInstance,
    ctx: &GuestContext,
) -> HostResult<Option<String>> {
    if !instance.has_export(LAST_ERROR_EXPORT) {
        return Ok(None);
    }

    let address: u32 = match instance.generation() {
        AbiGeneration::Context => {
            let handle = ctx.handle_for(instance)?;
            instance.call(LAST_ERROR_EXPORT, handle)?
        }
        _ => instance.call(LAST_ERROR_EXPORT, ())?,
    };
    if address == 0 {
        return Ok(None);
    }

    let copied = read_c_string(instance.memory(), address);

    let generation = instance.generation();
    let freed = match instance.find_export(generation.message_free_exports()) {
        Some(export) => instance.call::<u32, ()>(export, address),
        None => Err(HostError::MissingExport(
            generation.message_free_exports().join(" or "),
        )),
    };

    let bytes = match (copied, freed) {
        (Ok(bytes), Ok(())) => bytes,
        (Err(error), Ok(())) => return Err(error),
        (Ok(_), Err(error)) => return Err(error),
        (Err(error), Err(cleanup)) => {
            log_cleanup_failure(instance, "error message", &cleanup);
            return Err(error);
        }
    };

    Ok(Some(String::from_utf8(bytes)?))
}

/// Builds the error for a failed guest operation.
///
/// The guest's own message is used when one is available; otherwise the message is
/// synthesized from `status`. A fatal error raised while reading the message, such as
/// the guest exiting or exhausting its fuel, is returned in place of the failure.
pub(crate) fn guest_failure(
    instance: &mut GuestInstance,
    ctx: &GuestContext,
    operation: &'static str,
    status: i32,
) -> HostError {
    let message = match take_last_error(instance, ctx) {
        Ok(Some(message)) if !message.is_empty() => message,
        Ok(_) => format!("guest returned status {}", status),
        Err(error) if error.is_fatal() => return error,
        Err(error) => {
            log_cleanup_failure(instance, "last error message", &error);
            format!("guest returned status {}", status)
        }
    };
    HostError::GuestOperationFailed { operation, message }
}
