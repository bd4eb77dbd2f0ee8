// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default fuel per guest call (10 billion instructions). AVIF encoding is expensive.
pub const DEFAULT_FUEL_LEVEL: u64 = 10_000_000_000;
/// Minimum allowed fuel per guest call (1 million instructions)
pub const MIN_FUEL_LEVEL: u64 = 1_000_000;
/// Maximum allowed fuel per guest call (100 billion instructions) - security limit
pub const MAX_FUEL_LEVEL: u64 = 100_000_000_000;
/// Largest guest binary accepted by the loader (32 MB)
pub const DEFAULT_MAX_MODULE_SIZE: usize = 32 * 1024 * 1024;
/// Largest input image accepted by the marshaling layer (64 MB)
pub const DEFAULT_MAX_INPUT_SIZE: usize = 64 * 1024 * 1024;
