// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::config::Topology;
use crate::pipeline::{TransformOutput, TransformRequest};
use crate::runtime::HostResult;

/// An image transformation pipeline backed by guest codec modules.
///
/// Each call runs against freshly instantiated guests on a blocking worker, so
/// concurrent calls never share a guest memory.
#[async_trait]
pub trait ImagePipeline: Send + Sync {
    async fn transform(&self, request: TransformRequest) -> HostResult<TransformOutput>;

    fn topology(&self) -> Topology;
}
