// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::time::Instant;

use crate::config::Topology;
use crate::observability::messages::pipeline::{
    PipelineCompleted, PipelineStarted, StageCompleted,
};
use crate::observability::messages::StructuredLog;
use crate::pipeline::{
    close_context, stage_failed, ResizeSpec, TransformOutput, TransformRequest,
};
use crate::runtime::{marshal, GuestBuffer, GuestContext, GuestInstance, GuestModule, HostResult};
use crate::traits::ImagePipeline;

/// Runs every stage inside one guest instance.
///
/// Each run instantiates the module afresh and creates a single context, so intermediate
/// images never leave guest memory and runs never observe each other's state.
#[derive(Clone)]
pub struct SingleInstancePipeline {
    module: GuestModule,
}

impl SingleInstancePipeline {
    pub fn new(module: GuestModule) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &GuestModule {
        &self.module
    }

    /// Runs the request to completion on the calling thread.
    pub fn run(&self, request: &TransformRequest) -> HostResult<TransformOutput> {
        request.validate()?;

        let started = PipelineStarted {
            topology: Topology::Single.as_str(),
            source_format: request.source_format.as_str(),
            output_format: request.output_format.as_str(),
            input_bytes: request.input.len(),
        };
        let span = started.span(self.module.name());
        let _guard = span.enter();
        started.log();
        let clock = Instant::now();

        let mut instance = self
            .module
            .instantiate()
            .map_err(|e| stage_failed("instantiate", e))?;
        let ctx = GuestContext::create(&mut instance).map_err(|e| stage_failed("context", e))?;

        let result = Self::decode_stage(&mut instance, &ctx, request);
        let output = close_context(&mut instance, ctx, result)?;

        PipelineCompleted {
            output_format: output.format.as_str(),
            width: output.width,
            height: output.height,
            output_bytes: output.bytes.len(),
            duration_ms: clock.elapsed().as_millis(),
        }
        .log();

        Ok(output)
    }

    fn decode_stage(
        instance: &mut GuestInstance,
        ctx: &GuestContext,
        request: &TransformRequest,
    ) -> HostResult<TransformOutput> {
        let clock = Instant::now();
        let decoded = marshal::decode(instance, ctx, &request.input, request.source_format)
            .map_err(|e| stage_failed("decode", e))?;

        let result = decoded.dimensions(instance).and_then(|(width, height)| {
            StageCompleted {
                stage: "decode",
                width,
                height,
                duration_ms: clock.elapsed().as_millis(),
            }
            .log();

            match request.resize {
                Some(spec) => Self::resize_stage(instance, ctx, &decoded, spec, request),
                None => Self::encode_stage(instance, ctx, &decoded, request),
            }
        });
        decoded.release_after(instance, result)
    }

    fn resize_stage(
        instance: &mut GuestInstance,
        ctx: &GuestContext,
        image: &GuestBuffer,
        spec: ResizeSpec,
        request: &TransformRequest,
    ) -> HostResult<TransformOutput> {
        let clock = Instant::now();
        let resized = marshal::resize(
            instance,
            ctx,
            image,
            spec.width,
            spec.height,
            spec.maintain_aspect,
        )
        .map_err(|e| stage_failed("resize", e))?;

        let result = resized.dimensions(instance).and_then(|(width, height)| {
            StageCompleted {
                stage: "resize",
                width,
                height,
                duration_ms: clock.elapsed().as_millis(),
            }
            .log();
            Self::encode_stage(instance, ctx, &resized, request)
        });
        resized.release_after(instance, result)
    }

    fn encode_stage(
        instance: &mut GuestInstance,
        ctx: &GuestContext,
        image: &GuestBuffer,
        request: &TransformRequest,
    ) -> HostResult<TransformOutput> {
        let clock = Instant::now();
        let (width, height) = image.dimensions(instance)?;

        let hash = if request.compute_hash {
            Some(marshal::hash(instance, ctx, image).map_err(|e| stage_failed("hash", e))?)
        } else {
            None
        };

        let encoded = marshal::encode(instance, ctx, image, request.output_format)
            .map_err(|e| stage_failed("encode", e))?;
        let result = encoded.to_vec(instance).map(|bytes| {
            StageCompleted {
                stage: "encode",
                width,
                height,
                duration_ms: clock.elapsed().as_millis(),
            }
            .log();

            TransformOutput {
                bytes,
                width,
                height,
                format: request.output_format,
                hash,
            }
        });
        encoded.release_after(instance, result)
    }
}

#[async_trait]
impl ImagePipeline for SingleInstancePipeline {
    async fn transform(&self, request: TransformRequest) -> HostResult<TransformOutput> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.run(&request)).await?
    }

    fn topology(&self) -> Topology {
        Topology::Single
    }
}
