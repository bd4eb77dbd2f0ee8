// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::time::Instant;

use crate::config::Topology;
use crate::observability::messages::pipeline::{
    BufferHandedOff, PipelineCompleted, PipelineStarted, StageCompleted,
};
use crate::observability::messages::StructuredLog;
use crate::pipeline::{close_context, stage_failed, TransformOutput, TransformRequest};
use crate::runtime::{
    marshal, AbiGeneration, GuestBuffer, GuestContext, GuestInstance, GuestModule, HostError,
    HostResult,
};
use crate::traits::ImagePipeline;

/// A stage result copied out of the instance that produced it.
struct Materialized {
    bytes: Vec<u8>,
    dimensions: (u32, u32),
}

/// Runs each stage in its own guest instance.
///
/// Stage guests only share data through host-owned copies: a result is read out of its
/// producer, released there, and written into the consumer's memory. Only VecParts
/// guests can exchange raw pixels this way.
#[derive(Clone)]
pub struct MultiInstancePipeline {
    decoder: GuestModule,
    resizer: GuestModule,
    encoder: GuestModule,
}

impl MultiInstancePipeline {
    pub fn new(decoder: GuestModule, resizer: GuestModule, encoder: GuestModule) -> HostResult<Self> {
        for module in [&decoder, &resizer, &encoder] {
            if module.generation() != AbiGeneration::VecParts {
                return Err(HostError::UnsupportedAbi(format!(
                    "module '{}' uses the {} ABI, multi-instance pipelines need {} guests",
                    module.name(),
                    module.generation(),
                    AbiGeneration::VecParts
                )));
            }
        }
        Ok(Self {
            decoder,
            resizer,
            encoder,
        })
    }

    pub fn run(&self, request: &TransformRequest) -> HostResult<TransformOutput> {
        request.validate()?;
        if request.compute_hash {
            return Err(HostError::ValidationError(
                "content hashing is not available in multi-instance pipelines".to_string(),
            ));
        }

        let started = PipelineStarted {
            topology: Topology::Multi.as_str(),
            source_format: request.source_format.as_str(),
            output_format: request.output_format.as_str(),
            input_bytes: request.input.len(),
        };
        let span = started.span("multi_instance_pipeline");
        let _guard = span.enter();
        started.log();
        let clock = Instant::now();

        let decoded = run_stage(&self.decoder, "decode", |instance, ctx| {
            marshal::decode(instance, ctx, &request.input, request.source_format)
        })?;

        let raster = match request.resize {
            Some(spec) => {
                hand_off("decode", "resize", &decoded);
                run_stage(&self.resizer, "resize", |instance, ctx| {
                    marshal::resize_bytes(
                        instance,
                        ctx,
                        &decoded.bytes,
                        decoded.dimensions,
                        (spec.width, spec.height),
                        spec.maintain_aspect,
                    )
                })?
            }
            None => decoded,
        };

        hand_off(
            if request.resize.is_some() { "resize" } else { "decode" },
            "encode",
            &raster,
        );
        let encoded = run_stage(&self.encoder, "encode", |instance, ctx| {
            marshal::encode_bytes(
                instance,
                ctx,
                &raster.bytes,
                raster.dimensions,
                request.output_format,
            )
        })?;

        let (width, height) = encoded.dimensions;
        PipelineCompleted {
            output_format: request.output_format.as_str(),
            width,
            height,
            output_bytes: encoded.bytes.len(),
            duration_ms: clock.elapsed().as_millis(),
        }
        .log();

        Ok(TransformOutput {
            bytes: encoded.bytes,
            width,
            height,
            format: request.output_format,
            hash: None,
        })
    }
}

/// Instantiates `module`, runs `op` under a fresh context and copies the result out.
///
/// The instance is dropped before returning; nothing it allocated outlives the stage.
fn run_stage<F>(module: &GuestModule, stage: &'static str, op: F) -> HostResult<Materialized>
where
    F: FnOnce(&mut GuestInstance, &GuestContext) -> HostResult<GuestBuffer>,
{
    let clock = Instant::now();
    let mut instance = module.instantiate().map_err(|e| stage_failed(stage, e))?;
    let ctx = GuestContext::create(&mut instance).map_err(|e| stage_failed(stage, e))?;

    let result = op(&mut instance, &ctx).and_then(|buffer| materialize(&mut instance, buffer));
    let materialized =
        close_context(&mut instance, ctx, result).map_err(|e| stage_failed(stage, e))?;

    StageCompleted {
        stage,
        width: materialized.dimensions.0,
        height: materialized.dimensions.1,
        duration_ms: clock.elapsed().as_millis(),
    }
    .log();

    Ok(materialized)
}

fn materialize(instance: &mut GuestInstance, buffer: GuestBuffer) -> HostResult<Materialized> {
    let result = buffer.to_vec(instance).and_then(|bytes| {
        Ok(Materialized {
            bytes,
            dimensions: buffer.dimensions(instance)?,
        })
    });
    buffer.release_after(instance, result)
}

fn hand_off(from_stage: &str, to_stage: &str, materialized: &Materialized) {
    BufferHandedOff {
        from_stage,
        to_stage,
        bytes: materialized.bytes.len(),
    }
    .log();
}

#[async_trait]
impl ImagePipeline for MultiInstancePipeline {
    async fn transform(&self, request: TransformRequest) -> HostResult<TransformOutput> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.run(&request)).await?
    }

    fn topology(&self) -> Topology {
        Topology::Multi
    }
}
