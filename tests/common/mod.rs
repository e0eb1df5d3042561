//! Shared utilities for integration tests.
//!
//! Provides a deterministic proptest runner, an attached adaptation pipeline
//! built over the stand-in host pipeline, and frame builders.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::sync::Arc;

use bytes::BytesMut;
use proptest::test_runner::{Config as ProptestConfig, RngAlgorithm, TestRng, TestRunner};
use shimframe::{
    AdaptationPipeline,
    ProtocolVersion,
    Settings,
    SyncStage,
    SyncTaskRegistry,
    pipeline::{Compressor, HostHandlerNames, LengthPrepender, TranslationChain},
};
use shimframe_testing::host_pipeline;
use tokio_util::codec::Encoder;

/// Proptest runner seeded identically on every run.
pub fn deterministic_runner(cases: u32) -> TestRunner {
    let config = ProptestConfig {
        cases,
        ..ProptestConfig::default()
    };
    let rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    TestRunner::new_with_rng(config, rng)
}

/// Adaptation pipeline attached to the stand-in host with `registry` at the
/// client end of the translation chain.
pub fn attached_pipeline(
    registry: &Arc<SyncTaskRegistry>,
    version: ProtocolVersion,
) -> AdaptationPipeline {
    let mut pipeline = AdaptationPipeline::new(
        Arc::new(HostHandlerNames),
        Arc::new(SyncStage::new(Arc::clone(registry))),
    );
    pipeline
        .attach(host_pipeline(), version, TranslationChain::new())
        .expect("attach to host pipeline");
    pipeline
}

/// Adaptation pipeline attached to the stand-in host and configured from
/// `settings`.
pub fn configured_pipeline(
    registry: &Arc<SyncTaskRegistry>,
    version: ProtocolVersion,
    settings: &Settings,
) -> AdaptationPipeline {
    let mut pipeline = AdaptationPipeline::new(
        Arc::new(HostHandlerNames),
        Arc::new(SyncStage::from_settings(Arc::clone(registry), settings)),
    )
    .with_settings(settings);
    pipeline
        .attach(host_pipeline(), version, TranslationChain::new())
        .expect("attach to host pipeline");
    pipeline
}

/// Length-prefix `packet` as the server would send it without compression.
pub fn frame(packet: &[u8]) -> BytesMut {
    let mut out = BytesMut::new();
    LengthPrepender
        .encode(BytesMut::from(packet), &mut out)
        .expect("frame packet");
    out
}

/// Compress then length-prefix `packet` for a connection with `threshold`.
pub fn compressed_frame(packet: &[u8], threshold: usize) -> BytesMut {
    compressed_frame_at(packet, threshold, 6)
}

/// As [`compressed_frame`], with an explicit zlib `level`.
pub fn compressed_frame_at(packet: &[u8], threshold: usize, level: u32) -> BytesMut {
    let body = Compressor::new(threshold, level)
        .compress(packet)
        .expect("compress packet");
    frame(&body)
}
