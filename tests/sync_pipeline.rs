//! End-to-end sync replies through an attached adaptation pipeline.

mod common;

use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use common::{attached_pipeline, compressed_frame, frame};
use rstest::rstest;
use shimframe::{
    PipelineEvent,
    ProtocolVersion,
    sync::{DEFAULT_CUSTOM_PAYLOAD_ID, SyncMessage},
};
use shimframe_testing::{SyncHarness, custom_payload, sync_harness};

const THRESHOLD: usize = 64;

fn capture(harness: &SyncHarness) -> (String, Arc<Mutex<Vec<Bytes>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let token = harness
        .registry
        .schedule(move |body| sink.lock().expect("lock").push(body));
    (token, seen)
}

fn reply(harness: &SyncHarness, token: &str, body: &[u8]) -> BytesMut {
    custom_payload(
        DEFAULT_CUSTOM_PAYLOAD_ID,
        &SyncMessage::encode(harness.registry.channel(), token, body),
    )
}

#[rstest]
fn reply_is_consumed_and_runs_on_main_loop(mut sync_harness: SyncHarness) {
    let mut pipeline = attached_pipeline(&sync_harness.registry, ProtocolVersion::R1_8);
    let (token, seen) = capture(&sync_harness);

    let delivered = pipeline
        .fire_read(frame(&reply(&sync_harness, &token, b"pong")))
        .expect("read");

    assert!(delivered.is_empty(), "sync reply must not reach the host");
    assert!(seen.lock().expect("lock").is_empty());
    assert_eq!(sync_harness.main.run_pending(), 1);
    assert_eq!(*seen.lock().expect("lock"), vec![Bytes::from_static(b"pong")]);
    assert!(!sync_harness.registry.contains(&token));
}

#[rstest]
fn unrelated_packets_reach_the_host(sync_harness: SyncHarness) {
    let mut pipeline = attached_pipeline(&sync_harness.registry, ProtocolVersion::R1_8);
    let chat = custom_payload(0x0f, b"hello");
    let foreign = custom_payload(
        DEFAULT_CUSTOM_PAYLOAD_ID,
        &SyncMessage::encode(
            &shimframe::SyncChannel::from_static("minecraft:brand"),
            "x",
            b"",
        ),
    );

    let mut wire = frame(&chat);
    wire.extend_from_slice(&frame(&foreign));
    let delivered = pipeline.fire_read(wire).expect("read");

    assert_eq!(delivered, vec![chat, foreign]);
}

#[rstest]
fn replies_between_other_packets_are_filtered(mut sync_harness: SyncHarness) {
    let mut pipeline = attached_pipeline(&sync_harness.registry, ProtocolVersion::R1_8);
    let (token, seen) = capture(&sync_harness);
    let before = custom_payload(0x21, b"keepalive");
    let after = custom_payload(0x22, b"time");

    let mut wire = frame(&before);
    wire.extend_from_slice(&frame(&reply(&sync_harness, &token, b"mid")));
    wire.extend_from_slice(&frame(&after));
    let delivered = pipeline.fire_read(wire).expect("read");

    assert_eq!(delivered, vec![before, after]);
    sync_harness.main.run_pending();
    assert_eq!(seen.lock().expect("lock").len(), 1);
}

#[rstest]
fn compressed_replies_are_handled_after_reorder(mut sync_harness: SyncHarness) {
    let mut pipeline = attached_pipeline(&sync_harness.registry, ProtocolVersion::R1_8);
    pipeline.enable_compression(THRESHOLD).expect("compression");
    pipeline
        .user_event(&PipelineEvent::CompressionReorder)
        .expect("reorder");
    let (token, seen) = capture(&sync_harness);
    let body = vec![b'z'; THRESHOLD * 4];

    let delivered = pipeline
        .fire_read(compressed_frame(&reply(&sync_harness, &token, &body), THRESHOLD))
        .expect("read");

    assert!(delivered.is_empty());
    sync_harness.main.run_pending();
    assert_eq!(*seen.lock().expect("lock"), vec![Bytes::from(body)]);
}

#[rstest]
fn outbound_packets_are_compressed_then_framed(sync_harness: SyncHarness) {
    let mut pipeline = attached_pipeline(&sync_harness.registry, ProtocolVersion::R1_8);
    pipeline.enable_compression(THRESHOLD).expect("compression");
    pipeline
        .user_event(&PipelineEvent::CompressionReorder)
        .expect("reorder");
    let small = custom_payload(0x03, b"hi");
    let large = custom_payload(0x03, &[b'a'; THRESHOLD * 2]);

    let sent_small = pipeline.fire_write(small.clone()).expect("write");
    let sent_large = pipeline.fire_write(large.clone()).expect("write");

    assert_eq!(sent_small, vec![compressed_frame(&small, THRESHOLD)]);
    assert_eq!(sent_large, vec![compressed_frame(&large, THRESHOLD)]);
}

#[rstest]
fn unknown_tokens_are_dropped_silently(mut sync_harness: SyncHarness) {
    let mut pipeline = attached_pipeline(&sync_harness.registry, ProtocolVersion::R1_8);

    let delivered = pipeline
        .fire_read(frame(&reply(&sync_harness, "never-scheduled", b"")))
        .expect("read");

    assert!(delivered.is_empty());
    assert_eq!(sync_harness.main.run_pending(), 0);
}
