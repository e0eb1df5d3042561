//! Stand-in host pipeline and sync harness.

use std::sync::Arc;

use bytes::BytesMut;
use rstest::fixture;
use shimframe::{
    ChannelHandler,
    ChannelPipeline,
    MainQueue,
    MainQueueReceiver,
    SyncChannel,
    SyncTaskRegistry,
    pipeline::{HandlerNames, HandlerRole, HostHandlerNames, LengthPrepender, LengthSplitter},
    wire,
};

/// Name of the host packet decoder in [`host_pipeline`].
pub const DECODER_NAME: &str = "inbound_config";

/// Name of the host packet encoder in [`host_pipeline`].
pub const ENCODER_NAME: &str = "encoder";

/// Channel used by [`sync_harness`].
pub const TEST_CHANNEL: &str = "00000000-0000-4000-8000-000000000000:00000000-0000-4000-8000-000000000001";

/// Handler that forwards every message unchanged.
///
/// Stands in for host codecs whose work is out of scope for a test.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThrough;

impl ChannelHandler for PassThrough {}

/// Host pipeline before translation is attached: length framing around
/// pass-through packet codecs.
///
/// # Panics
///
/// Panics if the stock host names collide, which would be a bug here.
#[must_use]
pub fn host_pipeline() -> ChannelPipeline {
    let names = HostHandlerNames;
    let mut pipeline = ChannelPipeline::new();
    pipeline
        .add_last(
            names.name(HandlerRole::LengthSplitter),
            Box::new(LengthSplitter::default()),
        )
        .expect("splitter");
    pipeline
        .add_last(names.name(HandlerRole::PacketDecoder), Box::new(PassThrough))
        .expect("decoder");
    pipeline
        .add_last(
            names.name(HandlerRole::LengthPrepender),
            Box::new(LengthPrepender),
        )
        .expect("prepender");
    pipeline
        .add_last(names.name(HandlerRole::PacketEncoder), Box::new(PassThrough))
        .expect("encoder");
    pipeline
}

/// Build a packet of `id` followed by `body`.
#[must_use]
pub fn custom_payload(id: i32, body: &[u8]) -> BytesMut {
    let mut packet = BytesMut::with_capacity(body.len() + wire::MAX_VARINT_LEN);
    wire::write_varint(id, &mut packet);
    packet.extend_from_slice(body);
    packet
}

/// Registry on a fixed channel plus the main loop that runs its tasks.
#[derive(Debug)]
pub struct SyncHarness {
    /// Registry under test.
    pub registry: Arc<SyncTaskRegistry>,
    /// Receiver standing in for the main loop.
    pub main: MainQueueReceiver,
}

/// Fixture building a [`SyncHarness`] on [`TEST_CHANNEL`].
#[fixture]
pub fn sync_harness() -> SyncHarness {
    let (queue, main) = MainQueue::new();
    SyncHarness {
        registry: Arc::new(SyncTaskRegistry::with_channel(
            SyncChannel::from_static(TEST_CHANNEL),
            Arc::new(queue),
        )),
        main,
    }
}
