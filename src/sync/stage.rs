//! Translation stage that intercepts sync replies.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use super::SyncTaskRegistry;
use crate::{
    pipeline::{PipelineError, ProtocolStage},
    settings::Settings,
    wire::{self, MAX_STRING_LEN},
};

/// Packet id of the clientbound custom payload packet.
pub const DEFAULT_CUSTOM_PAYLOAD_ID: i32 = 0x19;

/// Client-end stage that consumes sync messages addressed to its registry.
///
/// Custom payloads on other channels, and every other packet, pass through
/// untouched.
#[derive(Debug)]
pub struct SyncStage {
    registry: Arc<SyncTaskRegistry>,
    custom_payload_id: i32,
}

impl SyncStage {
    /// Intercept replies for `registry` using the default packet id.
    #[must_use]
    pub fn new(registry: Arc<SyncTaskRegistry>) -> Self {
        Self::with_packet_id(registry, DEFAULT_CUSTOM_PAYLOAD_ID)
    }

    /// Intercept replies for `registry` carried by packet `custom_payload_id`.
    #[must_use]
    pub fn with_packet_id(registry: Arc<SyncTaskRegistry>, custom_payload_id: i32) -> Self {
        Self {
            registry,
            custom_payload_id,
        }
    }

    /// Intercept replies for `registry` on the packet id from `settings`.
    #[must_use]
    pub fn from_settings(registry: Arc<SyncTaskRegistry>, settings: &Settings) -> Self {
        Self::with_packet_id(registry, settings.custom_payload_id)
    }
}

impl ProtocolStage for SyncStage {
    fn name(&self) -> &str { "sync" }

    fn inbound(&self, packet: BytesMut) -> Result<Option<BytesMut>, PipelineError> {
        let mut cursor = &packet[..];
        match wire::read_varint(&mut cursor) {
            Ok(id) if id == self.custom_payload_id => {}
            _ => return Ok(Some(packet)),
        }
        let Ok(channel) = wire::read_string(&mut cursor, MAX_STRING_LEN) else {
            return Ok(Some(packet));
        };
        if channel != self.registry.channel().as_str() {
            return Ok(Some(packet));
        }
        let _matched = self
            .registry
            .handle_payload(&channel, Bytes::copy_from_slice(cursor))?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::BufMut;

    use super::*;
    use crate::{
        executor::{Job, MainContext},
        sync::{SyncChannel, SyncMessage},
    };

    fn packet(id: i32, body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        wire::write_varint(id, &mut buf);
        buf.put_slice(body);
        buf
    }

    fn registry() -> Arc<SyncTaskRegistry> {
        let main: Arc<dyn MainContext> = Arc::new(|job: Job| job());
        Arc::new(SyncTaskRegistry::with_channel(
            SyncChannel::from_static("a:b"),
            main,
        ))
    }

    #[test]
    fn matching_reply_is_consumed() {
        let registry = registry();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let token = registry.schedule(move |body| *sink.lock().expect("lock") = Some(body));
        let stage = SyncStage::new(Arc::clone(&registry));

        let body = SyncMessage::encode(registry.channel(), &token, b"pong");
        let out = stage
            .inbound(packet(DEFAULT_CUSTOM_PAYLOAD_ID, &body))
            .expect("inbound");

        assert_eq!(out, None);
        assert_eq!(
            seen.lock().expect("lock").as_deref(),
            Some(&b"pong"[..])
        );
    }

    #[test]
    fn other_channels_and_packets_pass_through() {
        let registry = registry();
        let stage = SyncStage::new(Arc::clone(&registry));
        let foreign = SyncMessage::encode(&SyncChannel::from_static("x:y"), "t", b"");

        let custom = packet(DEFAULT_CUSTOM_PAYLOAD_ID, &foreign);
        assert_eq!(stage.inbound(custom.clone()).expect("inbound"), Some(custom));

        let chat = packet(0x0f, b"hello");
        assert_eq!(stage.inbound(chat.clone()).expect("inbound"), Some(chat));
    }

    #[test]
    fn unknown_tokens_are_swallowed() {
        let registry = registry();
        let stage = SyncStage::new(Arc::clone(&registry));
        let body = SyncMessage::encode(registry.channel(), "stale", b"");

        let out = stage
            .inbound(packet(DEFAULT_CUSTOM_PAYLOAD_ID, &body))
            .expect("inbound");

        assert_eq!(out, None);
    }
}
