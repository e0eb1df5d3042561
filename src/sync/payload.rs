//! Wire form of the out-of-band sync message.
//!
//! A sync message travels inside a custom payload packet. Its body is the
//! channel identifier, then the correlation token, then raw bytes with no
//! further structure:
//!
//! ```text
//! string channel | string token | bytes body ...
//! ```
//!
//! The message only ever flows towards the local client. [`SyncPayload`] can
//! be decoded but refuses to encode.

use std::{fmt, io};

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use uuid::Uuid;

use super::SyncError;
use crate::wire::{self, MAX_STRING_LEN};

/// Private channel namespace for sync messages.
///
/// Generated once per process from two random UUIDs and stable for the
/// lifetime of the registry that owns it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SyncChannel(String);

impl SyncChannel {
    /// Generate a fresh random channel identifier.
    #[must_use]
    pub fn random() -> Self { Self(format!("{}:{}", Uuid::new_v4(), Uuid::new_v4())) }

    /// Use a fixed identifier. Intended for tests and diagnostics.
    #[must_use]
    pub fn from_static(id: &str) -> Self { Self(id.to_owned()) }

    /// The identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SyncChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Builder for the inbound wire form of a sync message.
///
/// Used by the peer side (the translation layer) to inject a message into the
/// client's inbound stream.
#[derive(Debug)]
pub struct SyncMessage;

impl SyncMessage {
    /// Encode the custom payload body carrying `token` and `body`.
    #[must_use]
    pub fn encode(channel: &SyncChannel, token: &str, body: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(
            channel.as_str().len() + token.len() + body.len() + 2 * wire::MAX_VARINT_LEN,
        );
        wire::write_string(channel.as_str(), &mut buf);
        wire::write_string(token, &mut buf);
        buf.extend_from_slice(body);
        buf.freeze()
    }
}

/// Decoded sync message: the token followed by the opaque body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncPayload {
    data: Bytes,
}

impl SyncPayload {
    /// Decode a custom payload body.
    ///
    /// Returns `Ok(None)` when the body belongs to another channel. Nothing
    /// after the channel identifier is inspected in that case.
    ///
    /// # Errors
    ///
    /// Fails when the channel identifier itself is malformed.
    pub fn decode(channel: &SyncChannel, mut body: Bytes) -> Result<Option<Self>, SyncError> {
        let id = wire::read_string(&mut body, MAX_STRING_LEN)?;
        if id != channel.as_str() {
            return Ok(None);
        }
        Ok(Some(Self {
            data: Bytes::copy_from_slice(&body),
        }))
    }

    /// Split into the correlation token and the remaining body.
    ///
    /// # Errors
    ///
    /// Fails when the token is missing or malformed.
    pub fn into_parts(mut self) -> Result<(String, Bytes), SyncError> {
        let token = wire::read_string(&mut self.data, MAX_STRING_LEN)?;
        Ok((token, self.data))
    }

    /// Sync messages are never sent outbound.
    ///
    /// # Errors
    ///
    /// Always returns [`SyncError::ReadOnlyPayload`].
    pub fn encode(&self, _dst: &mut BytesMut) -> Result<(), SyncError> {
        Err(SyncError::ReadOnlyPayload)
    }
}

/// `tokio_util` codec for whole custom payload bodies on a sync channel.
///
/// Each call to `decode` consumes the entire buffer as one body. Bodies for
/// other channels are consumed and yield nothing.
#[derive(Clone, Debug)]
pub struct SyncPayloadCodec {
    channel: SyncChannel,
}

impl SyncPayloadCodec {
    /// Create a codec bound to `channel`.
    #[must_use]
    pub fn new(channel: SyncChannel) -> Self { Self { channel } }
}

impl Decoder for SyncPayloadCodec {
    type Item = SyncPayload;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.has_remaining() {
            return Ok(None);
        }
        let body = src.split().freeze();
        SyncPayload::decode(&self.channel, body).map_err(io::Error::from)
    }
}

impl Encoder<SyncPayload> for SyncPayloadCodec {
    type Error = io::Error;

    fn encode(&mut self, item: SyncPayload, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst).map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_channels_differ() {
        let first = SyncChannel::random();
        let second = SyncChannel::random();
        assert_ne!(first, second);
        assert_eq!(first.as_str().matches(':').count(), 1);
    }

    #[test]
    fn decode_splits_token_and_body() {
        let channel = SyncChannel::from_static("a:b");
        let wire = SyncMessage::encode(&channel, "token-1", b"\x00\x01rest");

        let payload = SyncPayload::decode(&channel, wire)
            .expect("decode")
            .expect("matching channel");
        let (token, body) = payload.into_parts().expect("token");
        assert_eq!(token, "token-1");
        assert_eq!(&body[..], b"\x00\x01rest");
    }

    #[test]
    fn foreign_channel_yields_nothing() {
        let wire = SyncMessage::encode(&SyncChannel::from_static("x:y"), "t", b"");
        let decoded = SyncPayload::decode(&SyncChannel::from_static("a:b"), wire).expect("decode");
        assert_eq!(decoded, None);
    }

    #[test]
    fn encoding_is_refused() {
        let channel = SyncChannel::from_static("a:b");
        let wire = SyncMessage::encode(&channel, "t", b"body");
        let mut codec = SyncPayloadCodec::new(channel);
        let mut src = BytesMut::from(&wire[..]);
        let payload = codec.decode(&mut src).expect("decode").expect("payload");
        assert!(src.is_empty());

        let err = codec
            .encode(payload, &mut BytesMut::new())
            .expect_err("sync payloads are read-only");
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
