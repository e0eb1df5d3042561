//! Host framing and compression handlers.
//!
//! Frames on the wire are a `VarInt` length followed by the packet. Once
//! compression is enabled each frame body becomes a `VarInt` uncompressed
//! length, `0` meaning the rest is stored raw, followed by the zlib stream.

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};
use tokio_util::codec::{Decoder, Encoder};

use super::{ChannelHandler, ChannelPipeline, HandlerNames, HandlerRole, PipelineError};
use crate::wire::{self, MAX_VARINT_LEN};

/// Largest frame a three-byte length prefix can describe.
pub const MAX_FRAME_LENGTH: usize = 2_097_151;

/// Largest packet the decompressor will inflate.
pub const MAX_UNCOMPRESSED_LENGTH: usize = 8 * 1024 * 1024;

/// zlib level used when none is configured.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Inbound splitter that cuts the byte stream into length-prefixed frames.
///
/// Partial frames are buffered until the rest arrives.
#[derive(Debug)]
pub struct LengthSplitter {
    buffer: BytesMut,
    max_frame_length: usize,
}

impl LengthSplitter {
    /// Create a splitter accepting frames up to `max_frame_length` bytes.
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame_length,
        }
    }
}

impl Default for LengthSplitter {
    fn default() -> Self { Self::new(MAX_FRAME_LENGTH) }
}

impl Decoder for LengthSplitter {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some((len, header)) = wire::peek_varint(src).map_err(|e| invalid_data(e.to_string()))?
        else {
            return Ok(None);
        };
        let len = usize::try_from(len).map_err(|_| invalid_data("negative frame length"))?;
        if len > self.max_frame_length {
            return Err(invalid_data(format!(
                "frame length {len} exceeds maximum {}",
                self.max_frame_length
            )));
        }
        if src.len() < header + len {
            src.reserve(header + len - src.len());
            return Ok(None);
        }
        src.advance(header);
        Ok(Some(src.split_to(len)))
    }
}

impl ChannelHandler for LengthSplitter {
    fn read(&mut self, msg: BytesMut, out: &mut Vec<BytesMut>) -> Result<(), PipelineError> {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.unsplit(msg);
        let result = loop {
            match self.decode(&mut buffer) {
                Ok(Some(frame)) => out.push(frame),
                Ok(None) => break Ok(()),
                Err(error) => break Err(error.into()),
            }
        };
        self.buffer = buffer;
        result
    }
}

/// Outbound handler that prefixes each packet with its `VarInt` length.
#[derive(Clone, Copy, Debug, Default)]
pub struct LengthPrepender;

impl Encoder<BytesMut> for LengthPrepender {
    type Error = io::Error;

    fn encode(&mut self, item: BytesMut, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > MAX_FRAME_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "packet too large for frame",
            ));
        }
        let len = i32::try_from(item.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "packet too large"))?;
        dst.reserve(item.len() + wire::varint_len(len));
        wire::write_varint(len, dst);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

impl ChannelHandler for LengthPrepender {
    fn write(&mut self, msg: BytesMut, out: &mut Vec<BytesMut>) -> Result<(), PipelineError> {
        let mut dst = BytesMut::new();
        self.encode(msg, &mut dst)?;
        out.push(dst);
        Ok(())
    }
}

/// Inbound handler that inflates compressed frame bodies.
#[derive(Clone, Copy, Debug)]
pub struct Decompressor {
    threshold: usize,
}

impl Decompressor {
    /// Create a decompressor for the negotiated `threshold`.
    #[must_use]
    pub fn new(threshold: usize) -> Self { Self { threshold } }

    /// Negotiated compression threshold.
    #[must_use]
    pub fn threshold(&self) -> usize { self.threshold }

    /// Inflate one frame body.
    ///
    /// # Errors
    ///
    /// Fails when the declared size is below the threshold, above
    /// [`MAX_UNCOMPRESSED_LENGTH`], or does not match the inflated data.
    pub fn decompress(&self, mut frame: BytesMut) -> io::Result<BytesMut> {
        let mut cursor = &frame[..];
        let claimed = wire::read_varint(&mut cursor).map_err(|e| invalid_data(e.to_string()))?;
        let header = frame.len() - cursor.len();
        if claimed == 0 {
            frame.advance(header);
            return Ok(frame);
        }
        let claimed = usize::try_from(claimed)
            .map_err(|_| invalid_data("negative uncompressed length"))?;
        if claimed < self.threshold {
            return Err(invalid_data(format!(
                "badly compressed packet: size {claimed} is below threshold {}",
                self.threshold
            )));
        }
        if claimed > MAX_UNCOMPRESSED_LENGTH {
            return Err(invalid_data(format!(
                "badly compressed packet: size {claimed} exceeds maximum \
                 {MAX_UNCOMPRESSED_LENGTH}"
            )));
        }
        let limit = u64::try_from(claimed).map_or(u64::MAX, |n| n.saturating_add(1));
        let mut inflated = Vec::with_capacity(claimed);
        ZlibDecoder::new(&frame[header..])
            .take(limit)
            .read_to_end(&mut inflated)?;
        if inflated.len() != claimed {
            return Err(invalid_data(format!(
                "badly compressed packet: declared {claimed} bytes, inflated {}",
                inflated.len()
            )));
        }
        Ok(BytesMut::from(&inflated[..]))
    }
}

impl ChannelHandler for Decompressor {
    fn read(&mut self, msg: BytesMut, out: &mut Vec<BytesMut>) -> Result<(), PipelineError> {
        out.push(self.decompress(msg)?);
        Ok(())
    }
}

/// Outbound handler that deflates packets at or above the threshold.
#[derive(Clone, Copy, Debug)]
pub struct Compressor {
    threshold: usize,
    level: Compression,
}

impl Compressor {
    /// Create a compressor for `threshold` at zlib `level` (0 to 9).
    #[must_use]
    pub fn new(threshold: usize, level: u32) -> Self {
        Self {
            threshold,
            level: Compression::new(level.min(9)),
        }
    }

    /// Negotiated compression threshold.
    #[must_use]
    pub fn threshold(&self) -> usize { self.threshold }

    /// Build one frame body from `packet`.
    ///
    /// # Errors
    ///
    /// Fails if the packet is too large or zlib reports an error.
    pub fn compress(&self, packet: &[u8]) -> io::Result<BytesMut> {
        let mut dst = BytesMut::with_capacity(packet.len() + MAX_VARINT_LEN);
        if packet.len() < self.threshold {
            wire::write_varint(0, &mut dst);
            dst.extend_from_slice(packet);
            return Ok(dst);
        }
        let len = i32::try_from(packet.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "packet too large"))?;
        wire::write_varint(len, &mut dst);
        let mut encoder = ZlibEncoder::new(dst.writer(), self.level);
        encoder.write_all(packet)?;
        Ok(encoder.finish()?.into_inner())
    }
}

impl ChannelHandler for Compressor {
    fn write(&mut self, msg: BytesMut, out: &mut Vec<BytesMut>) -> Result<(), PipelineError> {
        out.push(self.compress(&msg)?);
        Ok(())
    }
}

/// Enable compression the way the host does when the server asks for it.
///
/// New handlers go directly before the packet decoder and encoder. When they
/// are already present they are replaced in place with the new threshold.
/// This placement is unaware of translation handlers.
///
/// # Errors
///
/// Fails if the packet decoder or encoder is missing.
pub fn install_compression(
    pipeline: &mut ChannelPipeline,
    names: &dyn HandlerNames,
    threshold: usize,
    level: u32,
) -> Result<(), PipelineError> {
    let decompress = names.name(HandlerRole::Decompress);
    let decompressor = Box::new(Decompressor::new(threshold));
    if pipeline.contains(decompress) {
        pipeline.replace(decompress, decompressor)?;
    } else {
        pipeline.add_before(
            names.name(HandlerRole::PacketDecoder),
            decompress,
            decompressor,
        )?;
    }

    let compress = names.name(HandlerRole::Compress);
    let compressor = Box::new(Compressor::new(threshold, level));
    if pipeline.contains(compress) {
        pipeline.replace(compress, compressor)?;
    } else {
        pipeline.add_before(names.name(HandlerRole::PacketEncoder), compress, compressor)?;
    }
    log::debug!("compression enabled with threshold {threshold}");
    Ok(())
}
