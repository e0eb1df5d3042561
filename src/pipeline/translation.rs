//! Protocol translation stages and the handlers that run them.

use std::{fmt, sync::Arc};

use bytes::BytesMut;

use super::{ChannelHandler, PipelineError};

/// One step of version translation.
///
/// Stages see whole, uncompressed packets: a `VarInt` packet id followed by
/// the body. Returning `Ok(None)` consumes the packet.
pub trait ProtocolStage: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Translate a packet travelling towards the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet cannot be translated.
    fn inbound(&self, packet: BytesMut) -> Result<Option<BytesMut>, PipelineError> {
        Ok(Some(packet))
    }

    /// Translate a packet travelling towards the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet cannot be translated.
    fn outbound(&self, packet: BytesMut) -> Result<Option<BytesMut>, PipelineError> {
        Ok(Some(packet))
    }
}

/// Ordered list of stages from the server's revision to the client's.
///
/// Inbound packets run through the stages in order and outbound packets in
/// reverse, so the last stage is closest to the client.
#[derive(Clone, Default)]
pub struct TranslationChain {
    stages: Vec<Arc<dyn ProtocolStage>>,
}

impl TranslationChain {
    /// Create an empty chain, which passes every packet through.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append `stage` at the client end of the chain.
    pub fn push(&mut self, stage: Arc<dyn ProtocolStage>) { self.stages.push(stage); }

    /// Stage names from the server end to the client end.
    #[must_use]
    pub fn names(&self) -> Vec<&str> { self.stages.iter().map(|s| s.name()).collect() }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize { self.stages.len() }

    /// Whether the chain has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.stages.is_empty() }

    /// Run `packet` through every stage towards the client.
    ///
    /// # Errors
    ///
    /// Stops at the first failing stage.
    pub fn inbound(&self, packet: BytesMut) -> Result<Option<BytesMut>, PipelineError> {
        let mut packet = packet;
        for stage in &self.stages {
            match stage.inbound(packet)? {
                Some(next) => packet = next,
                None => return Ok(None),
            }
        }
        Ok(Some(packet))
    }

    /// Run `packet` through every stage towards the server.
    ///
    /// # Errors
    ///
    /// Stops at the first failing stage.
    pub fn outbound(&self, packet: BytesMut) -> Result<Option<BytesMut>, PipelineError> {
        let mut packet = packet;
        for stage in self.stages.iter().rev() {
            match stage.outbound(packet)? {
                Some(next) => packet = next,
                None => return Ok(None),
            }
        }
        Ok(Some(packet))
    }
}

impl fmt::Debug for TranslationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Inbound handler that translates decoded frames towards the client.
#[derive(Debug)]
pub struct ViaDecoder {
    chain: Arc<TranslationChain>,
}

impl ViaDecoder {
    /// Wrap a shared translation chain.
    #[must_use]
    pub fn new(chain: Arc<TranslationChain>) -> Self { Self { chain } }
}

impl ChannelHandler for ViaDecoder {
    fn read(&mut self, msg: BytesMut, out: &mut Vec<BytesMut>) -> Result<(), PipelineError> {
        if let Some(packet) = self.chain.inbound(msg)? {
            out.push(packet);
        }
        Ok(())
    }
}

/// Outbound handler that translates encoded packets towards the server.
#[derive(Debug)]
pub struct ViaEncoder {
    chain: Arc<TranslationChain>,
}

impl ViaEncoder {
    /// Wrap a shared translation chain.
    #[must_use]
    pub fn new(chain: Arc<TranslationChain>) -> Self { Self { chain } }
}

impl ChannelHandler for ViaEncoder {
    fn write(&mut self, msg: BytesMut, out: &mut Vec<BytesMut>) -> Result<(), PipelineError> {
        if let Some(packet) = self.chain.outbound(msg)? {
            out.push(packet);
        }
        Ok(())
    }
}
