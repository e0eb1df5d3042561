//! Per-connection pipeline that keeps translation handlers in place.
//!
//! States move strictly forward:
//!
//! ```text
//! Fresh -> Attached -> (CompressionPending ->) Active -> Closed
//! ```
//!
//! The host enables compression by inserting its handlers directly before the
//! packet decoder and encoder, which puts them on the wrong side of the
//! translation handlers. A compression reorder event moves each translation
//! handler back behind its compression handler.

use std::{fmt, sync::Arc};

use bytes::BytesMut;

use super::{
    ChannelPipeline,
    CompressionTakeoverDetector,
    DEFAULT_COMPRESSION_LEVEL,
    ExternalCompressionDetector,
    HandlerNames,
    HandlerRole,
    PipelineError,
    PipelineEvent,
    ProtocolStage,
    TranslationChain,
    VIA_DECODER_NAME,
    VIA_ENCODER_NAME,
    ViaDecoder,
    ViaEncoder,
    install_compression,
};
use crate::{metrics, settings::Settings, version::ProtocolVersion};

/// Lifecycle state of an [`AdaptationPipeline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Created but not bound to a connection.
    Fresh,
    /// Translation handlers are installed.
    Attached,
    /// Compression handlers were installed and await reordering.
    CompressionPending,
    /// Handlers are in their final order.
    Active,
    /// The connection has gone away.
    Closed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fresh => "fresh",
            Self::Attached => "attached",
            Self::CompressionPending => "compression-pending",
            Self::Active => "active",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Translation-aware wrapper around one connection's [`ChannelPipeline`].
pub struct AdaptationPipeline {
    names: Arc<dyn HandlerNames>,
    detector: Box<dyn CompressionTakeoverDetector>,
    tail: Arc<dyn ProtocolStage>,
    compression_level: u32,
    channel: Option<ChannelPipeline>,
    version: Option<ProtocolVersion>,
    state: PipelineState,
}

impl AdaptationPipeline {
    /// Create a pipeline that appends `tail` to every translation chain.
    ///
    /// The Krypton takeover detector is installed by default.
    #[must_use]
    pub fn new(names: Arc<dyn HandlerNames>, tail: Arc<dyn ProtocolStage>) -> Self {
        Self {
            names,
            detector: Box::new(ExternalCompressionDetector::krypton()),
            tail,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            channel: None,
            version: None,
            state: PipelineState::Fresh,
        }
    }

    /// Replace the compression takeover detector.
    #[must_use]
    pub fn with_detector(mut self, detector: Box<dyn CompressionTakeoverDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Set the zlib level used by [`enable_compression`](Self::enable_compression).
    #[must_use]
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    /// Apply the pipeline-related keys of `settings`.
    #[must_use]
    pub fn with_settings(self, settings: &Settings) -> Self {
        self.with_compression_level(settings.compression_level)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PipelineState { self.state }

    /// Server version the connection was attached for.
    #[must_use]
    pub fn version(&self) -> Option<ProtocolVersion> { self.version }

    /// The wrapped channel pipeline, while attached.
    #[must_use]
    pub fn channel(&self) -> Option<&ChannelPipeline> { self.channel.as_ref() }

    /// Bind to a host pipeline and splice in the translation handlers.
    ///
    /// The decoder goes directly before the host packet decoder and the
    /// encoder directly before the host packet encoder. The tail stage is
    /// appended to `chain` first.
    ///
    /// # Errors
    ///
    /// Fails when not [`Fresh`](PipelineState::Fresh), when a required host
    /// handler is missing, or when a translation handler name is taken.
    pub fn attach(
        &mut self,
        mut channel: ChannelPipeline,
        version: ProtocolVersion,
        mut chain: TranslationChain,
    ) -> Result<(), PipelineError> {
        self.transition(PipelineState::Fresh, PipelineState::Attached)?;
        for role in HandlerRole::REQUIRED {
            let name = self.names.name(role);
            if !channel.contains(name) {
                return Err(PipelineError::MissingHandler(name.to_owned()));
            }
        }

        chain.push(Arc::clone(&self.tail));
        let chain = Arc::new(chain);
        channel.add_before(
            self.names.name(HandlerRole::PacketDecoder),
            VIA_DECODER_NAME,
            Box::new(ViaDecoder::new(Arc::clone(&chain))),
        )?;
        channel.add_before(
            self.names.name(HandlerRole::PacketEncoder),
            VIA_ENCODER_NAME,
            Box::new(ViaEncoder::new(chain)),
        )?;

        log::debug!("pipeline attached for {version}: {channel:?}");
        self.channel = Some(channel);
        self.version = Some(version);
        self.state = PipelineState::Attached;
        Ok(())
    }

    /// Install host compression handlers with `threshold`.
    ///
    /// From [`Attached`](PipelineState::Attached) the pipeline moves to
    /// [`CompressionPending`](PipelineState::CompressionPending) until the
    /// reorder event arrives. Later calls update the threshold in place.
    ///
    /// # Errors
    ///
    /// Fails when not attached or already closed.
    pub fn enable_compression(&mut self, threshold: usize) -> Result<(), PipelineError> {
        let level = self.compression_level;
        let names = Arc::clone(&self.names);
        let channel = self.channel_mut()?;
        install_compression(channel, &*names, threshold, level)?;
        if self.state == PipelineState::Attached {
            self.state = PipelineState::CompressionPending;
        }
        Ok(())
    }

    /// Handle a lifecycle event.
    ///
    /// A foreign compression takeover is logged and replaced by a
    /// [`PipelineEvent::CompressionReorder`]. A reorder moves the translation
    /// handlers behind compression and activates the pipeline. The resulting
    /// event is then delivered to every handler. Events after close are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotAttached`] before [`attach`](Self::attach).
    pub fn user_event(&mut self, event: &PipelineEvent) -> Result<(), PipelineError> {
        match self.state {
            PipelineState::Fresh => return Err(PipelineError::NotAttached),
            PipelineState::Closed => return Ok(()),
            _ => {}
        }

        let event = if self.detector.is_forced_compression(event) {
            log::info!(
                "Compression has been re-ordered after \"{}\"",
                self.detector.component()
            );
            PipelineEvent::CompressionReorder
        } else {
            event.clone()
        };

        if event == PipelineEvent::CompressionReorder {
            self.reorder_compression()?;
            self.state = PipelineState::Active;
        }
        self.channel_mut()?.fire_user_event(&event);
        Ok(())
    }

    /// Feed bytes read from the socket through the pipeline.
    ///
    /// # Errors
    ///
    /// Fails when not attached, when closed, or when a handler fails. A
    /// handler failure closes the pipeline.
    pub fn fire_read(&mut self, bytes: BytesMut) -> Result<Vec<BytesMut>, PipelineError> {
        let result = self.channel_mut()?.fire_read(bytes);
        self.close_on_error(result)
    }

    /// Feed a packet written by the host through the pipeline.
    ///
    /// # Errors
    ///
    /// Fails when not attached, when closed, or when a handler fails. A
    /// handler failure closes the pipeline.
    pub fn fire_write(&mut self, packet: BytesMut) -> Result<Vec<BytesMut>, PipelineError> {
        let result = self.channel_mut()?.fire_write(packet);
        self.close_on_error(result)
    }

    /// Release the channel pipeline. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.state == PipelineState::Closed {
            return;
        }
        self.channel = None;
        self.state = PipelineState::Closed;
        log::debug!("pipeline closed");
    }

    fn close_on_error<T>(&mut self, result: Result<T, PipelineError>) -> Result<T, PipelineError> {
        if let Err(error) = &result {
            log::debug!("handler failed, closing pipeline: {error}");
            self.close();
        }
        result
    }

    fn transition(&self, from: PipelineState, to: PipelineState) -> Result<(), PipelineError> {
        if self.state == from {
            Ok(())
        } else {
            Err(PipelineError::InvalidState {
                from: self.state,
                to,
            })
        }
    }

    fn channel_mut(&mut self) -> Result<&mut ChannelPipeline, PipelineError> {
        match self.state {
            PipelineState::Fresh => Err(PipelineError::NotAttached),
            PipelineState::Closed => Err(PipelineError::Closed),
            _ => self.channel.as_mut().ok_or(PipelineError::NotAttached),
        }
    }

    fn reorder_compression(&mut self) -> Result<(), PipelineError> {
        let names = Arc::clone(&self.names);
        let channel = self.channel_mut()?;
        let mut moved = false;
        for (compression, translation) in [
            (names.name(HandlerRole::Decompress), VIA_DECODER_NAME),
            (names.name(HandlerRole::Compress), VIA_ENCODER_NAME),
        ] {
            let (Some(at), Some(via)) = (channel.index_of(compression), channel.index_of(translation))
            else {
                continue;
            };
            if at > via {
                let handler = channel.remove(translation)?;
                channel.add_after(compression, translation, handler)?;
                moved = true;
            }
        }
        if moved {
            metrics::inc_reorders();
            log::debug!("translation handlers moved behind compression: {channel:?}");
        }
        Ok(())
    }
}

impl fmt::Debug for AdaptationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptationPipeline")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
