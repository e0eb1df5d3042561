//! Ordered channel-handler chain around version translation.
//!
//! A [`ChannelPipeline`] is an ordered list of uniquely named handlers bound
//! to one connection. Bytes read from the socket travel from the head to the
//! tail; packets written by the host travel from the tail to the head. Each
//! handler may emit zero or more messages for the next one.
//!
//! [`AdaptationPipeline`] owns a pipeline for the lifetime of a connection,
//! splices the version decoder and encoder into it, and keeps them in the
//! right place when compression handlers are added later.

use std::{fmt, io};

use bytes::BytesMut;
use thiserror::Error;

use crate::{sync::SyncError, wire::WireError};

mod adaptation;
mod codec;
mod event;
mod names;
mod translation;

pub use adaptation::{AdaptationPipeline, PipelineState};
pub use codec::{
    Compressor,
    DEFAULT_COMPRESSION_LEVEL,
    Decompressor,
    LengthPrepender,
    LengthSplitter,
    MAX_FRAME_LENGTH,
    MAX_UNCOMPRESSED_LENGTH,
    install_compression,
};
pub use event::{CompressionTakeoverDetector, ExternalCompressionDetector, PipelineEvent};
pub use names::{HandlerNames, HandlerRole, HostHandlerNames, VIA_DECODER_NAME, VIA_ENCODER_NAME};
pub use translation::{ProtocolStage, TranslationChain, ViaDecoder, ViaEncoder};

/// Errors raised while building or driving a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A handler with this name is already present.
    #[error("handler `{0}` is already present")]
    DuplicateName(String),

    /// No handler with this name is present.
    #[error("handler `{0}` not found")]
    MissingHandler(String),

    /// The pipeline has not been attached to a connection yet.
    #[error("pipeline is not attached")]
    NotAttached,

    /// The pipeline has been closed.
    #[error("pipeline is closed")]
    Closed,

    /// The requested transition is not allowed from the current state.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidState {
        /// State the pipeline was in.
        from: PipelineState,
        /// State that was requested.
        to: PipelineState,
    },

    /// A framing or compression codec failed.
    #[error("codec failure: {0}")]
    Io(#[from] io::Error),

    /// A packet could not be parsed.
    #[error("malformed packet: {0}")]
    Wire(#[from] WireError),

    /// The sync channel rejected a message.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// One stage of a [`ChannelPipeline`].
///
/// The defaults pass messages through unchanged, so inbound-only handlers
/// implement [`read`](Self::read) and outbound-only handlers implement
/// [`write`](Self::write).
pub trait ChannelHandler: Send {
    /// Process a message travelling from the socket towards the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be processed.
    fn read(&mut self, msg: BytesMut, out: &mut Vec<BytesMut>) -> Result<(), PipelineError> {
        out.push(msg);
        Ok(())
    }

    /// Process a message travelling from the host towards the socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be processed.
    fn write(&mut self, msg: BytesMut, out: &mut Vec<BytesMut>) -> Result<(), PipelineError> {
        out.push(msg);
        Ok(())
    }

    /// Observe a pipeline lifecycle event.
    fn user_event(&mut self, _event: &PipelineEvent) {}
}

struct NamedHandler {
    name: String,
    handler: Box<dyn ChannelHandler>,
}

/// Ordered, uniquely named handler chain for a single connection.
#[derive(Default)]
pub struct ChannelPipeline {
    entries: Vec<NamedHandler>,
}

impl ChannelPipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append `handler` at the tail.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateName`] if `name` is taken.
    pub fn add_last(
        &mut self,
        name: impl Into<String>,
        handler: Box<dyn ChannelHandler>,
    ) -> Result<(), PipelineError> {
        let index = self.entries.len();
        self.insert_at(index, name.into(), handler)
    }

    /// Insert `handler` at the head.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateName`] if `name` is taken.
    pub fn add_first(
        &mut self,
        name: impl Into<String>,
        handler: Box<dyn ChannelHandler>,
    ) -> Result<(), PipelineError> {
        self.insert_at(0, name.into(), handler)
    }

    /// Insert `handler` directly before `base`.
    ///
    /// # Errors
    ///
    /// Fails if `base` is missing or `name` is taken.
    pub fn add_before(
        &mut self,
        base: &str,
        name: impl Into<String>,
        handler: Box<dyn ChannelHandler>,
    ) -> Result<(), PipelineError> {
        let index = self.require(base)?;
        self.insert_at(index, name.into(), handler)
    }

    /// Insert `handler` directly after `base`.
    ///
    /// # Errors
    ///
    /// Fails if `base` is missing or `name` is taken.
    pub fn add_after(
        &mut self,
        base: &str,
        name: impl Into<String>,
        handler: Box<dyn ChannelHandler>,
    ) -> Result<(), PipelineError> {
        let index = self.require(base)?;
        self.insert_at(index + 1, name.into(), handler)
    }

    /// Remove and return the handler called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingHandler`] if it is not present.
    pub fn remove(&mut self, name: &str) -> Result<Box<dyn ChannelHandler>, PipelineError> {
        let index = self.require(name)?;
        Ok(self.entries.remove(index).handler)
    }

    /// Swap the handler called `name` for `handler`, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingHandler`] if it is not present.
    pub fn replace(
        &mut self,
        name: &str,
        handler: Box<dyn ChannelHandler>,
    ) -> Result<Box<dyn ChannelHandler>, PipelineError> {
        let index = self.require(name)?;
        let entry = &mut self.entries[index];
        Ok(std::mem::replace(&mut entry.handler, handler))
    }

    /// Position of the handler called `name`, counted from the head.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    /// Whether a handler called `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.index_of(name).is_some() }

    /// Handler names from head to tail.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// Number of handlers.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Whether the pipeline has no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Push bytes read from the socket through every handler, head to tail.
    ///
    /// Returns the messages that reached the tail.
    ///
    /// # Errors
    ///
    /// Stops at the first handler that fails. Messages already split out of
    /// the same chunk are dropped with it, so the error is fatal to the
    /// connection.
    pub fn fire_read(&mut self, msg: BytesMut) -> Result<Vec<BytesMut>, PipelineError> {
        let mut messages = vec![msg];
        for entry in &mut self.entries {
            let mut next = Vec::with_capacity(messages.len());
            for message in messages {
                entry.handler.read(message, &mut next)?;
            }
            messages = next;
            if messages.is_empty() {
                break;
            }
        }
        Ok(messages)
    }

    /// Push a packet written by the host through every handler, tail to head.
    ///
    /// Returns the byte chunks that reached the head.
    ///
    /// # Errors
    ///
    /// Stops at the first handler that fails.
    pub fn fire_write(&mut self, msg: BytesMut) -> Result<Vec<BytesMut>, PipelineError> {
        let mut messages = vec![msg];
        for entry in self.entries.iter_mut().rev() {
            let mut next = Vec::with_capacity(messages.len());
            for message in messages {
                entry.handler.write(message, &mut next)?;
            }
            messages = next;
            if messages.is_empty() {
                break;
            }
        }
        Ok(messages)
    }

    /// Deliver `event` to every handler, head to tail.
    pub fn fire_user_event(&mut self, event: &PipelineEvent) {
        for entry in &mut self.entries {
            entry.handler.user_event(event);
        }
    }

    fn require(&self, name: &str) -> Result<usize, PipelineError> {
        self.index_of(name)
            .ok_or_else(|| PipelineError::MissingHandler(name.to_owned()))
    }

    fn insert_at(
        &mut self,
        index: usize,
        name: String,
        handler: Box<dyn ChannelHandler>,
    ) -> Result<(), PipelineError> {
        if self.contains(&name) {
            return Err(PipelineError::DuplicateName(name));
        }
        self.entries.insert(index, NamedHandler { name, handler });
        Ok(())
    }
}

impl fmt::Debug for ChannelPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
