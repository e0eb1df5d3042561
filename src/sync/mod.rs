//! Correlation of main-loop tasks with out-of-band sync messages.
//!
//! Translation code running on a network thread sometimes needs work done on
//! the main loop at a precise point in the packet stream. It registers a task
//! with [`SyncTaskRegistry::schedule`], sends the returned token to the peer
//! inside a sync message, and the task runs on the main loop once the message
//! comes back through [`SyncTaskRegistry::on_reply`].
//!
//! Tasks are best-effort: a reply that never arrives leaves its task pending
//! forever, and replies with unknown tokens are dropped without comment.

use std::{fmt, io, sync::Arc};

use bytes::Bytes;
use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;
use uuid::Uuid;

use crate::{executor::MainContext, metrics, wire::WireError};

mod payload;
mod stage;

pub use payload::{SyncChannel, SyncMessage, SyncPayload, SyncPayloadCodec};
pub use stage::{DEFAULT_CUSTOM_PAYLOAD_ID, SyncStage};

/// Callback run on the main loop with the reply body.
pub type SyncTask = Box<dyn FnOnce(Bytes) + Send + Sync + 'static>;

/// Errors raised by the sync channel.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A sync message was handed to an outbound encoder.
    #[error("sync payloads are read-only and cannot be encoded")]
    ReadOnlyPayload,

    /// The message body could not be parsed.
    #[error("malformed sync message: {0}")]
    Malformed(#[from] WireError),

    /// The transport refused the message.
    #[error("sync transport failed: {0}")]
    Transport(#[source] io::Error),
}

impl From<SyncError> for io::Error {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::ReadOnlyPayload => io::Error::new(io::ErrorKind::Unsupported, error),
            SyncError::Malformed(_) => io::Error::new(io::ErrorKind::InvalidData, error),
            SyncError::Transport(inner) => inner,
        }
    }
}

/// Capability to hand an encoded sync message to the peer.
pub trait SyncTransport {
    /// Deliver a custom payload body built by [`SyncMessage::encode`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the message cannot be queued.
    fn deliver(&self, message: Bytes) -> io::Result<()>;
}

impl<F> SyncTransport for F
where
    F: Fn(Bytes) -> io::Result<()>,
{
    fn deliver(&self, message: Bytes) -> io::Result<()> { self(message) }
}

/// Process-wide registry of tasks awaiting a sync reply.
///
/// Created once at startup and never reset. `schedule` and `on_reply` may be
/// called concurrently from any thread; the map handles its own locking.
pub struct SyncTaskRegistry {
    channel: SyncChannel,
    tasks: DashMap<String, SyncTask>,
    main: Arc<dyn MainContext>,
}

impl SyncTaskRegistry {
    /// Create a registry with a freshly generated channel.
    #[must_use]
    pub fn new(main: Arc<dyn MainContext>) -> Self {
        Self::with_channel(SyncChannel::random(), main)
    }

    /// Create a registry bound to a specific channel.
    #[must_use]
    pub fn with_channel(channel: SyncChannel, main: Arc<dyn MainContext>) -> Self {
        Self {
            channel,
            tasks: DashMap::new(),
            main,
        }
    }

    /// Channel identifier sync messages must carry.
    #[must_use]
    pub fn channel(&self) -> &SyncChannel { &self.channel }

    /// Register `task` and return the token that will trigger it.
    pub fn schedule<F>(&self, task: F) -> String
    where
        F: FnOnce(Bytes) + Send + Sync + 'static,
    {
        let task: SyncTask = Box::new(task);
        loop {
            let token = Uuid::new_v4().to_string();
            if let Entry::Vacant(slot) = self.tasks.entry(token.clone()) {
                slot.insert(task);
                metrics::set_sync_pending(self.tasks.len());
                return token;
            }
        }
    }

    /// Register `task` and send its sync message through `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] if delivery fails. The task is
    /// unregistered again in that case.
    pub fn dispatch<F>(
        &self,
        task: F,
        body: &[u8],
        transport: &dyn SyncTransport,
    ) -> Result<String, SyncError>
    where
        F: FnOnce(Bytes) + Send + Sync + 'static,
    {
        let token = self.schedule(task);
        let message = SyncMessage::encode(&self.channel, &token, body);
        if let Err(error) = transport.deliver(message) {
            self.tasks.remove(&token);
            metrics::set_sync_pending(self.tasks.len());
            return Err(SyncError::Transport(error));
        }
        log::debug!("dispatched sync task {token}");
        Ok(token)
    }

    /// Run the task registered under `token` on the main loop.
    ///
    /// The entry is removed before the task is posted, so a task runs at most
    /// once. Returns `false` for unknown or already consumed tokens.
    pub fn on_reply(&self, token: &str, payload: Bytes) -> bool {
        let Some((_, task)) = self.tasks.remove(token) else {
            return false;
        };
        metrics::set_sync_pending(self.tasks.len());
        metrics::inc_sync_completed();
        self.main.execute(Box::new(move || task(payload)));
        true
    }

    /// Handle a custom payload body received on `channel`.
    ///
    /// Bodies for other channels are ignored without reading the token.
    /// Returns whether a pending task was matched.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Malformed`] when the token cannot be read.
    pub fn handle_payload(&self, channel: &str, mut data: Bytes) -> Result<bool, SyncError> {
        if channel != self.channel.as_str() {
            return Ok(false);
        }
        let token = crate::wire::read_string(&mut data, crate::wire::MAX_STRING_LEN)?;
        Ok(self.on_reply(&token, data))
    }

    /// Whether `token` is still waiting for its reply.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool { self.tasks.contains_key(token) }

    /// Number of tasks waiting for a reply.
    #[must_use]
    pub fn pending(&self) -> usize { self.tasks.len() }
}

impl fmt::Debug for SyncTaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncTaskRegistry")
            .field("channel", &self.channel)
            .field("pending", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
