//! Lifecycle events delivered through a pipeline.

/// Event fired through the pipeline alongside data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Compression handlers were installed and translation handlers must be
    /// moved behind them.
    CompressionReorder,

    /// Event raised by a third-party component that the pipeline does not
    /// model directly.
    External {
        /// Fully qualified event type name.
        type_name: String,
        /// Textual rendering of the event.
        marker: String,
    },
}

impl PipelineEvent {
    /// Build an [`External`](Self::External) event.
    #[must_use]
    pub fn external(type_name: impl Into<String>, marker: impl Into<String>) -> Self {
        Self::External {
            type_name: type_name.into(),
            marker: marker.into(),
        }
    }
}

/// Recognises a foreign component announcing that it installed compression
/// in place of the host.
pub trait CompressionTakeoverDetector: Send + Sync {
    /// Name used when logging the takeover.
    fn component(&self) -> &str;

    /// Whether `event` means compression was enabled by the foreign component.
    fn is_forced_compression(&self, event: &PipelineEvent) -> bool;
}

/// Detector matching an [`PipelineEvent::External`] by type name and marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalCompressionDetector {
    component: String,
    type_name: String,
    marker: String,
}

impl ExternalCompressionDetector {
    /// Match events of `type_name` whose rendering equals `marker`.
    #[must_use]
    pub fn new(
        component: impl Into<String>,
        type_name: impl Into<String>,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            type_name: type_name.into(),
            marker: marker.into(),
        }
    }

    /// Detector for the Krypton networking optimiser.
    #[must_use]
    pub fn krypton() -> Self {
        Self::new(
            "Krypton",
            "me.steinborn.krypton.mod.shared.misc.KryptonPipelineEvent",
            "COMPRESSION_ENABLED",
        )
    }
}

impl Default for ExternalCompressionDetector {
    fn default() -> Self { Self::krypton() }
}

impl CompressionTakeoverDetector for ExternalCompressionDetector {
    fn component(&self) -> &str { &self.component }

    fn is_forced_compression(&self, event: &PipelineEvent) -> bool {
        match event {
            PipelineEvent::External { type_name, marker } => {
                *type_name == self.type_name && *marker == self.marker
            }
            PipelineEvent::CompressionReorder => false,
        }
    }
}
