#![doc(html_root_url = "https://docs.rs/shimframe/latest")]
//! Public API for the `shimframe` library.
//!
//! This crate adapts a modern game client to servers speaking older or
//! foreign protocol revisions. It provides per-version limits, legacy item
//! field preservation, correlation of main-loop tasks with sync messages, a
//! translation-aware channel pipeline, and Bedrock address resolution.

pub mod address;
pub mod error;
pub mod executor;
pub mod fixes;
pub mod item;
pub mod item_count;
pub mod lifecycle;
pub mod metrics;
pub mod pipeline;
pub mod policy;
pub mod settings;
pub mod sync;
pub mod version;
pub mod wire;

pub use error::{Result, ShimError};
pub use executor::{Job, MainContext, MainQueue, MainQueueReceiver};
pub use lifecycle::{Lifecycle, LifecycleObserver};
pub use pipeline::{AdaptationPipeline, ChannelHandler, ChannelPipeline, PipelineEvent};
pub use settings::Settings;
pub use sync::{SyncChannel, SyncStage, SyncTaskRegistry};
pub use version::{ProtocolVersion, VersionCell, VersionType};
