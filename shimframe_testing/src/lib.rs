//! Test helpers for `shimframe`.
//!
//! Provides a stand-in host pipeline, a sync harness wired to an in-process
//! main queue, and a serialised [`logtest`] logger fixture.
//!
//! ```rust
//! use shimframe_testing::{host_pipeline, pipeline::DECODER_NAME};
//!
//! let pipeline = host_pipeline();
//! assert!(pipeline.contains(DECODER_NAME));
//! ```

pub mod logging;
pub mod pipeline;

pub use logging::{LoggerHandle, logger};
pub use pipeline::{PassThrough, SyncHarness, custom_payload, host_pipeline, sync_harness};
