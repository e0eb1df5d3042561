//! Metric helpers for `shimframe`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking sync tasks awaiting a reply.
pub const SYNC_PENDING: &str = "shimframe_sync_pending";
/// Name of the counter tracking sync tasks handed to the main loop.
pub const SYNC_COMPLETED: &str = "shimframe_sync_completed_total";
/// Name of the counter tracking translation handler reorders.
pub const PIPELINE_REORDERS: &str = "shimframe_pipeline_reorders_total";

/// Record the number of pending sync tasks.
#[cfg_attr(
    not(feature = "metrics"),
    expect(unused_variables, reason = "recorded only with the metrics feature")
)]
pub fn set_sync_pending(pending: usize) {
    #[cfg(feature = "metrics")]
    #[expect(
        clippy::cast_precision_loss,
        reason = "gauge values are f64; pending counts stay far below 2^52"
    )]
    gauge!(SYNC_PENDING).set(pending as f64);
}

/// Record a sync task handed to the main loop.
pub fn inc_sync_completed() {
    #[cfg(feature = "metrics")]
    counter!(SYNC_COMPLETED).increment(1);
}

/// Record translation handlers being moved behind compression.
pub fn inc_reorders() {
    #[cfg(feature = "metrics")]
    counter!(PIPELINE_REORDERS).increment(1);
}
