//! Hand-off to the application's single-threaded main loop.
//!
//! Network threads never run host-visible work themselves. They post a
//! [`Job`] through a [`MainContext`] and the main loop runs it later, in the
//! order jobs were posted from each thread.

use tokio::sync::mpsc;

/// Unit of work executed on the main loop.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Capability to post work onto the main loop.
///
/// Posting is fire-and-forget: there is no return value and no completion
/// signal.
pub trait MainContext: Send + Sync {
    /// Queue `job` for execution on the main loop.
    fn execute(&self, job: Job);
}

impl<F> MainContext for F
where
    F: Fn(Job) + Send + Sync,
{
    fn execute(&self, job: Job) { self(job); }
}

/// Channel-backed [`MainContext`] for hosts without their own task queue.
///
/// Pair it with the [`MainQueueReceiver`] returned by [`MainQueue::new`] and
/// drain the receiver from the main loop.
#[derive(Clone, Debug)]
pub struct MainQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl MainQueue {
    /// Create a queue and the receiver the main loop drains.
    #[must_use]
    pub fn new() -> (Self, MainQueueReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, MainQueueReceiver { rx })
    }
}

impl MainContext for MainQueue {
    fn execute(&self, job: Job) {
        if self.tx.send(job).is_err() {
            log::debug!("main loop has shut down; dropping posted job");
        }
    }
}

/// Receiving half of a [`MainQueue`], owned by the main loop.
pub struct MainQueueReceiver {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl MainQueueReceiver {
    /// Run every job queued so far without waiting, returning how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Run jobs until every [`MainQueue`] handle has been dropped.
    pub async fn run(&mut self) {
        while let Some(job) = self.rx.recv().await {
            job();
        }
    }
}

impl std::fmt::Debug for MainQueueReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainQueueReceiver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[test]
    fn jobs_wait_for_the_main_loop() {
        let (queue, mut main) = MainQueue::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        queue.execute(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(main.run_pending(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(main.run_pending(), 0);
    }

    #[tokio::test]
    async fn run_returns_once_handles_drop() {
        let (queue, mut main) = MainQueue::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let counter = Arc::clone(&hits);
            queue.execute(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        drop(queue);
        main.run().await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
