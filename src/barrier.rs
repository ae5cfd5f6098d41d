use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    in_flight: AtomicUsize,
    drained: Notify,
}

/// A counting rendezvous for concurrently dispatched tasks.
///
/// Every task registers before it is spawned and deregisters exactly once
/// when it finishes, whatever the outcome. [`CompletionBarrier::wait`]
/// resolves once nothing is in flight. The barrier says nothing about
/// success or failure, and nothing about the order tasks run in.
#[derive(Clone, Debug, Default)]
pub struct CompletionBarrier {
    inner: Arc<Inner>,
}

impl CompletionBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more task in flight. The returned token must be given back
    /// through [`Registration::arrive_and_deregister`], dropping it has the
    /// same effect.
    pub fn register(&self) -> Registration {
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);

        Registration {
            inner: Some(Arc::clone(&self.inner)),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Resolves when no registered task is in flight, immediately if nothing
    /// is registered.
    pub async fn wait(&self) {
        loop {
            let mut notified = pin!(self.inner.drained.notified());
            // register interest before reading the counter, so a drain
            // between the read and the await is not lost
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }

            notified.await;
        }
    }
}

/// Proof that a task is counted by a [`CompletionBarrier`].
#[derive(Debug)]
#[must_use = "dropping a registration deregisters it immediately"]
pub struct Registration {
    inner: Option<Arc<Inner>>,
}

impl Registration {
    pub fn arrive_and_deregister(mut self) {
        self.deregister();
    }

    fn deregister(&mut self) {
        if let Some(inner) = self.inner.take() {
            if inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
                inner.drained.notify_waiters();
            }
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.deregister();
    }
}
