use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Marks that an endpoint answered with a non-empty body at least once
/// since the process started.
///
/// The flag only ever moves from `0` to `1`, there is no way to reset it.
/// Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct Heartbeat(Arc<AtomicU8>);

impl Heartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call flipped the flag, `false` if it was
    /// already set.
    pub fn beat(&self) -> bool {
        self.0
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Current value, `0` or `1`.
    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.get() == 1
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn flips_once() {
        let heartbeat = Heartbeat::new();
        assert_eq!(heartbeat.get(), 0);
        assert!(!heartbeat.is_alive());

        assert!(heartbeat.beat());
        assert!(!heartbeat.beat());
        assert!(!heartbeat.clone().beat());

        assert_eq!(heartbeat.get(), 1);
        assert!(heartbeat.is_alive());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_beats() {
        let heartbeat = Heartbeat::new();
        let flipped = Arc::new(AtomicUsize::new(0));

        let handles = (0..64)
            .map(|_| {
                let heartbeat = heartbeat.clone();
                let flipped = Arc::clone(&flipped);

                tokio::spawn(async move {
                    if heartbeat.beat() {
                        flipped.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(flipped.load(Ordering::SeqCst), 1);
        assert_eq!(heartbeat.get(), 1);
    }
}
