use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Guard to decrement active connections counter when dropped
/// Also notifies when the last connection closes (for graceful shutdown)
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl ConnectionGuard {
    /// Count one more active connection until the guard is dropped
    pub fn acquire(counter: Arc<AtomicUsize>, notifier: watch::Sender<()>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter, notifier }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let remaining = self.counter.fetch_sub(1, Ordering::Relaxed);
        if remaining == 1 {
            let _ = self.notifier.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_guard_notifies() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = watch::channel(());
        rx.mark_unchanged();

        let first = ConnectionGuard::acquire(Arc::clone(&counter), tx.clone());
        let second = ConnectionGuard::acquire(Arc::clone(&counter), tx.clone());
        assert_eq!(counter.load(Ordering::Relaxed), 2);

        drop(first);
        assert!(!rx.has_changed().unwrap_or(true));

        drop(second);
        assert_eq!(counter.load(Ordering::Relaxed), 0);
        assert!(rx.has_changed().unwrap_or(false));
    }
}
