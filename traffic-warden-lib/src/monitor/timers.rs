use std::sync::atomic::{AtomicU64, Ordering};

/// Last-run timestamps of the periodic full sweep and prune.
///
/// A run is claimed with a compare-and-swap on the stored timestamp, so for
/// one elapsed interval exactly one caller wins, however many requests race.
#[derive(Debug, Default)]
pub struct SweepTimers {
    last_full_sweep: AtomicU64,
    last_prune: AtomicU64,
}

impl SweepTimers {
    /// Both timers considered to have just run at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self { last_full_sweep: AtomicU64::new(start_ms), last_prune: AtomicU64::new(start_ms) }
    }

    pub fn last_full_sweep(&self) -> u64 {
        self.last_full_sweep.load(Ordering::SeqCst)
    }

    pub fn last_prune(&self) -> u64 {
        self.last_prune.load(Ordering::SeqCst)
    }

    /// True if more than `interval_ms` passed since the last full sweep and
    /// this caller won the right to run the next one.
    pub fn try_claim_full_sweep(&self, now_ms: u64, interval_ms: u64) -> bool {
        try_claim(&self.last_full_sweep, now_ms, interval_ms)
    }

    /// Same as [`Self::try_claim_full_sweep`] for the prune timer.
    pub fn try_claim_prune(&self, now_ms: u64, interval_ms: u64) -> bool {
        try_claim(&self.last_prune, now_ms, interval_ms)
    }
}

fn try_claim(slot: &AtomicU64, now_ms: u64, interval_ms: u64) -> bool {
    let last = slot.load(Ordering::SeqCst);
    if now_ms.saturating_sub(last) <= interval_ms {
        return false;
    }
    slot.compare_exchange(last, now_ms, Ordering::SeqCst, Ordering::Acquire)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn claim_requires_strictly_elapsed_interval() {
        let timers = SweepTimers::new(1_000);
        assert!(!timers.try_claim_full_sweep(1_100, 100));
        assert!(timers.try_claim_full_sweep(1_101, 100));
        assert_eq!(timers.last_full_sweep(), 1_101);
        assert!(!timers.try_claim_full_sweep(1_101, 100));
        assert_eq!(timers.last_prune(), 1_000);
    }

    #[test]
    fn clock_going_backwards_never_claims() {
        let timers = SweepTimers::new(5_000);
        assert!(!timers.try_claim_prune(1_000, 10));
    }

    #[test]
    fn concurrent_claims_have_one_winner() {
        let timers = Arc::new(SweepTimers::new(0));
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let timers = Arc::clone(&timers);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if timers.try_claim_prune(10_000, 60) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(timers.last_prune(), 10_000);
    }
}
