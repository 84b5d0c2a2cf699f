//! Lock-free worker accounting.
//!
//! Active and idle counts share one atomic word (active in the high half,
//! idle in the low half) so a snapshot never shows more idle than active
//! workers. Counts are advisory input to scaling decisions; a stale read is
//! corrected by the next decision.

use std::sync::atomic::{AtomicU64, Ordering};

const ACTIVE_ONE: u64 = 1 << 32;
const IDLE_MASK: u64 = ACTIVE_ONE - 1;

/// Point-in-time view of the pool size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerSnapshot {
    pub active: usize,
    pub idle: usize,
}

fn unpack(state: u64) -> WorkerSnapshot {
    WorkerSnapshot {
        active: (state >> 32) as usize,
        idle: (state & IDLE_MASK) as usize,
    }
}

#[derive(Debug, Default)]
pub struct WorkerCounters {
    state: AtomicU64,
    spawned: AtomicU64,
}

impl WorkerCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a newly spawned worker. Returns its sequence number.
    pub fn register(&self) -> u64 {
        self.state.fetch_add(ACTIVE_ONE, Ordering::AcqRel);
        self.spawned.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn enter_idle(&self) {
        self.state.fetch_add(1, Ordering::AcqRel);
    }

    pub fn leave_idle(&self) {
        self.state.fetch_sub(1, Ordering::AcqRel);
    }

    /// Remove a busy worker unless it is the last one.
    pub fn try_retire(&self) -> bool {
        let mut prev = self.state.load(Ordering::Acquire);
        loop {
            if unpack(prev).active <= 1 {
                return false;
            }
            match self.state.compare_exchange_weak(
                prev,
                prev - ACTIVE_ONE,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(x) => prev = x,
            }
        }
    }

    /// Remove a busy worker unconditionally (shutdown path).
    pub fn retire(&self) {
        self.state.fetch_sub(ACTIVE_ONE, Ordering::AcqRel);
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        unpack(self.state.load(Ordering::Acquire))
    }

    pub fn active(&self) -> usize {
        self.snapshot().active
    }

    pub fn idle(&self) -> usize {
        self.snapshot().idle
    }

    /// Workers spawned over the pool's lifetime.
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::Relaxed) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_tracks_active() {
        let counters = WorkerCounters::new();
        counters.register();
        counters.register();
        counters.enter_idle();

        assert_eq!(counters.snapshot(), WorkerSnapshot { active: 2, idle: 1 });
        counters.leave_idle();
        assert_eq!(counters.idle(), 0);
        assert_eq!(counters.spawned(), 2);
    }

    #[test]
    fn last_worker_cannot_retire() {
        let counters = WorkerCounters::new();
        counters.register();
        counters.register();

        assert!(counters.try_retire());
        assert!(!counters.try_retire());
        assert_eq!(counters.active(), 1);

        counters.retire();
        assert_eq!(counters.active(), 0);
        assert_eq!(counters.spawned(), 2);
    }

    #[test]
    fn concurrent_retire_keeps_one() {
        let counters = std::sync::Arc::new(WorkerCounters::new());
        for _ in 0..16 {
            counters.register();
        }

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let counters = counters.clone();
                std::thread::spawn(move || counters.try_retire())
            })
            .collect();
        let retired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| *r)
            .count();

        assert_eq!(retired, 15);
        assert_eq!(counters.active(), 1);
    }
}
