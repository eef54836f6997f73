//! Invalidation barrier between removeAll and in-flight persists
//!
//! Persist critical sections hold the shared side; removeAll takes the
//! exclusive side only for the staging swap. The guarded value is the
//! invalidation generation: each removeAll advances it, and a persist whose
//! entry was staged under an older generation is rejected.

use tokio::sync::{RwLock, RwLockReadGuard};

/// Reader/writer barrier carrying a generation fencing token
#[derive(Debug, Default)]
pub struct InvalidationBarrier {
    generation: RwLock<u64>,
}

/// Shared access held by a persist critical section or a staging insert
pub struct BarrierGuard<'a> {
    guard: RwLockReadGuard<'a, u64>,
}

impl BarrierGuard<'_> {
    /// Generation in force while this guard is held
    pub fn generation(&self) -> u64 {
        *self.guard
    }

    /// Whether something staged under `generation` may still be persisted
    pub fn admits(&self, generation: u64) -> bool {
        generation == *self.guard
    }
}

impl InvalidationBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the shared side; blocks while an invalidation is running
    pub async fn enter(&self) -> BarrierGuard<'_> {
        BarrierGuard {
            guard: self.generation.read().await,
        }
    }

    /// Run `swap` with exclusive access, then advance the generation
    ///
    /// Waits for every shared holder to leave first. Returns the new generation.
    pub async fn invalidate<F>(&self, swap: F) -> u64
    where
        F: FnOnce(),
    {
        let mut generation = self.generation.write().await;
        swap();
        *generation += 1;
        *generation
    }

    /// Current generation without waiting on writers
    pub fn try_generation(&self) -> Option<u64> {
        self.generation.try_read().ok().map(|g| *g)
    }
}
