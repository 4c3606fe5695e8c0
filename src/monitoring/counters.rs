/*!
 * Contention Counters
 * Process-wide tallies of how lock acquisitions were resolved
 *
 * # Performance
 * - Each counter sits on its own cache line
 * - Relaxed increments only on slow paths (never on the uncontended fast path)
 */

use crate::core::types::CachePadded;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters
#[repr(C, align(64))]
pub struct ContentionCounters {
    spins: CachePadded<AtomicU64>,
    parks: CachePadded<AtomicU64>,
    wakes: CachePadded<AtomicU64>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentionSnapshot {
    /// Acquisitions that succeeded while spinning
    pub spins: u64,
    /// Times a thread blocked on a lock word
    pub parks: u64,
    /// Wakes issued by unlocks
    pub wakes: u64,
}

static COUNTERS: ContentionCounters = ContentionCounters::new();

impl ContentionCounters {
    const fn new() -> Self {
        Self {
            spins: CachePadded::new(AtomicU64::new(0)),
            parks: CachePadded::new(AtomicU64::new(0)),
            wakes: CachePadded::new(AtomicU64::new(0)),
        }
    }
}

/// Count an acquisition won by spinning
#[inline]
pub fn record_spin() {
    COUNTERS.spins.fetch_add(1, Ordering::Relaxed);
}

/// Count a park
#[inline]
pub fn record_park() {
    COUNTERS.parks.fetch_add(1, Ordering::Relaxed);
}

/// Count a wake
#[inline]
pub fn record_wake() {
    COUNTERS.wakes.fetch_add(1, Ordering::Relaxed);
}

/// Read all counters
pub fn snapshot() -> ContentionSnapshot {
    ContentionSnapshot {
        spins: COUNTERS.spins.load(Ordering::Relaxed),
        parks: COUNTERS.parks.load(Ordering::Relaxed),
        wakes: COUNTERS.wakes.load(Ordering::Relaxed),
    }
}

/// Zero all counters
pub fn reset() {
    COUNTERS.spins.store(0, Ordering::Relaxed);
    COUNTERS.parks.store(0, Ordering::Relaxed);
    COUNTERS.wakes.store(0, Ordering::Relaxed);
}
