/*!
 * Mutex Creation Attributes
 *
 * Per-instance knobs accepted by `create(attr)`. The tuner's thresholds
 * themselves are compile-time constants in `core::limits`.
 */

use super::tuner::clamp_spin_ticks;
use crate::core::limits::{DEFAULT_SPIN_TICKS, MIN_SPIN_TICKS, UNLOCK_DELAY_SPINS};

/// Mutex creation attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutexAttr {
    /// Spin budget the tuner starts from, in ticks
    pub initial_spin_ticks: u32,
    /// Busy iterations an unlock waits before deciding to wake a waiter
    pub unlock_delay_spins: u32,
}

impl MutexAttr {
    /// Default attributes
    pub const fn new() -> Self {
        Self {
            initial_spin_ticks: DEFAULT_SPIN_TICKS,
            unlock_delay_spins: UNLOCK_DELAY_SPINS,
        }
    }

    /// Attributes for locks with very short critical sections
    pub const fn low_latency() -> Self {
        Self {
            initial_spin_ticks: DEFAULT_SPIN_TICKS * 4,
            unlock_delay_spins: UNLOCK_DELAY_SPINS,
        }
    }

    /// Attributes for locks held long enough that spinning rarely pays off
    pub const fn long_wait() -> Self {
        Self {
            initial_spin_ticks: MIN_SPIN_TICKS,
            unlock_delay_spins: 0,
        }
    }

    /// Builder-style override of the initial spin budget
    pub const fn with_spin_ticks(mut self, ticks: u32) -> Self {
        self.initial_spin_ticks = ticks;
        self
    }

    /// Builder-style override of the unlock delay
    pub const fn with_unlock_delay(mut self, spins: u32) -> Self {
        self.unlock_delay_spins = spins;
        self
    }

    /// Spin budget after clamping into the tuner's range
    pub const fn effective_spin_ticks(&self) -> u32 {
        clamp_spin_ticks(self.initial_spin_ticks)
    }
}

impl Default for MutexAttr {
    fn default() -> Self {
        Self::new()
    }
}
