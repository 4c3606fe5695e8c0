/*!
 * Adaptive Spin Tuner
 *
 * Long-run feedback loop over a mutex's spin budget. Every
 * `ADJUST_INTERVAL` contended unlocks it looks at how many of them had to
 * wake a parked thread:
 * - many wakes: blocking is frequent, spin longer before parking
 * - few wakes: spinning rarely pays off, spin shorter
 *
 * All counters are updated by the thread releasing the mutex, before the
 * release, so they are serialized by the mutex itself. They are still
 * atomics because spinners read `spin_ticks` concurrently.
 */

use crate::core::limits::{
    ADJUST_INTERVAL, DEFAULT_SPIN_TICKS, MAX_SPIN_TICKS, MIN_SPIN_TICKS, SPIN_DECREASE_UNIT,
    SPIN_INCREASE_UNIT, WAKE_MAX_THRESHOLD, WAKE_MIN_THRESHOLD,
};
use crate::core::types::CachePadded;
use crate::core::unlikely;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::debug;

/// Outcome of one tuner evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Spin budget grew
    Increased { from: u32, to: u32 },
    /// Spin budget shrank
    Decreased { from: u32, to: u32 },
    /// Wake count fell between the thresholds
    Unchanged(u32),
}

/// Clamp a spin budget into the tuner's range
#[inline]
pub const fn clamp_spin_ticks(ticks: u32) -> u32 {
    if ticks < MIN_SPIN_TICKS {
        MIN_SPIN_TICKS
    } else if ticks > MAX_SPIN_TICKS {
        MAX_SPIN_TICKS
    } else {
        ticks
    }
}

/// Spin budget and the counters driving it
#[derive(Debug)]
pub struct SpinTuner {
    spin_ticks: CachePadded<AtomicU32>,
    unlock_count: CachePadded<AtomicU64>,
    wake_count: CachePadded<AtomicU32>,
}

impl SpinTuner {
    /// Tuner starting from `initial` ticks (clamped)
    pub const fn new(initial: u32) -> Self {
        Self {
            spin_ticks: CachePadded::new(AtomicU32::new(clamp_spin_ticks(initial))),
            unlock_count: CachePadded::new(AtomicU64::new(0)),
            wake_count: CachePadded::new(AtomicU32::new(0)),
        }
    }

    /// Current spin budget in ticks
    #[inline(always)]
    pub fn spin_ticks(&self) -> u32 {
        self.spin_ticks.load(Ordering::Relaxed)
    }

    /// Contended unlocks seen so far
    #[inline]
    pub fn unlock_count(&self) -> u64 {
        self.unlock_count.load(Ordering::Relaxed)
    }

    /// Wakes issued in the current window
    #[inline]
    pub fn wake_count(&self) -> u32 {
        self.wake_count.load(Ordering::Relaxed)
    }

    /// Count one contended unlock, evaluating the window when it closes
    #[inline]
    pub fn record_unlock(&self) -> Option<Adjustment> {
        let count = self.unlock_count.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if unlikely(count % u64::from(ADJUST_INTERVAL) == 0) {
            Some(self.adjust())
        } else {
            None
        }
    }

    /// Count one wake issued by an unlock
    #[inline]
    pub fn record_wake(&self) {
        self.wake_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Evaluate the current window and start a new one
    pub fn adjust(&self) -> Adjustment {
        let wakes = self.wake_count.swap(0, Ordering::Relaxed);
        let from = self.spin_ticks();

        let adjustment = if wakes > WAKE_MAX_THRESHOLD {
            let to = clamp_spin_ticks(from.saturating_add(SPIN_INCREASE_UNIT));
            Adjustment::Increased { from, to }
        } else if wakes < WAKE_MIN_THRESHOLD {
            let to = clamp_spin_ticks(from.saturating_sub(SPIN_DECREASE_UNIT));
            Adjustment::Decreased { from, to }
        } else {
            Adjustment::Unchanged(from)
        };

        match adjustment {
            Adjustment::Increased { to, .. } | Adjustment::Decreased { to, .. } => {
                self.spin_ticks.store(to, Ordering::Relaxed);
                debug!(wakes, from, to, "spin budget adjusted");
            }
            Adjustment::Unchanged(_) => {}
        }

        adjustment
    }
}

impl Default for SpinTuner {
    fn default() -> Self {
        Self::new(DEFAULT_SPIN_TICKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn run_window(tuner: &SpinTuner, wakes: u32) -> Option<Adjustment> {
        let mut last = None;
        for i in 0..ADJUST_INTERVAL {
            if i < wakes {
                tuner.record_wake();
            }
            last = tuner.record_unlock();
        }
        last
    }

    #[test]
    fn test_many_wakes_increase_by_unit() {
        let tuner = SpinTuner::default();
        let before = tuner.spin_ticks();

        let adjustment = run_window(&tuner, WAKE_MAX_THRESHOLD + 1);

        assert_eq!(
            adjustment,
            Some(Adjustment::Increased { from: before, to: before + SPIN_INCREASE_UNIT })
        );
        assert_eq!(tuner.spin_ticks(), before + SPIN_INCREASE_UNIT);
        assert_eq!(tuner.wake_count(), 0);
    }

    #[test]
    fn test_few_wakes_decrease_by_unit() {
        let tuner = SpinTuner::default();
        let before = tuner.spin_ticks();

        run_window(&tuner, WAKE_MIN_THRESHOLD - 1);

        assert_eq!(tuner.spin_ticks(), before - SPIN_DECREASE_UNIT);
    }

    #[test]
    fn test_between_thresholds_unchanged() {
        let tuner = SpinTuner::default();
        let before = tuner.spin_ticks();

        let adjustment = run_window(&tuner, WAKE_MIN_THRESHOLD);

        assert_eq!(adjustment, Some(Adjustment::Unchanged(before)));
        assert_eq!(tuner.spin_ticks(), before);
    }

    #[test]
    fn test_only_evaluates_at_window_end() {
        let tuner = SpinTuner::default();
        for _ in 0..ADJUST_INTERVAL - 1 {
            assert_eq!(tuner.record_unlock(), None);
        }
        assert!(tuner.record_unlock().is_some());
        assert_eq!(tuner.unlock_count(), u64::from(ADJUST_INTERVAL));
    }

    #[test]
    fn test_floor_holds() {
        let tuner = SpinTuner::new(MIN_SPIN_TICKS);
        for _ in 0..10 {
            tuner.adjust();
        }
        assert_eq!(tuner.spin_ticks(), MIN_SPIN_TICKS);
    }

    #[test]
    fn test_ceiling_holds() {
        let tuner = SpinTuner::new(MAX_SPIN_TICKS);
        for _ in 0..=WAKE_MAX_THRESHOLD {
            tuner.record_wake();
        }
        tuner.adjust();
        assert_eq!(tuner.spin_ticks(), MAX_SPIN_TICKS);
    }

    proptest! {
        #[test]
        fn prop_spin_ticks_stay_in_range(initial in any::<u32>(), windows in prop::collection::vec(0u32..64, 1..40)) {
            let tuner = SpinTuner::new(initial);
            for wakes in windows {
                for _ in 0..wakes {
                    tuner.record_wake();
                }
                tuner.adjust();
                let ticks = tuner.spin_ticks();
                prop_assert!(ticks >= MIN_SPIN_TICKS);
                prop_assert!(ticks <= MAX_SPIN_TICKS);
            }
        }
    }
}
