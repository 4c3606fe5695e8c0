/*!
 * Cycle Clock
 *
 * Spin budgets and segment durations are measured in ticks of a cheap,
 * monotonic counter rather than in loop iterations.
 *
 * - x86_64: the timestamp counter (`rdtsc`)
 * - elsewhere: nanoseconds since the first clock read
 */

use super::hints::cpu_relax;

#[cfg(not(target_arch = "x86_64"))]
use std::sync::OnceLock;
#[cfg(not(target_arch = "x86_64"))]
use std::time::Instant;

/// Current value of the tick counter
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub fn ticks() -> u64 {
    // SAFETY: rdtsc is available on every x86_64 CPU and has no side effects.
    unsafe { std::arch::x86_64::_rdtsc() }
}

/// Current value of the tick counter
#[cfg(not(target_arch = "x86_64"))]
#[inline]
pub fn ticks() -> u64 {
    static BASE: OnceLock<Instant> = OnceLock::new();
    let base = BASE.get_or_init(Instant::now);
    base.elapsed().as_nanos() as u64
}

/// Ticks elapsed since `start`, tolerant of a counter that stepped backwards
#[inline(always)]
pub fn ticks_since(start: u64) -> u64 {
    ticks().saturating_sub(start)
}

/// Spin for up to `budget` ticks, polling `attempt` on every pass
///
/// Returns `true` as soon as `attempt` succeeds, `false` once the budget is
/// spent. `attempt` runs at least once.
#[inline]
pub fn spin_for<F>(budget: u64, mut attempt: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = ticks();
    loop {
        if attempt() {
            return true;
        }
        if ticks_since(start) > budget {
            return false;
        }
        cpu_relax();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_monotonic_enough() {
        let a = ticks();
        let b = ticks();
        assert!(b >= a || ticks_since(a) == 0);
    }

    #[test]
    fn test_spin_for_succeeds_immediately() {
        let mut calls = 0;
        assert!(spin_for(1_000_000, || {
            calls += 1;
            true
        }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_spin_for_exhausts_budget() {
        let mut calls = 0u64;
        assert!(!spin_for(10_000, || {
            calls += 1;
            false
        }));
        assert!(calls >= 1);
    }

    #[test]
    fn test_spin_for_eventually_succeeds() {
        let mut calls = 0;
        assert!(spin_for(u64::MAX, || {
            calls += 1;
            calls == 50
        }));
    }
}
