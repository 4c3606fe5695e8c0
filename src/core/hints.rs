/*!
 * Compiler and CPU Hints
 * Branch prediction hints and busy-wait helpers for the lock hot paths
 */

use std::sync::atomic::{compiler_fence, Ordering};

/// Hint to the compiler that this branch is likely to be taken
///
/// Used on the uncontended lock/unlock fast paths.
///
/// # Implementation
/// On nightly with core_intrinsics, uses LLVM's `llvm.expect` intrinsic.
/// On stable, returns the value unchanged.
#[inline(always)]
#[must_use]
pub fn likely(b: bool) -> bool {
    #[cfg(feature = "nightly")]
    {
        ::core::intrinsics::likely(b)
    }
    #[cfg(not(feature = "nightly"))]
    {
        b
    }
}

/// Hint to the compiler that this branch is unlikely to be taken
///
/// Used for the periodic tuner evaluation and for the fatal paths.
#[inline(always)]
#[must_use]
pub fn unlikely(b: bool) -> bool {
    #[cfg(feature = "nightly")]
    {
        ::core::intrinsics::unlikely(b)
    }
    #[cfg(not(feature = "nightly"))]
    {
        b
    }
}

/// One iteration of a busy-wait loop (`pause` on x86)
#[inline(always)]
pub fn cpu_relax() {
    std::hint::spin_loop();
}

/// Burn `iterations` loop turns without touching shared memory
///
/// The compiler fence keeps the loop from being folded away.
#[inline]
pub fn delay_spins(iterations: u32) {
    for _ in 0..iterations {
        compiler_fence(Ordering::SeqCst);
        cpu_relax();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_likely() {
        assert!(likely(true));
        assert!(!likely(false));
    }

    #[test]
    fn test_unlikely() {
        assert!(unlikely(true));
        assert!(!unlikely(false));
    }

    #[test]
    fn test_delay_spins_returns() {
        delay_spins(0);
        delay_spins(128);
    }
}
