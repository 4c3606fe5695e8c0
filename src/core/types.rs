/*!
 * Core Types
 * Common types used across the lock runtime
 */

use std::ops::Deref;

/// Identifier of a latency segment (index into the per-thread table)
pub type SegmentId = usize;

/// Dense per-process thread identifier assigned by `thread_start`
pub type ThreadId = usize;

/// Opaque caller-visible lock handle (typically the address of a `pthread_mutex_t`)
pub type Handle = usize;

/// Cycle-counter ticks
pub type Ticks = u64;

/// Value padded and aligned to its own cache line
///
/// Keeps independently written counters from sharing a line with the lock
/// word they sit next to.
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    /// Wrap `value`
    #[inline]
    pub const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::limits::CACHE_LINE_SIZE;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_cache_padded_layout() {
        assert_eq!(std::mem::align_of::<CachePadded<AtomicU32>>(), CACHE_LINE_SIZE);
        assert_eq!(std::mem::size_of::<CachePadded<AtomicU32>>(), CACHE_LINE_SIZE);
    }

    #[test]
    fn test_cache_padded_deref() {
        let padded = CachePadded::new(5u32);
        assert_eq!(*padded, 5);
    }
}
