/*!
 * Lock Tuning Limits and Constants
 *
 * Centralized location for every threshold the hybrid mutex, the spin tuner
 * and the segment tracker read. All values are compile-time configuration.
 *
 * ## Units
 * - `*_TICKS` values are cycle-counter ticks (see `core::clock`)
 * - `*_WAIT_TIME` and `*_ADJUST_UNIT` values are nanoseconds of block timeout
 * - Performance-critical constants are marked with [PERF]
 */

// =============================================================================
// MUTEX SPINNING
// =============================================================================

/// Initial spin budget of a freshly created mutex
/// [PERF] Roughly a few microseconds on current x86 parts
pub const DEFAULT_SPIN_TICKS: u32 = 8192;

/// Lower bound of the tuned spin budget
/// The tuner subtracts `SPIN_DECREASE_UNIT`; the budget never reaches zero
pub const MIN_SPIN_TICKS: u32 = 256;

/// Upper bound of the tuned spin budget and of the per-call backoff doubling
pub const MAX_SPIN_TICKS: u32 = 1 << 22;

/// Busy iterations between clearing `locked` and deciding to wake a waiter
/// [PERF] Gives a spinner the chance to grab the lock so no wake is needed
pub const UNLOCK_DELAY_SPINS: u32 = 128;

// =============================================================================
// SPIN TUNER
// =============================================================================

/// Contended unlocks between two tuner evaluations
pub const ADJUST_INTERVAL: u32 = 2047;

/// More wakes than this in one window: spin longer
pub const WAKE_MAX_THRESHOLD: u32 = 32;

/// Fewer wakes than this in one window: spin shorter
pub const WAKE_MIN_THRESHOLD: u32 = 16;

/// Spin budget growth step
pub const SPIN_INCREASE_UNIT: u32 = 512;

/// Spin budget shrink step
pub const SPIN_DECREASE_UNIT: u32 = 256;

// =============================================================================
// SEGMENTS
// =============================================================================

/// Block timeout a segment starts with
pub const DEFAULT_WAIT_TIME: u64 = 10_000;

/// Floor of a segment's block timeout
pub const MIN_WAIT_TIME: u64 = 10_000;

/// Adjustment step a segment starts with
pub const DEFAULT_ADJUST_UNIT: u64 = 5_000;

/// Floor of the adjustment step after a halving
pub const MIN_ADJUST_UNIT: u64 = 1_000;

/// After a halving, the step becomes `wait_time / ADJUST_UNIT_DIVISOR`
pub const ADJUST_UNIT_DIVISOR: u64 = 99;

/// Required latencies below this reset the window straight to the floor
pub const SEGMENT_REQ_THRESHOLD: u64 = 100;

/// Number of distinct segment ids per thread
pub const MAX_SEGMENTS: usize = 256;

/// Maximum nesting depth of segments on one thread
pub const MAX_SEGMENT_DEPTH: usize = 30;

// =============================================================================
// PROCESS
// =============================================================================

/// Threads that may register through `thread_start` over the process lifetime
pub const MAX_THREADS: usize = 1024;

/// Cache line size used for padding
/// [PERF] Matches the `align(64)` attributes on hot structures
pub const CACHE_LINE_SIZE: usize = 64;
