/*!
 * Requeue-Less Parking
 *
 * Wraps a primitive and hides its requeue support, so broadcast falls back
 * to waking every waiter and letting them race for the mutex.
 */

use super::traits::{ParkOutcome, ParkingPrimitive, WakeResult};
use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Primitive `P` without requeue
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRequeue<P>(pub P);

impl<P: ParkingPrimitive> ParkingPrimitive for NoRequeue<P> {
    const INIT: Self = NoRequeue(P::INIT);

    #[inline]
    fn wait(&self, word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> ParkOutcome {
        self.0.wait(word, expected, timeout)
    }

    #[inline]
    fn wake(&self, key: usize, count: usize) -> WakeResult {
        self.0.wake(key, count)
    }

    fn name(&self) -> &'static str {
        "no-requeue"
    }
}
