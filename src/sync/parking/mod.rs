/*!
 * Parking Primitives
 *
 * Address-based block/wake/requeue:
 * - `ParkingLotFutex`: futex semantics on every platform, with requeue
 * - `NoRequeue`: same primitive with requeue disabled
 */

mod fallback;
mod futex;
mod traits;

pub use fallback::NoRequeue;
pub use futex::ParkingLotFutex;
pub use traits::{key_of, ParkOutcome, ParkingPrimitive, RequeueResult, WakeResult};
