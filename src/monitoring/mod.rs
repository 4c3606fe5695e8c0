/*!
 * Lock Monitoring
 * Contention counters and tracing setup
 */

pub mod counters;
mod tracer;

pub use counters::ContentionSnapshot;
pub use tracer::{init_tracing, span_segment, SegmentSpan};
