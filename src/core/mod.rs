/*!
 * Core Module
 * Fundamental types, limits, clock and error handling
 */

pub mod clock;
pub mod errors;
pub mod hints;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use hints::*;
pub use types::*;
