/*!
 * Error Types
 * Lock and condition-variable errors with thiserror, miette and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export SegmentError from the segment module
pub use crate::segment::SegmentError;

/// POSIX `EBUSY`
pub const EBUSY: i32 = 16;
/// POSIX `EINVAL`
pub const EINVAL: i32 = 22;
/// POSIX `ETIMEDOUT`
pub const ETIMEDOUT: i32 = 110;

/// Errors surfaced by mutex and condition-variable operations
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum LockError {
    #[error("Lock is held by another thread")]
    #[diagnostic(
        code(lock::busy),
        help("try_lock never waits. Call lock() to block until the holder releases it.")
    )]
    Busy,

    #[error("Invalid argument")]
    #[diagnostic(
        code(lock::invalid_argument),
        help("A condition variable stays bound to the first mutex it waited with.")
    )]
    InvalidArgument,

    #[error("Timed wait reached its deadline")]
    #[diagnostic(
        code(lock::timed_out),
        help("The mutex has been reacquired. Re-check the predicate before waiting again.")
    )]
    TimedOut,
}

impl LockError {
    /// errno value a pthread shim returns for this error
    pub const fn errno(self) -> i32 {
        match self {
            LockError::Busy => EBUSY,
            LockError::InvalidArgument => EINVAL,
            LockError::TimedOut => ETIMEDOUT,
        }
    }
}

/// Result type for lock operations
pub type LockResult<T> = std::result::Result<T, LockError>;

/// Map a lock result onto the 0-or-errno convention of the pthread API
pub fn to_errno(result: LockResult<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => err.errno(),
    }
}

/// Abort the process after logging `reason`
///
/// Used where a fixed-size per-thread or per-process table overflows. There
/// is no degraded mode to fall back to.
#[cold]
pub fn fatal(reason: &str) -> ! {
    tracing::error!(reason, "fatal lock runtime error, aborting");
    eprintln!("adaptive-lock: {reason}");
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(LockError::Busy.errno(), EBUSY);
        assert_eq!(LockError::InvalidArgument.errno(), EINVAL);
        assert_eq!(LockError::TimedOut.errno(), ETIMEDOUT);
    }

    #[test]
    fn test_to_errno() {
        assert_eq!(to_errno(Ok(())), 0);
        assert_eq!(to_errno(Err(LockError::TimedOut)), ETIMEDOUT);
    }

    #[test]
    fn test_lock_error_display() {
        assert_eq!(LockError::Busy.to_string(), "Lock is held by another thread");
        assert_eq!(LockError::InvalidArgument.to_string(), "Invalid argument");
    }

    #[test]
    fn test_lock_error_serialization() {
        let json = serde_json::to_string(&LockError::TimedOut).unwrap();
        assert!(json.contains("timed_out"));

        let back: LockError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LockError::TimedOut);
    }
}
