//! Time abstraction for platform-agnostic interval gating.

use std::time::Duration;

/// Trait for abstracting the dispatcher's sleep between publishes.
///
/// Production code uses [`SystemClock`]; tests substitute a mock that advances
/// virtual time instead of blocking.
pub trait Clock {
    /// Blocks the calling thread for the given duration.
    fn sleep(&self, duration: Duration);
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
