//! Production Environment implementation using the system clock.
//!
//! `SystemEnv` measures trip waits with `std::time::Instant` and suspends on
//! the tokio timer. Use it when driving a real application; simulation tests
//! use a virtual clock instead.

use std::time::Duration;

use crate::env::Environment;

/// Environment backed by real monotonic time and `tokio::time::sleep()`.
///
/// Must be used from within a tokio runtime with the time driver enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
