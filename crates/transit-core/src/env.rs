//! Environment abstraction for deterministic testing.
//!
//! Decouples trip timing from the system clock. Trips measure their bounded
//! wait with [`Environment::now`] and suspend between condition polls with
//! [`Environment::sleep`], so the same engine runs against real time
//! ([`crate::SystemEnv`]) and against a virtual clock in simulation.

use std::time::Duration;

/// Abstract environment providing time and the suspension primitive.
///
/// # Invariants
///
/// Implementations MUST guarantee that `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// Subsequent calls must return times >= previous calls.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it is the only place a
    /// trip suspends: between two rounds of condition checks.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Time elapsed since `earlier`.
    fn elapsed_since(&self, earlier: Self::Instant) -> Duration {
        self.now() - earlier
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Virtual clock for unit tests: sleeping advances time instantly.
    #[derive(Clone, Default)]
    pub(crate) struct TestEnv {
        now: Arc<Mutex<Duration>>,
    }

    impl Environment for TestEnv {
        type Instant = Duration;

        fn now(&self) -> Duration {
            *self.now.lock().unwrap()
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            *self.now.lock().unwrap() += duration;
            async {}
        }
    }
}
