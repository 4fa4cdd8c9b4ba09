//! Virtual-clock environment for deterministic simulation.
//!
//! Time only moves when a trip sleeps between condition polls (or when a
//! test calls [`SimEnv::advance`]). A ten second timeout therefore runs in
//! microseconds and produces the same poll count on every run.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use transit_core::Environment;

/// Simulation environment with a shared virtual clock.
///
/// Clones share the clock, so an application simulator and the trip engine
/// observe the same time.
#[derive(Debug, Clone, Default)]
pub struct SimEnv {
    now: Arc<Mutex<Duration>>,
}

impl SimEnv {
    /// Create an environment whose clock starts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward without suspending.
    pub fn advance(&self, duration: Duration) {
        *self.lock() += duration;
    }

    /// Virtual time elapsed since the environment was created.
    pub fn elapsed(&self) -> Duration {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Duration> {
        self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    type Instant = Duration;

    fn now(&self) -> Self::Instant {
        self.elapsed()
    }

    /// Advances the clock, then yields once so other tasks on the runtime
    /// (concurrent readers, test observers) get a turn.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        tokio::task::yield_now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleep_advances_virtual_time() {
        let env = SimEnv::new();
        let start = env.now();

        env.sleep(Duration::from_secs(10)).await;

        assert_eq!(env.elapsed_since(start), Duration::from_secs(10));
    }

    #[test]
    fn clones_share_the_clock() {
        let env = SimEnv::new();
        let observer = env.clone();

        env.advance(Duration::from_millis(250));

        assert_eq!(observer.elapsed(), Duration::from_millis(250));
    }
}
