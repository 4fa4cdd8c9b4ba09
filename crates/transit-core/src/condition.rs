//! Conditions and the bounded wait that polls them.
//!
//! A [`Condition`] is the only thing the core knows about the application
//! under test: a description and a check that reports whether the condition
//! currently holds. How the check inspects the application is up to the
//! implementation.
//!
//! `ConditionWaiter` polls a set of conditions cooperatively until all of
//! them have been observed satisfied, the time bound elapses, or the
//! cancellation token fires. A condition observed satisfied once is not
//! checked again.

use std::{fmt, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{env::Environment, error::TransitError};

/// Shared handle to a condition.
pub type SharedCondition = Arc<dyn Condition>;

/// A check against the application under test.
pub trait Condition: Send + Sync {
    /// Human-readable description used in diagnostics.
    fn description(&self) -> String;

    /// Evaluate the condition once.
    fn check(&self) -> ConditionStatus;
}

/// Outcome of a single condition check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionStatus {
    satisfied: bool,
    message: Option<String>,
}

impl ConditionStatus {
    /// Condition holds.
    pub fn fulfilled() -> Self {
        Self { satisfied: true, message: None }
    }

    /// Condition does not hold yet.
    pub fn not_fulfilled() -> Self {
        Self { satisfied: false, message: None }
    }

    /// Condition holds, with detail for diagnostics.
    pub fn fulfilled_with(message: impl Into<String>) -> Self {
        Self { satisfied: true, message: Some(message.into()) }
    }

    /// Condition does not hold yet, with detail for diagnostics.
    pub fn not_fulfilled_with(message: impl Into<String>) -> Self {
        Self { satisfied: false, message: Some(message.into()) }
    }

    /// Whether the condition holds.
    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    /// Optional detail message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl From<bool> for ConditionStatus {
    fn from(satisfied: bool) -> Self {
        Self { satisfied, message: None }
    }
}

struct FnCondition<F> {
    description: String,
    check: F,
}

impl<F> Condition for FnCondition<F>
where
    F: Fn() -> bool + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn check(&self) -> ConditionStatus {
        (self.check)().into()
    }
}

/// Adapt a boolean closure into a condition.
pub fn from_fn<F>(description: impl Into<String>, check: F) -> SharedCondition
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    Arc::new(FnCondition { description: description.into(), check })
}

/// Which side of a transition a condition guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionRole {
    /// Must hold before the owning state becomes active.
    Enter,
    /// Must hold before the owning state is finished.
    Exit,
}

impl fmt::Display for ConditionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enter => "enter",
            Self::Exit => "exit",
        })
    }
}

/// What the waiter observed about one condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionReport {
    /// State that declared the condition, e.g. `<S2: Results>`.
    pub owner: String,
    /// Entry or exit condition.
    pub role: ConditionRole,
    /// Condition description.
    pub description: String,
    /// Number of times the condition was checked.
    pub checks: u32,
    /// Message from the most recent check, if any.
    pub last_message: Option<String>,
    /// Time from the start of the wait until first observed satisfied.
    pub satisfied_after: Option<Duration>,
}

impl ConditionReport {
    /// Whether the condition was observed satisfied.
    pub fn is_satisfied(&self) -> bool {
        self.satisfied_after.is_some()
    }
}

impl fmt::Display for ConditionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {} [checks: {}", self.owner, self.role, self.description, self.checks)?;
        if let Some(message) = &self.last_message {
            write!(f, ", last: {message}")?;
        }
        if let Some(after) = self.satisfied_after {
            write!(f, ", satisfied after {after:?}")?;
        }
        f.write_str("]")
    }
}

/// A condition queued for a wait, tagged with its declaring state.
pub(crate) struct PendingCondition {
    condition: SharedCondition,
    report: ConditionReport,
}

impl PendingCondition {
    pub(crate) fn new(owner: String, role: ConditionRole, condition: SharedCondition) -> Self {
        let report = ConditionReport {
            owner,
            role,
            description: condition.description(),
            checks: 0,
            last_message: None,
            satisfied_after: None,
        };
        Self { condition, report }
    }
}

/// Result of a wait in which every condition was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Total time spent waiting.
    pub elapsed: Duration,
    /// Number of polling rounds.
    pub polls: u32,
    /// Per-condition observations, in declaration order.
    pub reports: Vec<ConditionReport>,
}

/// Bounded, cooperative poll loop over a set of conditions.
pub(crate) struct ConditionWaiter<'a, E: Environment> {
    env: &'a E,
    timeout: Duration,
    poll_interval: Duration,
    cancel: Option<&'a CancellationToken>,
}

impl<'a, E: Environment> ConditionWaiter<'a, E> {
    pub(crate) fn new(env: &'a E, timeout: Duration, poll_interval: Duration) -> Self {
        Self { env, timeout, poll_interval, cancel: None }
    }

    pub(crate) fn with_cancellation(mut self, token: Option<&'a CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    /// Poll until every condition has been observed satisfied.
    ///
    /// The first round runs immediately. Suspension happens only in
    /// [`Environment::sleep`] between rounds.
    ///
    /// # Errors
    ///
    /// - `TransitError::TransitionTimeout` if the bound elapses first
    /// - `TransitError::Cancelled` if the token fires first
    pub(crate) async fn wait(
        &self,
        mut pending: Vec<PendingCondition>,
    ) -> Result<WaitOutcome, TransitError> {
        let start = self.env.now();
        let mut polls = 0u32;

        loop {
            polls += 1;
            let elapsed = self.env.elapsed_since(start);

            for entry in pending.iter_mut().filter(|p| !p.report.is_satisfied()) {
                let status = entry.condition.check();
                entry.report.checks += 1;
                entry.report.last_message = status.message().map(str::to_string);
                if status.is_satisfied() {
                    entry.report.satisfied_after = Some(elapsed);
                    tracing::trace!(condition = %entry.report.description, ?elapsed, "condition satisfied");
                }
            }

            if pending.iter().all(|p| p.report.is_satisfied()) {
                let reports = pending.into_iter().map(|p| p.report).collect();
                return Ok(WaitOutcome { elapsed, polls, reports });
            }

            if elapsed >= self.timeout {
                return Err(TransitError::TransitionTimeout {
                    elapsed,
                    unsatisfied: unsatisfied(pending),
                });
            }

            if self.cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(TransitError::Cancelled { elapsed, unsatisfied: unsatisfied(pending) });
            }

            let remaining = self.timeout - elapsed;
            self.env.sleep(self.poll_interval.min(remaining)).await;
        }
    }
}

fn unsatisfied(pending: Vec<PendingCondition>) -> Vec<ConditionReport> {
    pending.into_iter().map(|p| p.report).filter(|r| !r.is_satisfied()).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::env::testing::TestEnv;

    fn counting(description: &str, ready_after: u32) -> (SharedCondition, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let condition =
            from_fn(description, move || counter.fetch_add(1, Ordering::SeqCst) + 1 >= ready_after);
        (condition, calls)
    }

    fn pending(condition: SharedCondition) -> PendingCondition {
        PendingCondition::new("<S1: Home>".into(), ConditionRole::Enter, condition)
    }

    #[tokio::test]
    async fn satisfied_conditions_are_not_rechecked() {
        let env = TestEnv::default();
        let (fast, fast_calls) = counting("fast", 1);
        let (slow, slow_calls) = counting("slow", 4);

        let waiter =
            ConditionWaiter::new(&env, Duration::from_secs(1), Duration::from_millis(10));
        let outcome = waiter.wait(vec![pending(fast), pending(slow)]).await.unwrap();

        assert_eq!(fast_calls.load(Ordering::SeqCst), 1);
        assert_eq!(slow_calls.load(Ordering::SeqCst), 4);
        assert_eq!(outcome.polls, 4);
        assert_eq!(outcome.elapsed, Duration::from_millis(30));
        assert_eq!(outcome.reports[0].satisfied_after, Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn empty_wait_succeeds_immediately() {
        let env = TestEnv::default();
        let waiter = ConditionWaiter::new(&env, Duration::ZERO, Duration::from_millis(10));

        let outcome = waiter.wait(Vec::new()).await.unwrap();
        assert_eq!(outcome.polls, 1);
        assert_eq!(outcome.elapsed, Duration::ZERO);
    }

    #[tokio::test]
    async fn timeout_lists_only_unsatisfied_conditions() {
        let env = TestEnv::default();
        let ready = from_fn("ready", || true);
        let never = from_fn("never", || false);

        let waiter =
            ConditionWaiter::new(&env, Duration::from_millis(100), Duration::from_millis(30));
        let err = waiter.wait(vec![pending(ready), pending(never)]).await.unwrap_err();

        match err {
            TransitError::TransitionTimeout { elapsed, unsatisfied } => {
                assert_eq!(elapsed, Duration::from_millis(100));
                assert_eq!(unsatisfied.len(), 1);
                assert_eq!(unsatisfied[0].description, "never");
                assert_eq!(unsatisfied[0].checks, 5);
            },
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_token_ends_the_wait() {
        let env = TestEnv::default();
        let token = CancellationToken::new();
        token.cancel();

        let waiter = ConditionWaiter::new(&env, Duration::from_secs(5), Duration::from_millis(10))
            .with_cancellation(Some(&token));
        let err = waiter.wait(vec![pending(from_fn("never", || false))]).await.unwrap_err();

        assert!(matches!(err, TransitError::Cancelled { elapsed: Duration::ZERO, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn report_rendering_includes_last_message() {
        let report = ConditionReport {
            owner: "<S2: Results>".into(),
            role: ConditionRole::Enter,
            description: "results list shown".into(),
            checks: 3,
            last_message: Some("list empty".into()),
            satisfied_after: None,
        };
        insta::assert_snapshot!(
            report.to_string(),
            @"<S2: Results> enter: results list shown [checks: 3, last: list empty]"
        );
    }
}
