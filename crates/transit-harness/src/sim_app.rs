//! Scripted application under test.
//!
//! `SimApp` stands in for a real UI: it has a current screen and a set of
//! visible elements, and changes to them are scheduled to land after a delay
//! in virtual time. Trip triggers schedule the changes; conditions built from
//! the app observe them once the clock has moved far enough.
//!
//! ```text
//! trigger ──> navigate_after(120ms, "Results")
//!                    │
//!   t=0    t=50    t=100   t=150
//!   Home   Home    Home    Results   <- screen_is("Results") satisfied here
//! ```

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use transit_core::{Condition, ConditionStatus, Environment, SharedCondition};

use crate::sim_env::SimEnv;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Change {
    Screen(String),
    Show(String),
    Hide(String),
}

#[derive(Debug, Default)]
struct AppState {
    screen: Option<String>,
    elements: BTreeSet<String>,
    /// Scheduled changes as (due time, change), in scheduling order.
    scheduled: Vec<(Duration, Change)>,
}

impl AppState {
    fn settle(&mut self, now: Duration) {
        let (mut due, later): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.scheduled).into_iter().partition(|(at, _)| *at <= now);
        self.scheduled = later;
        due.sort_by_key(|(at, _)| *at);

        for (_, change) in due {
            match change {
                Change::Screen(screen) => {
                    tracing::trace!(%screen, ?now, "sim app screen changed");
                    self.screen = Some(screen);
                    self.elements.clear();
                },
                Change::Show(element) => {
                    self.elements.insert(element);
                },
                Change::Hide(element) => {
                    self.elements.remove(&element);
                },
            }
        }
    }
}

/// Simulated application sharing a [`SimEnv`] clock.
///
/// Cheap to clone; clones drive the same application.
#[derive(Debug, Clone)]
pub struct SimApp {
    env: SimEnv,
    state: Arc<Mutex<AppState>>,
}

impl SimApp {
    /// Create an app with no screen shown yet.
    pub fn new(env: SimEnv) -> Self {
        Self { env, state: Arc::default() }
    }

    /// Switch to `screen` after `delay`. Switching clears visible elements.
    pub fn navigate_after(&self, delay: Duration, screen: &str) {
        self.schedule(delay, Change::Screen(screen.to_string()));
    }

    /// Make `element` visible after `delay`.
    pub fn show_after(&self, delay: Duration, element: &str) {
        self.schedule(delay, Change::Show(element.to_string()));
    }

    /// Remove `element` after `delay`.
    pub fn hide_after(&self, delay: Duration, element: &str) {
        self.schedule(delay, Change::Hide(element.to_string()));
    }

    /// Current screen, after applying every change that is due.
    pub fn screen(&self) -> Option<String> {
        self.settled().screen.clone()
    }

    /// Whether `element` is visible now.
    pub fn is_shown(&self, element: &str) -> bool {
        self.settled().elements.contains(element)
    }

    /// Condition: the app shows `screen`.
    pub fn screen_is(&self, screen: &str) -> SharedCondition {
        Arc::new(AppCondition { app: self.clone(), check: Check::Screen(screen.to_string()) })
    }

    /// Condition: `element` is visible.
    pub fn element_shown(&self, element: &str) -> SharedCondition {
        Arc::new(AppCondition { app: self.clone(), check: Check::Shown(element.to_string()) })
    }

    /// Condition: `element` is not visible.
    pub fn element_gone(&self, element: &str) -> SharedCondition {
        Arc::new(AppCondition { app: self.clone(), check: Check::Gone(element.to_string()) })
    }

    fn schedule(&self, delay: Duration, change: Change) {
        let at = self.env.now() + delay;
        self.lock().scheduled.push((at, change));
    }

    fn settled(&self) -> MutexGuard<'_, AppState> {
        let mut state = self.lock();
        state.settle(self.env.now());
        state
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
enum Check {
    Screen(String),
    Shown(String),
    Gone(String),
}

#[derive(Debug)]
struct AppCondition {
    app: SimApp,
    check: Check,
}

impl Condition for AppCondition {
    fn description(&self) -> String {
        match &self.check {
            Check::Screen(screen) => format!("screen is {screen}"),
            Check::Shown(element) => format!("{element} shown"),
            Check::Gone(element) => format!("{element} gone"),
        }
    }

    fn check(&self) -> ConditionStatus {
        match &self.check {
            Check::Screen(expected) => match self.app.screen() {
                Some(actual) if actual == *expected => ConditionStatus::fulfilled(),
                Some(actual) => ConditionStatus::not_fulfilled_with(format!("on {actual}")),
                None => ConditionStatus::not_fulfilled_with("no screen"),
            },
            Check::Shown(element) => self.app.is_shown(element).into(),
            Check::Gone(element) => (!self.app.is_shown(element)).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_land_when_due() {
        let env = SimEnv::new();
        let app = SimApp::new(env.clone());
        app.navigate_after(Duration::ZERO, "Home");
        app.navigate_after(Duration::from_millis(120), "Results");

        assert_eq!(app.screen().as_deref(), Some("Home"));
        env.advance(Duration::from_millis(100));
        assert_eq!(app.screen().as_deref(), Some("Home"));
        env.advance(Duration::from_millis(20));
        assert_eq!(app.screen().as_deref(), Some("Results"));
    }

    #[test]
    fn navigation_clears_elements() {
        let env = SimEnv::new();
        let app = SimApp::new(env.clone());
        app.show_after(Duration::ZERO, "SearchBar");
        assert!(app.is_shown("SearchBar"));

        app.navigate_after(Duration::from_millis(10), "Results");
        env.advance(Duration::from_millis(10));
        assert!(!app.is_shown("SearchBar"));
    }

    #[test]
    fn screen_condition_reports_current_screen() {
        let env = SimEnv::new();
        let app = SimApp::new(env.clone());
        let on_results = app.screen_is("Results");

        assert_eq!(on_results.check().message(), Some("no screen"));
        app.navigate_after(Duration::ZERO, "Home");
        assert_eq!(on_results.check().message(), Some("on Home"));
        app.navigate_after(Duration::ZERO, "Results");
        assert!(on_results.check().is_satisfied());
        assert_eq!(on_results.description(), "screen is Results");
    }
}
