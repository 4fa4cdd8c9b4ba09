//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must always hold during a test run.
//! Unlike example-based tests that check specific scenarios, invariants
//! verify behavioral properties across all possible trip sequences.
//!
//! # Architecture
//!
//! Invariants run against a [`TrafficSnapshot`] taken from the registry, so
//! a check sees one consistent instant even while a trip is in flight.
//! Violations carry enough context to debug without re-running.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.check_all(&traffic.snapshot())?;
//! ```

mod checks;

pub use checks::{
    ActiveStationLive, FacilitiesFinishBeforeOwner, FacilityRequiresActiveOwner, PhaseProgression,
    SingleActiveStation,
};
use transit_core::TrafficSnapshot;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against registry state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &TrafficSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard station/facility invariants.
    ///
    /// Includes:
    /// - [`SingleActiveStation`]: at most one station is `ACTIVE`
    /// - [`FacilityRequiresActiveOwner`]: active facility implies active owner
    /// - [`PhaseProgression`]: the journal only ever steps one phase forward
    /// - [`FacilitiesFinishBeforeOwner`]: facilities finish before their
    ///   station
    /// - [`ActiveStationLive`]: the active reference points at a live station
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(SingleActiveStation);
        registry.add(FacilityRequiresActiveOwner);
        registry.add(PhaseProgression);
        registry.add(FacilitiesFinishBeforeOwner);
        registry.add(ActiveStationLive);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &TrafficSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    #[allow(clippy::panic, reason = "assertion helper for test bodies")]
    pub fn assert_all(&self, state: &TrafficSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!(
                "Invariant violation {context}:\n  {}\n{}",
                messages.join("\n  "),
                state.render_station_list()
            );
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
