//! Error types for the transit core.
//!
//! Two classes, told apart by [`TransitError::is_misuse`] and
//! [`TransitError::is_transient`]:
//!
//! - Misuse: out-of-order phase transitions, facilities on inactive stations,
//!   duplicate activation. These are bugs in test code or framework usage and
//!   must fail the run immediately; retrying cannot help.
//! - Timing: the awaited conditions were not all observed in time (or the
//!   wait was cancelled). The application may just be slow; whether to retry
//!   is the caller's decision.

use std::{fmt::Write as _, time::Duration};

use thiserror::Error;

use crate::{
    condition::ConditionReport,
    phase::Phase,
    station::{FacilityId, StateRef, StationId},
};

/// Errors raised by phase transitions, the registry and trips.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitError {
    /// Requested phase is not the immediate successor of the current one
    #[error("invalid phase transition: {state} cannot move from {from} to {to}")]
    InvalidPhaseTransition {
        /// State that was asked to transition
        state: StateRef,
        /// Phase it is in
        from: Phase,
        /// Phase that was requested
        to: Phase,
    },

    /// Phase advance requested before its conditions were recorded satisfied
    #[error("{state} cannot become {phase}: its conditions were not observed satisfied")]
    ConditionsUnmet {
        /// State that was asked to transition
        state: StateRef,
        /// Phase that was requested
        phase: Phase,
    },

    /// Facility created or entered while its owner is not active
    #[error("facility {facility} requires owner {owner} to be active, but it is {phase}")]
    OwnerNotActive {
        /// Facility being created or entered
        facility: String,
        /// Owning station
        owner: StationId,
        /// Owner's phase
        phase: Phase,
    },

    /// Facility used with a station that does not own it
    #[error("facility {facility} belongs to {owner}, not {station}")]
    FacilityOwnerMismatch {
        /// Facility in question
        facility: FacilityId,
        /// Its real owner
        owner: StationId,
        /// Station it was used with
        station: StationId,
    },

    /// The registry's active station would be reassigned to itself
    #[error("station {station} is already the active station")]
    DuplicateActivation {
        /// Station already active
        station: StationId,
    },

    /// Trip origin is not the registry's active, `ACTIVE` station
    #[error("trip origin {station} is not active: registry points at {active:?}, phase {phase}")]
    OriginNotActive {
        /// Station that was expected to be the origin
        station: StationId,
        /// Registry's active station
        active: Option<StationId>,
        /// Phase of `station`
        phase: Phase,
    },

    /// Another trip reassigned the active station while this one waited
    #[error("active station changed during trip: expected {expected:?}, found {active:?}")]
    ActiveStationChanged {
        /// Active station when the trip departed
        expected: Option<StationId>,
        /// Active station at commit
        active: Option<StationId>,
    },

    /// Reference to a state the registry never created
    #[error("unknown state {0}")]
    UnknownState(StateRef),

    /// Awaited conditions not satisfied within the bound
    #[error("transition timed out after {elapsed:?}; unsatisfied conditions:{}", render(.unsatisfied))]
    TransitionTimeout {
        /// How long we waited
        elapsed: Duration,
        /// Conditions never observed satisfied
        unsatisfied: Vec<ConditionReport>,
    },

    /// Wait abandoned through its cancellation token
    #[error("transition cancelled after {elapsed:?}; unsatisfied conditions:{}", render(.unsatisfied))]
    Cancelled {
        /// How long we waited
        elapsed: Duration,
        /// Conditions never observed satisfied
        unsatisfied: Vec<ConditionReport>,
    },
}

impl TransitError {
    /// Returns true if this error is a timing failure that may succeed on
    /// retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransitionTimeout { .. } | Self::Cancelled { .. })
    }

    /// Returns true if this error indicates a bug in test or framework code.
    pub fn is_misuse(&self) -> bool {
        !self.is_transient()
    }

    /// Conditions still pending when a wait ended. Empty for misuse errors.
    pub fn unsatisfied(&self) -> &[ConditionReport] {
        match self {
            Self::TransitionTimeout { unsatisfied, .. } | Self::Cancelled { unsatisfied, .. } => {
                unsatisfied
            },
            _ => &[],
        }
    }
}

fn render(reports: &[ConditionReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let _ = write!(out, "\n  - {report}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionRole;

    #[test]
    fn timeout_errors_are_transient() {
        assert!(
            TransitError::TransitionTimeout { elapsed: Duration::from_secs(10), unsatisfied: vec![] }
                .is_transient()
        );

        assert!(TransitError::Cancelled { elapsed: Duration::ZERO, unsatisfied: vec![] }
            .is_transient());
    }

    #[test]
    fn framework_misuse_is_fatal() {
        assert!(
            TransitError::InvalidPhaseTransition {
                state: StateRef::Station(StationId(1)),
                from: Phase::New,
                to: Phase::Active,
            }
            .is_misuse()
        );

        assert!(
            TransitError::OwnerNotActive {
                facility: "SearchBar".into(),
                owner: StationId(1),
                phase: Phase::Finished,
            }
            .is_misuse()
        );

        assert!(TransitError::DuplicateActivation { station: StationId(2) }.is_misuse());
        assert!(
            TransitError::ActiveStationChanged { expected: None, active: Some(StationId(1)) }
                .is_misuse()
        );
        assert!(TransitError::UnknownState(StateRef::Facility(FacilityId(9))).is_misuse());
    }

    #[test]
    fn timeout_message_lists_pending_conditions() {
        let err = TransitError::TransitionTimeout {
            elapsed: Duration::from_secs(10),
            unsatisfied: vec![ConditionReport {
                owner: "<S2: Results>".into(),
                role: ConditionRole::Enter,
                description: "results shown".into(),
                checks: 200,
                last_message: None,
                satisfied_after: None,
            }],
        };

        assert_eq!(
            err.to_string(),
            "transition timed out after 10s; unsatisfied conditions:\n  - <S2: Results> enter: \
             results shown [checks: 200]"
        );
        assert_eq!(err.unsatisfied().len(), 1);
    }
}
