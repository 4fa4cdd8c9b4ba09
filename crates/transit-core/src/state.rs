//! Phase machine shared by every tracked state.
//!
//! A [`ConditionalState`] records its phase, its declared entry and exit
//! conditions, and whether those conditions were observed satisfied. It does
//! not evaluate conditions itself; the trip engine does that and records the
//! result here before advancing the phase.
//!
//! Transitions are crate-internal. Each one requires the current phase to be
//! the immediate predecessor of the requested one; anything else is a
//! framework or test-code bug and surfaces as
//! [`TransitError::InvalidPhaseTransition`].

use std::fmt;

use crate::{condition::SharedCondition, error::TransitError, phase::Phase, station::StateRef};

/// Tracked state with a forward-only phase lifecycle.
pub struct ConditionalState {
    id: StateRef,
    name: String,
    phase: Phase,
    enter_conditions: Vec<SharedCondition>,
    exit_conditions: Vec<SharedCondition>,
    entry_met: bool,
    exit_met: bool,
}

impl ConditionalState {
    /// Create a state in [`Phase::New`].
    pub(crate) fn new(
        id: StateRef,
        name: String,
        enter_conditions: Vec<SharedCondition>,
        exit_conditions: Vec<SharedCondition>,
    ) -> Self {
        Self {
            id,
            name,
            phase: Phase::New,
            enter_conditions,
            exit_conditions,
            entry_met: false,
            exit_met: false,
        }
    }

    /// Identity of this state.
    pub fn id(&self) -> StateRef {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current phase. No side effects.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Declared entry conditions, in declaration order.
    pub fn enter_conditions(&self) -> &[SharedCondition] {
        &self.enter_conditions
    }

    /// Declared exit conditions, in declaration order.
    pub fn exit_conditions(&self) -> &[SharedCondition] {
        &self.exit_conditions
    }

    /// Record that every entry condition was observed satisfied.
    pub(crate) fn mark_entry_conditions_met(&mut self) {
        self.entry_met = true;
    }

    /// Record that every exit condition was observed satisfied.
    pub(crate) fn mark_exit_conditions_met(&mut self) {
        self.exit_met = true;
    }

    pub(crate) fn transition_to_transitioning_to(&mut self) -> Result<Phase, TransitError> {
        self.advance(Phase::TransitioningTo)
    }

    pub(crate) fn transition_to_active(&mut self) -> Result<Phase, TransitError> {
        if !self.entry_met && !self.enter_conditions.is_empty() {
            return Err(TransitError::ConditionsUnmet { state: self.id, phase: Phase::Active });
        }
        self.advance(Phase::Active)
    }

    pub(crate) fn transition_to_transitioning_from(&mut self) -> Result<Phase, TransitError> {
        self.advance(Phase::TransitioningFrom)
    }

    pub(crate) fn transition_to_finished(&mut self) -> Result<Phase, TransitError> {
        if !self.exit_met && !self.exit_conditions.is_empty() {
            return Err(TransitError::ConditionsUnmet { state: self.id, phase: Phase::Finished });
        }
        self.advance(Phase::Finished)
    }

    /// Dispatch to the transition method for `to`.
    ///
    /// Returns the phase the state left.
    pub(crate) fn transition(&mut self, to: Phase) -> Result<Phase, TransitError> {
        match to {
            Phase::TransitioningTo => self.transition_to_transitioning_to(),
            Phase::Active => self.transition_to_active(),
            Phase::TransitioningFrom => self.transition_to_transitioning_from(),
            Phase::Finished => self.transition_to_finished(),
            Phase::New => Err(TransitError::InvalidPhaseTransition {
                state: self.id,
                from: self.phase,
                to,
            }),
        }
    }

    /// Check that `to` could be reached from the current phase, without
    /// changing anything.
    pub(crate) fn ensure_can_transition(&self, to: Phase) -> Result<(), TransitError> {
        if to.predecessor() == Some(self.phase) {
            Ok(())
        } else {
            Err(TransitError::InvalidPhaseTransition { state: self.id, from: self.phase, to })
        }
    }

    fn advance(&mut self, to: Phase) -> Result<Phase, TransitError> {
        self.ensure_can_transition(to)?;
        let from = self.phase;
        self.phase = to;
        Ok(from)
    }
}

impl fmt::Display for ConditionalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {}>", self.id, self.name)
    }
}

impl fmt::Debug for ConditionalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalState")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("enter_conditions", &self.enter_conditions.len())
            .field("exit_conditions", &self.exit_conditions.len())
            .field("entry_met", &self.entry_met)
            .field("exit_met", &self.exit_met)
            .finish()
    }
}
