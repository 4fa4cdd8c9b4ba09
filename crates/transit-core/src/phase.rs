//! Lifecycle phases of tracked states.
//!
//! ```text
//! ┌─────┐    ┌──────────────────┐    ┌────────┐    ┌────────────────────┐    ┌──────────┐
//! │ NEW │───>│ TRANSITIONING_TO │───>│ ACTIVE │───>│ TRANSITIONING_FROM │───>│ FINISHED │
//! └─────┘    └──────────────────┘    └────────┘    └────────────────────┘    └──────────┘
//! ```
//!
//! Phases only move forward. A screen that is visited twice is tracked by two
//! distinct states, never by resetting one.

use std::fmt;

/// Position of a tracked state in its forward-only lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Declared but not yet part of any transition.
    New,
    /// Destination of an in-flight trip; entry conditions pending.
    TransitioningTo,
    /// Entered and current.
    Active,
    /// Origin of an in-flight trip; exit conditions pending.
    TransitioningFrom,
    /// Left for good.
    Finished,
}

impl Phase {
    /// All phases in lifecycle order.
    pub const ALL: [Self; 5] =
        [Self::New, Self::TransitioningTo, Self::Active, Self::TransitioningFrom, Self::Finished];

    /// The phase that must come directly before this one. `None` for `New`.
    pub fn predecessor(self) -> Option<Self> {
        match self {
            Self::New => None,
            Self::TransitioningTo => Some(Self::New),
            Self::Active => Some(Self::TransitioningTo),
            Self::TransitioningFrom => Some(Self::Active),
            Self::Finished => Some(Self::TransitioningFrom),
        }
    }

    /// The phase that comes directly after this one. `None` for `Finished`.
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::New => Some(Self::TransitioningTo),
            Self::TransitioningTo => Some(Self::Active),
            Self::Active => Some(Self::TransitioningFrom),
            Self::TransitioningFrom => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Whether the state has been entered and not yet left.
    ///
    /// True for `TransitioningTo`, `Active` and `TransitioningFrom`.
    pub fn is_live(self) -> bool {
        matches!(self, Self::TransitioningTo | Self::Active | Self::TransitioningFrom)
    }

    /// Three-letter code used in station lists.
    pub fn short_code(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::TransitioningTo => "TO",
            Self::Active => "ACT",
            Self::TransitioningFrom => "FRO",
            Self::Finished => "FIN",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::TransitioningTo => "TRANSITIONING_TO",
            Self::Active => "ACTIVE",
            Self::TransitioningFrom => "TRANSITIONING_FROM",
            Self::Finished => "FINISHED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_totally_ordered() {
        for pair in Phase::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].successor(), Some(pair[1]));
            assert_eq!(pair[1].predecessor(), Some(pair[0]));
        }
    }

    #[test]
    fn lifecycle_ends_are_open() {
        assert_eq!(Phase::New.predecessor(), None);
        assert_eq!(Phase::Finished.successor(), None);
    }

    #[test]
    fn only_entered_phases_are_live() {
        let live: Vec<_> = Phase::ALL.into_iter().filter(|p| p.is_live()).collect();
        assert_eq!(live, vec![Phase::TransitioningTo, Phase::Active, Phase::TransitioningFrom]);
    }

    #[test]
    fn short_codes_are_distinct() {
        let codes: std::collections::HashSet<_> =
            Phase::ALL.into_iter().map(Phase::short_code).collect();
        assert_eq!(codes.len(), Phase::ALL.len());
        assert_eq!(Phase::Active.short_code(), "ACT");
        assert_eq!(Phase::TransitioningFrom.to_string(), "TRANSITIONING_FROM");
    }
}
