//! Stations, facilities and the identifiers that name them.
//!
//! A `TransitStation` is a top-level application screen; at most one is
//! active at a time. A `StationFacility` is a sub-component attached to
//! exactly one station and can only be active while that station is.
//!
//! Both are owned by the registry ([`crate::TrafficControl`]) and referred to
//! by copyable ids. Two ids are the same state if and only if they compare
//! equal; two stations of the same [`StationKind`] are still distinct.

use std::{fmt, sync::Arc};

use crate::{
    condition::{Condition, SharedCondition},
    phase::Phase,
    state::ConditionalState,
};

/// Identity of a station. Assigned in creation order, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StationId(pub(crate) u64);

impl StationId {
    /// Creation index (1-based).
    pub fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Identity of a facility. Assigned in creation order, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FacilityId(pub(crate) u64);

impl FacilityId {
    /// Creation index (1-based).
    pub fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// Reference to any tracked state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateRef {
    /// A station.
    Station(StationId),
    /// A facility.
    Facility(FacilityId),
}

impl From<StationId> for StateRef {
    fn from(id: StationId) -> Self {
        Self::Station(id)
    }
}

impl From<FacilityId> for StateRef {
    fn from(id: FacilityId) -> Self {
        Self::Facility(id)
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Station(id) => id.fmt(f),
            Self::Facility(id) => id.fmt(f),
        }
    }
}

/// Type tag carried by every station, compared by value.
///
/// Declare one constant per screen of the application under test:
///
/// ```
/// use transit_core::StationKind;
///
/// const HOME: StationKind = StationKind::new("Home");
/// assert_eq!(HOME, StationKind::new("Home"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StationKind(&'static str);

impl StationKind {
    /// Create a kind tag.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Tag name.
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Declaration of a station, turned into a tracked state by
/// [`crate::TrafficControl::create_station`].
#[derive(Clone)]
pub struct StationSpec {
    pub(crate) kind: StationKind,
    pub(crate) name: String,
    pub(crate) enter_conditions: Vec<SharedCondition>,
    pub(crate) exit_conditions: Vec<SharedCondition>,
}

impl StationSpec {
    /// Declare a station of the given kind, named after the kind.
    pub fn new(kind: StationKind) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            enter_conditions: Vec::new(),
            exit_conditions: Vec::new(),
        }
    }

    /// Override the display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a condition that must hold before the station becomes active.
    #[must_use]
    pub fn with_enter_condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.enter_conditions.push(condition);
        self
    }

    /// Add a condition that must hold before the station is finished.
    #[must_use]
    pub fn with_exit_condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.exit_conditions.push(condition);
        self
    }
}

impl fmt::Debug for StationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StationSpec")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("enter_conditions", &self.enter_conditions.len())
            .field("exit_conditions", &self.exit_conditions.len())
            .finish()
    }
}

/// Declaration of a facility, turned into a tracked state by
/// [`crate::TrafficControl::create_facility`].
#[derive(Clone)]
pub struct FacilitySpec {
    pub(crate) name: String,
    pub(crate) enter_conditions: Vec<SharedCondition>,
    pub(crate) exit_conditions: Vec<SharedCondition>,
}

impl FacilitySpec {
    /// Declare a facility with a display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), enter_conditions: Vec::new(), exit_conditions: Vec::new() }
    }

    /// Add a condition that must hold before the facility becomes active.
    #[must_use]
    pub fn with_enter_condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.enter_conditions.push(condition);
        self
    }

    /// Add a condition that must hold before the facility is finished.
    #[must_use]
    pub fn with_exit_condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.exit_conditions.push(condition);
        self
    }
}

impl fmt::Debug for FacilitySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacilitySpec")
            .field("name", &self.name)
            .field("enter_conditions", &self.enter_conditions.len())
            .field("exit_conditions", &self.exit_conditions.len())
            .finish()
    }
}

/// A tracked top-level screen.
#[derive(Debug)]
pub(crate) struct TransitStation {
    pub(crate) id: StationId,
    pub(crate) state: ConditionalState,
    pub(crate) kind: StationKind,
    /// Owned facilities in creation order.
    pub(crate) facilities: Vec<FacilityId>,
}

impl TransitStation {
    pub(crate) fn new(id: StationId, spec: StationSpec) -> Self {
        let state = ConditionalState::new(
            StateRef::Station(id),
            spec.name,
            spec.enter_conditions,
            spec.exit_conditions,
        );
        Self { id, state, kind: spec.kind, facilities: Vec::new() }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.state.phase()
    }
}

/// A tracked sub-component owned by one station.
#[derive(Debug)]
pub(crate) struct StationFacility {
    pub(crate) id: FacilityId,
    pub(crate) state: ConditionalState,
    pub(crate) owner: StationId,
}

impl StationFacility {
    pub(crate) fn new(id: FacilityId, owner: StationId, spec: FacilitySpec) -> Self {
        let state = ConditionalState::new(
            StateRef::Facility(id),
            spec.name,
            spec.enter_conditions,
            spec.exit_conditions,
        );
        Self { id, state, owner }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.state.phase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: StationKind = StationKind::new("Home");

    #[test]
    fn ids_render_with_prefix() {
        assert_eq!(StationId(3).to_string(), "S3");
        assert_eq!(FacilityId(1).to_string(), "F1");
        assert_eq!(StateRef::from(FacilityId(2)).to_string(), "F2");
    }

    #[test]
    fn station_spec_defaults_name_to_kind() {
        let spec = StationSpec::new(HOME);
        assert_eq!(spec.name, "Home");
        assert_eq!(spec.named("Home (signed in)").name, "Home (signed in)");
    }

    #[test]
    fn new_station_starts_in_new_phase() {
        let station = TransitStation::new(StationId(1), StationSpec::new(HOME));
        assert_eq!(station.phase(), Phase::New);
        assert_eq!(station.kind, HOME);
        assert!(station.facilities.is_empty());
    }
}
