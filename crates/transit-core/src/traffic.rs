//! Registry of every station and facility in a test run.
//!
//! [`TrafficControl`] is the single source of truth for which station is
//! active and which states have ever existed. It is an explicitly passed
//! context object: clones share the same registry, so a test can hand one
//! clone to a trip and keep reading from another while the trip is waiting.
//!
//! # Single writer
//!
//! Phase changes and the active-station reference are written only by the
//! trip engine, inside short write critical sections that never span an
//! await. Everything public on this type is either a query or the creation
//! of a fresh `NEW` state. Readers take a read lock per query, or a
//! [`TrafficSnapshot`] when they need several facts from the same instant.

use std::{
    fmt::{self, Write as _},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    error::TransitError,
    phase::Phase,
    state::ConditionalState,
    station::{
        FacilityId, FacilitySpec, StateRef, StationFacility, StationId, StationKind, StationSpec,
        TransitStation,
    },
    trip::TripConfig,
};

/// One entry of the phase-change journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    /// Position in the journal, starting at 0.
    pub seq: u64,
    /// State that changed.
    pub state: StateRef,
    /// Phase it left.
    pub from: Phase,
    /// Phase it entered.
    pub to: Phase,
}

/// Process-wide registry of stations and facilities.
///
/// Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct TrafficControl {
    inner: Arc<RwLock<Registry>>,
    trip_config: TripConfig,
}

impl TrafficControl {
    /// Create an empty registry: no stations, no active station.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration inherited by trips that don't override it.
    #[must_use]
    pub fn with_trip_config(mut self, config: TripConfig) -> Self {
        self.trip_config = config;
        self
    }

    /// Default trip configuration.
    pub fn trip_config(&self) -> &TripConfig {
        &self.trip_config
    }

    /// Track a new station in [`Phase::New`] and append it to the run's
    /// station history.
    pub fn create_station(&self, spec: StationSpec) -> StationId {
        let mut registry = self.write();
        let id = StationId(registry.stations.len() as u64 + 1);
        tracing::debug!(station = %id, kind = %spec.kind, "station created");
        registry.stations.push(TransitStation::new(id, spec));
        id
    }

    /// Track a new facility in [`Phase::New`], owned by `owner`.
    ///
    /// # Errors
    ///
    /// - `TransitError::UnknownState` if `owner` was never created
    /// - `TransitError::OwnerNotActive` if `owner` already left `ACTIVE`
    pub fn create_facility(
        &self,
        owner: StationId,
        spec: FacilitySpec,
    ) -> Result<FacilityId, TransitError> {
        let mut registry = self.write();
        let owner_phase = registry.station(owner)?.phase();
        if owner_phase > Phase::Active {
            return Err(TransitError::OwnerNotActive {
                facility: spec.name,
                owner,
                phase: owner_phase,
            });
        }

        let id = FacilityId(registry.facilities.len() as u64 + 1);
        tracing::debug!(facility = %id, %owner, name = %spec.name, "facility created");
        registry.facilities.push(StationFacility::new(id, owner, spec));
        registry.station_mut(owner)?.facilities.push(id);
        Ok(id)
    }

    /// The currently active station, if any.
    ///
    /// Only reassigned when a trip completes, so two calls without a trip in
    /// between return the same station.
    pub fn active_station(&self) -> Option<StationId> {
        self.read().active
    }

    /// Every station created so far, in creation order.
    pub fn all_stations(&self) -> Vec<StationId> {
        (1..=self.read().stations.len() as u64).map(StationId).collect()
    }

    /// Current phase of a state. `None` if it was never created.
    pub fn phase(&self, state: impl Into<StateRef>) -> Option<Phase> {
        self.read().state(state.into()).ok().map(ConditionalState::phase)
    }

    /// Kind tag of a station. `None` if it was never created.
    pub fn station_kind(&self, station: StationId) -> Option<StationKind> {
        self.read().station(station).ok().map(|s| s.kind)
    }

    /// Display name of a state. `None` if it was never created.
    pub fn name(&self, state: impl Into<StateRef>) -> Option<String> {
        self.read().state(state.into()).ok().map(|s| s.name().to_string())
    }

    /// Facilities owned by a station, in creation order.
    pub fn facilities_of(&self, station: StationId) -> Vec<FacilityId> {
        self.read().station(station).map(|s| s.facilities.clone()).unwrap_or_default()
    }

    /// Owner of a facility. `None` if it was never created.
    pub fn owner_of(&self, facility: FacilityId) -> Option<StationId> {
        self.read().facility(facility).ok().map(|f| f.owner)
    }

    /// Diagnostic rendering of a state, e.g. `<S1: Home>`.
    pub fn describe(&self, state: impl Into<StateRef>) -> String {
        self.read().describe(state.into())
    }

    /// Run `f` against a tracked state under a read lock.
    ///
    /// Keep `f` short: trip completion waits for it.
    pub fn inspect<R>(
        &self,
        state: impl Into<StateRef>,
        f: impl FnOnce(&ConditionalState) -> R,
    ) -> Option<R> {
        self.read().state(state.into()).ok().map(f)
    }

    /// Every phase change so far, in order.
    pub fn journal(&self) -> Vec<PhaseChange> {
        self.read().journal.clone()
    }

    /// Consistent copy of the whole registry.
    pub fn snapshot(&self) -> TrafficSnapshot {
        self.read().snapshot()
    }

    /// One line per known station: index, short phase code, description.
    pub fn render_station_list(&self) -> String {
        self.snapshot().render_station_list()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TrafficControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.read();
        f.debug_struct("TrafficControl")
            .field("active", &registry.active)
            .field("stations", &registry.stations.len())
            .field("facilities", &registry.facilities.len())
            .field("trip_config", &self.trip_config)
            .finish()
    }
}

/// Registry contents behind the lock.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    stations: Vec<TransitStation>,
    facilities: Vec<StationFacility>,
    active: Option<StationId>,
    journal: Vec<PhaseChange>,
}

impl Registry {
    pub(crate) fn active(&self) -> Option<StationId> {
        self.active
    }

    pub(crate) fn station(&self, id: StationId) -> Result<&TransitStation, TransitError> {
        index(id.0)
            .and_then(|i| self.stations.get(i))
            .ok_or(TransitError::UnknownState(StateRef::Station(id)))
    }

    fn station_mut(&mut self, id: StationId) -> Result<&mut TransitStation, TransitError> {
        index(id.0)
            .and_then(|i| self.stations.get_mut(i))
            .ok_or(TransitError::UnknownState(StateRef::Station(id)))
    }

    pub(crate) fn facility(&self, id: FacilityId) -> Result<&StationFacility, TransitError> {
        index(id.0)
            .and_then(|i| self.facilities.get(i))
            .ok_or(TransitError::UnknownState(StateRef::Facility(id)))
    }

    pub(crate) fn state(&self, state: StateRef) -> Result<&ConditionalState, TransitError> {
        match state {
            StateRef::Station(id) => self.station(id).map(|s| &s.state),
            StateRef::Facility(id) => self.facility(id).map(|f| &f.state),
        }
    }

    fn facility_mut(&mut self, id: FacilityId) -> Result<&mut StationFacility, TransitError> {
        index(id.0)
            .and_then(|i| self.facilities.get_mut(i))
            .ok_or(TransitError::UnknownState(StateRef::Facility(id)))
    }

    fn state_mut(&mut self, state: StateRef) -> Result<&mut ConditionalState, TransitError> {
        match state {
            StateRef::Station(id) => self.station_mut(id).map(|s| &mut s.state),
            StateRef::Facility(id) => self.facility_mut(id).map(|f| &mut f.state),
        }
    }

    pub(crate) fn describe(&self, state: StateRef) -> String {
        self.state(state).map_or_else(|_| format!("<{state}: unknown>"), ToString::to_string)
    }

    /// Record that a state's entry (or exit) conditions were all observed.
    pub(crate) fn mark_conditions_met(
        &mut self,
        state: StateRef,
        entry: bool,
    ) -> Result<(), TransitError> {
        let state = self.state_mut(state)?;
        if entry {
            state.mark_entry_conditions_met();
        } else {
            state.mark_exit_conditions_met();
        }
        Ok(())
    }

    /// Move a state to the next phase and journal the change.
    ///
    /// Activating a facility additionally requires its owner to be `ACTIVE`.
    pub(crate) fn advance(&mut self, state: StateRef, to: Phase) -> Result<(), TransitError> {
        if let (StateRef::Facility(id), Phase::Active) = (state, to) {
            let facility = self.facility(id)?;
            let owner_phase = self.station(facility.owner)?.phase();
            if owner_phase != Phase::Active {
                return Err(TransitError::OwnerNotActive {
                    facility: facility.state.to_string(),
                    owner: facility.owner,
                    phase: owner_phase,
                });
            }
        }

        let from = self.state_mut(state)?.transition(to)?;
        let seq = self.journal.len() as u64;
        self.journal.push(PhaseChange { seq, state, from, to });
        tracing::debug!(%state, %from, %to, seq, "phase change");
        Ok(())
    }

    /// Finish a station that is `TRANSITIONING_FROM`.
    ///
    /// Owned facilities still in `TRANSITIONING_FROM` are finished first, in
    /// creation order, so no facility outlives its owner. Facilities still
    /// `NEW` or `TRANSITIONING_TO` were never entered and stay as they are.
    pub(crate) fn finish_station(&mut self, id: StationId) -> Result<(), TransitError> {
        let leaving: Vec<FacilityId> = self
            .station(id)?
            .facilities
            .iter()
            .copied()
            .filter(|f| self.facility(*f).is_ok_and(|f| f.phase() == Phase::TransitioningFrom))
            .collect();

        for facility in leaving {
            self.advance(StateRef::Facility(facility), Phase::Finished)?;
        }
        self.advance(StateRef::Station(id), Phase::Finished)
    }

    /// Reassign the active station. Only trip completion calls this.
    pub(crate) fn set_active(&mut self, id: StationId) -> Result<(), TransitError> {
        if self.active == Some(id) {
            return Err(TransitError::DuplicateActivation { station: id });
        }
        tracing::info!(previous = ?self.active, active = %id, "active station reassigned");
        self.active = Some(id);
        Ok(())
    }

    fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            active: self.active,
            stations: self
                .stations
                .iter()
                .map(|s| StationSnapshot {
                    id: s.id,
                    kind: s.kind,
                    name: s.state.name().to_string(),
                    phase: s.phase(),
                    facilities: s.facilities.clone(),
                })
                .collect(),
            facilities: self
                .facilities
                .iter()
                .map(|f| FacilitySnapshot {
                    id: f.id,
                    owner: f.owner,
                    name: f.state.name().to_string(),
                    phase: f.phase(),
                })
                .collect(),
            journal: self.journal.clone(),
        }
    }
}

fn index(id: u64) -> Option<usize> {
    usize::try_from(id).ok()?.checked_sub(1)
}

/// Point-in-time copy of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficSnapshot {
    /// Active station at the time of the snapshot.
    pub active: Option<StationId>,
    /// All stations, in creation order.
    pub stations: Vec<StationSnapshot>,
    /// All facilities, in creation order.
    pub facilities: Vec<FacilitySnapshot>,
    /// Phase-change journal.
    pub journal: Vec<PhaseChange>,
}

impl TrafficSnapshot {
    /// Look up a station.
    pub fn station(&self, id: StationId) -> Option<&StationSnapshot> {
        index(id.0).and_then(|i| self.stations.get(i))
    }

    /// Look up a facility.
    pub fn facility(&self, id: FacilityId) -> Option<&FacilitySnapshot> {
        index(id.0).and_then(|i| self.facilities.get(i))
    }

    /// Stations currently in [`Phase::Active`].
    pub fn active_phase_stations(&self) -> impl Iterator<Item = &StationSnapshot> {
        self.stations.iter().filter(|s| s.phase == Phase::Active)
    }

    /// One line per station: `  [index] (CODE) <S#: name>`.
    pub fn render_station_list(&self) -> String {
        let mut out = String::new();
        for (i, station) in self.stations.iter().enumerate() {
            let _ = writeln!(out, "  [{}] ({}) {}", i + 1, station.phase.short_code(), station);
        }
        out
    }
}

/// Station as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationSnapshot {
    /// Station id.
    pub id: StationId,
    /// Kind tag.
    pub kind: StationKind,
    /// Display name.
    pub name: String,
    /// Phase at snapshot time.
    pub phase: Phase,
    /// Owned facilities, in creation order.
    pub facilities: Vec<FacilityId>,
}

impl fmt::Display for StationSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {}>", self.id, self.name)
    }
}

/// Facility as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilitySnapshot {
    /// Facility id.
    pub id: FacilityId,
    /// Owning station.
    pub owner: StationId,
    /// Display name.
    pub name: String,
    /// Phase at snapshot time.
    pub phase: Phase,
}

impl fmt::Display for FacilitySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {}>", self.id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: StationKind = StationKind::new("Home");
    const RESULTS: StationKind = StationKind::new("Results");

    /// Drive a station to `ACTIVE` the way trip completion does.
    fn activate(traffic: &TrafficControl, id: StationId) {
        let mut registry = traffic.write();
        registry.advance(id.into(), Phase::TransitioningTo).unwrap();
        registry.advance(id.into(), Phase::Active).unwrap();
        registry.set_active(id).unwrap();
    }

    #[test]
    fn registry_starts_empty() {
        let traffic = TrafficControl::new();
        assert_eq!(traffic.active_station(), None);
        assert!(traffic.all_stations().is_empty());
        assert_eq!(traffic.render_station_list(), "");
    }

    #[test]
    fn stations_are_appended_in_creation_order() {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME));
        let results = traffic.create_station(StationSpec::new(RESULTS));
        let home_again = traffic.create_station(StationSpec::new(HOME));

        assert_eq!(traffic.all_stations(), vec![home, results, home_again]);
        assert_ne!(home, home_again);
        assert_eq!(traffic.station_kind(home_again), Some(HOME));
        assert_eq!(traffic.phase(results), Some(Phase::New));
    }

    #[test]
    fn active_station_is_stable_between_trips() {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME));
        activate(&traffic, home);

        assert_eq!(traffic.active_station(), Some(home));
        assert_eq!(traffic.active_station(), traffic.active_station());
    }

    #[test]
    fn reactivating_the_active_station_is_rejected() {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME));
        activate(&traffic, home);

        let err = traffic.write().set_active(home).unwrap_err();
        assert_eq!(err, TransitError::DuplicateActivation { station: home });
    }

    #[test]
    fn facility_for_departed_station_is_rejected() {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME));
        activate(&traffic, home);
        traffic.write().advance(home.into(), Phase::TransitioningFrom).unwrap();

        let err = traffic.create_facility(home, FacilitySpec::new("SearchBar")).unwrap_err();
        assert!(matches!(err, TransitError::OwnerNotActive {
            phase: Phase::TransitioningFrom,
            ..
        }));
        assert!(traffic.facilities_of(home).is_empty());
    }

    #[test]
    fn facility_for_unknown_station_is_rejected() {
        let traffic = TrafficControl::new();
        let err = traffic.create_facility(StationId(7), FacilitySpec::new("Menu")).unwrap_err();
        assert_eq!(err, TransitError::UnknownState(StateRef::Station(StationId(7))));
    }

    #[test]
    fn facility_cannot_activate_before_owner() {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME));
        let menu = traffic.create_facility(home, FacilitySpec::new("Menu")).unwrap();

        let mut registry = traffic.write();
        registry.advance(menu.into(), Phase::TransitioningTo).unwrap();
        let err = registry.advance(menu.into(), Phase::Active).unwrap_err();
        assert!(matches!(err, TransitError::OwnerNotActive { phase: Phase::New, .. }));
    }

    #[test]
    fn finishing_a_station_finishes_its_departing_facilities_first() {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME));
        activate(&traffic, home);
        let menu = traffic.create_facility(home, FacilitySpec::new("Menu")).unwrap();
        let bar = traffic.create_facility(home, FacilitySpec::new("SearchBar")).unwrap();
        let unused = traffic.create_facility(home, FacilitySpec::new("Dialog")).unwrap();

        {
            let mut registry = traffic.write();
            for facility in [menu, bar] {
                registry.advance(facility.into(), Phase::TransitioningTo).unwrap();
                registry.advance(facility.into(), Phase::Active).unwrap();
                registry.advance(facility.into(), Phase::TransitioningFrom).unwrap();
            }
            registry.advance(home.into(), Phase::TransitioningFrom).unwrap();
            registry.finish_station(home).unwrap();
        }

        let finished: Vec<StateRef> = traffic
            .journal()
            .into_iter()
            .filter(|c| c.to == Phase::Finished)
            .map(|c| c.state)
            .collect();
        assert_eq!(finished, vec![menu.into(), bar.into(), home.into()]);
        assert_eq!(traffic.phase(unused), Some(Phase::New));
    }

    #[test]
    fn station_list_renders_short_phase_codes() {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME));
        traffic.create_station(StationSpec::new(RESULTS).named("Search results"));
        activate(&traffic, home);

        assert_eq!(
            traffic.render_station_list(),
            "  [1] (ACT) <S1: Home>\n  [2] (NEW) <S2: Search results>\n"
        );
        assert_eq!(traffic.describe(StationId(9)), "<S9: unknown>");
    }

    #[test]
    fn snapshot_is_detached_from_later_changes() {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME));
        let before = traffic.snapshot();
        activate(&traffic, home);

        assert_eq!(before.active, None);
        assert_eq!(before.station(home).map(|s| s.phase), Some(Phase::New));
        assert_eq!(traffic.snapshot().active_phase_stations().count(), 1);
    }
}
