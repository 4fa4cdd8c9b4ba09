//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::HashMap;

use transit_core::{Phase, StateRef, TrafficSnapshot};

use super::{Invariant, InvariantResult, Violation};

/// At most one station is in [`Phase::Active`].
pub struct SingleActiveStation;

impl Invariant for SingleActiveStation {
    fn name(&self) -> &'static str {
        "SingleActiveStation"
    }

    fn check(&self, state: &TrafficSnapshot) -> InvariantResult {
        let active: Vec<String> = state.active_phase_stations().map(ToString::to_string).collect();
        if active.len() > 1 {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} stations are ACTIVE: {}", active.len(), active.join(", ")),
            });
        }
        Ok(())
    }
}

/// A facility is only `ACTIVE` while its owner is.
pub struct FacilityRequiresActiveOwner;

impl Invariant for FacilityRequiresActiveOwner {
    fn name(&self) -> &'static str {
        "FacilityRequiresActiveOwner"
    }

    fn check(&self, state: &TrafficSnapshot) -> InvariantResult {
        for facility in state.facilities.iter().filter(|f| f.phase == Phase::Active) {
            let owner_phase = state.station(facility.owner).map(|s| s.phase);
            if owner_phase != Some(Phase::Active) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{facility} is ACTIVE but owner {} is {owner_phase:?}",
                        facility.owner
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Every journal entry steps exactly one phase forward, each state's entries
/// chain together, and the last entry matches the state's current phase.
pub struct PhaseProgression;

impl Invariant for PhaseProgression {
    fn name(&self) -> &'static str {
        "PhaseProgression"
    }

    fn check(&self, state: &TrafficSnapshot) -> InvariantResult {
        let mut last: HashMap<StateRef, Phase> = HashMap::new();

        for change in &state.journal {
            if change.from.successor() != Some(change.to) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "entry {}: {} jumped {} -> {}",
                        change.seq, change.state, change.from, change.to
                    ),
                });
            }
            let previous = last.insert(change.state, change.to).unwrap_or(Phase::New);
            if previous != change.from {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "entry {}: {} left {} but was last seen in {previous}",
                        change.seq, change.state, change.from
                    ),
                });
            }
        }

        let current = state
            .stations
            .iter()
            .map(|s| (StateRef::Station(s.id), s.phase))
            .chain(state.facilities.iter().map(|f| (StateRef::Facility(f.id), f.phase)));
        for (id, phase) in current {
            let journaled = last.get(&id).copied().unwrap_or(Phase::New);
            if journaled != phase {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{id} is {phase} but the journal ends at {journaled}"),
                });
            }
        }
        Ok(())
    }
}

/// A finished station has no facility still `ACTIVE` or departing, and every
/// facility that finished along with it did so first. Facilities that never
/// got past `TRANSITIONING_TO` are left behind untouched.
pub struct FacilitiesFinishBeforeOwner;

impl Invariant for FacilitiesFinishBeforeOwner {
    fn name(&self) -> &'static str {
        "FacilitiesFinishBeforeOwner"
    }

    fn check(&self, state: &TrafficSnapshot) -> InvariantResult {
        let finished_at: HashMap<StateRef, u64> = state
            .journal
            .iter()
            .filter(|c| c.to == Phase::Finished)
            .map(|c| (c.state, c.seq))
            .collect();

        for facility in &state.facilities {
            let Some(&owner_seq) = finished_at.get(&StateRef::Station(facility.owner)) else {
                continue;
            };
            if matches!(facility.phase, Phase::Active | Phase::TransitioningFrom) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{facility} is {} after owner {} finished",
                        facility.phase, facility.owner
                    ),
                });
            }
            if let Some(&seq) = finished_at.get(&StateRef::Facility(facility.id))
                && seq > owner_seq
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{facility} finished at entry {seq}, after owner {} at {owner_seq}",
                        facility.owner
                    ),
                });
            }
        }
        Ok(())
    }
}

/// The registry's active station exists and is `ACTIVE`, or
/// `TRANSITIONING_FROM` after a trip that stalled on its way out.
pub struct ActiveStationLive;

impl Invariant for ActiveStationLive {
    fn name(&self) -> &'static str {
        "ActiveStationLive"
    }

    fn check(&self, state: &TrafficSnapshot) -> InvariantResult {
        let Some(active) = state.active else {
            return Ok(());
        };
        match state.station(active).map(|s| s.phase) {
            Some(Phase::Active | Phase::TransitioningFrom) => Ok(()),
            phase => Err(Violation {
                invariant: self.name(),
                message: format!("active station {active} is {phase:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use transit_core::{FacilitySpec, PhaseChange, StationKind, StationSpec, TrafficControl};

    use super::*;

    const HOME: StationKind = StationKind::new("Home");

    fn two_stations_and_a_facility() -> TrafficSnapshot {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME));
        traffic.create_station(StationSpec::new(HOME));
        traffic.create_facility(home, FacilitySpec::new("Menu")).unwrap();
        traffic.snapshot()
    }

    #[test]
    fn fresh_registry_satisfies_every_check() {
        let state = two_stations_and_a_facility();
        assert!(crate::InvariantRegistry::standard().check_all(&state).is_ok());
    }

    #[test]
    fn two_active_stations_violate() {
        let mut state = two_stations_and_a_facility();
        for station in &mut state.stations {
            station.phase = Phase::Active;
        }

        let violation = SingleActiveStation.check(&state).unwrap_err();
        assert_eq!(violation.invariant, "SingleActiveStation");
    }

    #[test]
    fn active_facility_under_new_owner_violates() {
        let mut state = two_stations_and_a_facility();
        state.facilities[0].phase = Phase::Active;

        assert!(FacilityRequiresActiveOwner.check(&state).is_err());
    }

    #[test]
    fn skipped_phase_in_journal_violates() {
        let mut state = two_stations_and_a_facility();
        let facility = state.facilities[0].id;
        state.facilities[0].phase = Phase::Active;
        state.journal.push(PhaseChange {
            seq: 0,
            state: StateRef::Facility(facility),
            from: Phase::New,
            to: Phase::Active,
        });

        let violation = PhaseProgression.check(&state).unwrap_err();
        assert!(violation.message.contains("jumped NEW -> ACTIVE"));
    }

    #[test]
    fn phase_without_journal_entry_violates() {
        let mut state = two_stations_and_a_facility();
        state.stations[1].phase = Phase::TransitioningTo;

        assert!(PhaseProgression.check(&state).is_err());
    }

    #[test]
    fn active_reference_to_new_station_violates() {
        let mut state = two_stations_and_a_facility();
        state.active = Some(state.stations[0].id);

        assert!(ActiveStationLive.check(&state).is_err());
    }
}
