//! Model world: reference implementation of the registry rules.
//!
//! The world tracks phases with plain vectors and applies each operation by
//! the documented rules, without locks, conditions or time. It's the oracle
//! against which the real implementation is verified.

use transit_core::{Phase, TrafficSnapshot};

use super::operation::{FacilityIdx, ModelKind, Operation, OperationResult, StationIdx};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Active station as a 1-based creation index.
    pub active: Option<u64>,
    /// Station phases in creation order.
    pub stations: Vec<Phase>,
    /// Facility phases in creation order.
    pub facilities: Vec<Phase>,
}

impl ObservableState {
    /// Extract the comparable part of a registry snapshot.
    pub fn from_snapshot(snapshot: &TrafficSnapshot) -> Self {
        Self {
            active: snapshot.active.map(|id| id.index()),
            stations: snapshot.stations.iter().map(|s| s.phase).collect(),
            facilities: snapshot.facilities.iter().map(|f| f.phase).collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct ModelStation {
    kind: ModelKind,
    phase: Phase,
    facilities: Vec<usize>,
}

#[derive(Debug, Clone)]
struct ModelFacility {
    owner: usize,
    phase: Phase,
}

/// Model world - the reference implementation.
#[derive(Debug, Clone, Default)]
pub struct ModelWorld {
    stations: Vec<ModelStation>,
    facilities: Vec<ModelFacility>,
    active: Option<usize>,
}

impl ModelWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Kind of the active station, if any.
    pub fn active_kind(&self) -> Option<ModelKind> {
        self.active.map(|i| self.stations[i].kind)
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::CreateStation { kind } => {
                self.stations.push(ModelStation {
                    kind: *kind,
                    phase: Phase::New,
                    facilities: Vec::new(),
                });
                OperationResult::Ok
            },
            Operation::CreateFacility { station } => self.apply_create_facility(*station),
            Operation::TravelTo { station, facility, arrives } => {
                self.apply_travel(*station, *facility, *arrives)
            },
            Operation::CheckIn { facility, arrives } => self.apply_check_in(*facility, *arrives),
            Operation::CheckOut { facility } => self.apply_check_out(*facility),
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            active: self.active.map(|i| i as u64 + 1),
            stations: self.stations.iter().map(|s| s.phase).collect(),
            facilities: self.facilities.iter().map(|f| f.phase).collect(),
        }
    }

    fn station_index(&self, idx: StationIdx) -> Option<usize> {
        (!self.stations.is_empty()).then(|| idx as usize % self.stations.len())
    }

    fn facility_index(&self, idx: FacilityIdx) -> Option<usize> {
        (!self.facilities.is_empty()).then(|| idx as usize % self.facilities.len())
    }

    fn apply_create_facility(&mut self, station: StationIdx) -> OperationResult {
        let Some(owner) = self.station_index(station) else {
            return OperationResult::Skipped;
        };
        if self.stations[owner].phase > Phase::Active {
            return OperationResult::Rejected;
        }
        self.stations[owner].facilities.push(self.facilities.len());
        self.facilities.push(ModelFacility { owner, phase: Phase::New });
        OperationResult::Ok
    }

    fn apply_travel(
        &mut self,
        station: StationIdx,
        facility: Option<FacilityIdx>,
        arrives: bool,
    ) -> OperationResult {
        let Some(dest) = self.station_index(station) else {
            return OperationResult::Skipped;
        };
        let facility = facility.and_then(|f| self.facility_index(f));

        if self.active == Some(dest) || self.stations[dest].phase != Phase::New {
            return OperationResult::Rejected;
        }
        if let Some(f) = facility
            && (self.facilities[f].owner != dest || self.facilities[f].phase != Phase::New)
        {
            return OperationResult::Rejected;
        }
        if let Some(origin) = self.active
            && self.stations[origin].phase != Phase::Active
        {
            return OperationResult::Rejected;
        }

        if let Some(origin) = self.active {
            for &f in &self.stations[origin].facilities {
                if self.facilities[f].phase == Phase::Active {
                    self.facilities[f].phase = Phase::TransitioningFrom;
                }
            }
            self.stations[origin].phase = Phase::TransitioningFrom;
        }
        self.stations[dest].phase = Phase::TransitioningTo;
        if let Some(f) = facility {
            self.facilities[f].phase = Phase::TransitioningTo;
        }

        if !arrives {
            return OperationResult::TimedOut;
        }

        if let Some(origin) = self.active {
            for &f in &self.stations[origin].facilities {
                if self.facilities[f].phase == Phase::TransitioningFrom {
                    self.facilities[f].phase = Phase::Finished;
                }
            }
            self.stations[origin].phase = Phase::Finished;
        }
        self.stations[dest].phase = Phase::Active;
        if let Some(f) = facility {
            self.facilities[f].phase = Phase::Active;
        }
        self.active = Some(dest);
        OperationResult::Ok
    }

    fn apply_check_in(&mut self, facility: FacilityIdx, arrives: bool) -> OperationResult {
        let Some(f) = self.facility_index(facility) else {
            return OperationResult::Skipped;
        };
        let owner = self.facilities[f].owner;
        if self.active != Some(owner)
            || self.stations[owner].phase != Phase::Active
            || self.facilities[f].phase != Phase::New
        {
            return OperationResult::Rejected;
        }

        self.facilities[f].phase = Phase::TransitioningTo;
        if !arrives {
            return OperationResult::TimedOut;
        }
        self.facilities[f].phase = Phase::Active;
        OperationResult::Ok
    }

    fn apply_check_out(&mut self, facility: FacilityIdx) -> OperationResult {
        let Some(f) = self.facility_index(facility) else {
            return OperationResult::Skipped;
        };
        if self.active != Some(self.facilities[f].owner) || self.facilities[f].phase != Phase::Active
        {
            return OperationResult::Rejected;
        }
        self.facilities[f].phase = Phase::Finished;
        OperationResult::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_without_targets_are_skipped() {
        let mut world = ModelWorld::new();
        assert_eq!(
            world.apply(&Operation::TravelTo { station: 3, facility: None, arrives: true }),
            OperationResult::Skipped
        );
        assert_eq!(world.apply(&Operation::CheckOut { facility: 0 }), OperationResult::Skipped);
    }

    #[test]
    fn stalled_travel_blocks_further_travel() {
        let mut world = ModelWorld::new();
        world.apply(&Operation::CreateStation { kind: ModelKind::Home });
        world.apply(&Operation::CreateStation { kind: ModelKind::Results });
        world.apply(&Operation::CreateStation { kind: ModelKind::Details });

        let home = Operation::TravelTo { station: 0, facility: None, arrives: true };
        assert!(world.apply(&home).is_ok());
        let stalled = Operation::TravelTo { station: 1, facility: None, arrives: false };
        assert_eq!(world.apply(&stalled), OperationResult::TimedOut);
        let next = Operation::TravelTo { station: 2, facility: None, arrives: true };
        assert_eq!(world.apply(&next), OperationResult::Rejected);

        assert_eq!(world.observable_state(), ObservableState {
            active: Some(1),
            stations: vec![Phase::TransitioningFrom, Phase::TransitioningTo, Phase::New],
            facilities: vec![],
        });
        assert_eq!(world.active_kind(), Some(ModelKind::Home));
    }
}
