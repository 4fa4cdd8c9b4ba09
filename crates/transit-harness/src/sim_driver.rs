//! Simulation driver applying model operations to the real registry.
//!
//! `SimDriver` owns a [`TrafficControl`] on a [`SimEnv`] clock and turns each
//! [`Operation`] into the corresponding registry call or [`Trip`]. Every
//! station and facility it declares waits on one shared "application
//! responds" flag that the trip's trigger sets, so an operation decides up
//! front whether its trip arrives or times out.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use transit_core::{
    FacilityId, FacilitySpec, SharedCondition, StationId, StationKind, StationSpec,
    TrafficControl, TransitError, Trip, TripConfig, condition,
};

use crate::{
    invariants::InvariantRegistry,
    model::{ModelKind, ObservableState, Operation, OperationResult},
    sim_env::SimEnv,
};

/// Timeout used for driven trips. Short, since the clock is virtual anyway.
pub const SIM_TRIP_TIMEOUT: Duration = Duration::from_millis(200);

/// Poll interval used for driven trips.
pub const SIM_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Drives the real registry with model operations.
pub struct SimDriver {
    env: SimEnv,
    traffic: TrafficControl,
    responds: Arc<AtomicBool>,
    stations: Vec<StationId>,
    facilities: Vec<FacilityId>,
    invariants: Option<InvariantRegistry>,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriver {
    /// Create a driver with an empty registry.
    pub fn new() -> Self {
        let config = TripConfig { timeout: SIM_TRIP_TIMEOUT, poll_interval: SIM_POLL_INTERVAL };
        Self {
            env: SimEnv::new(),
            traffic: TrafficControl::new().with_trip_config(config),
            responds: Arc::new(AtomicBool::new(false)),
            stations: Vec::new(),
            facilities: Vec::new(),
            invariants: None,
        }
    }

    /// Check invariants after every operation.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Registry being driven.
    pub fn traffic(&self) -> &TrafficControl {
        &self.traffic
    }

    /// Virtual clock.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Observable state of the real registry.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState::from_snapshot(&self.traffic.snapshot())
    }

    /// Apply an operation to the real registry.
    ///
    /// # Panics
    ///
    /// If invariant checking is enabled and an invariant is violated.
    pub async fn apply(&mut self, op: &Operation) -> OperationResult {
        let result = match op {
            Operation::CreateStation { kind } => {
                let spec = StationSpec::new(kind_tag(*kind))
                    .with_enter_condition(self.responds_condition());
                self.stations.push(self.traffic.create_station(spec));
                OperationResult::Ok
            },
            Operation::CreateFacility { station } => match pick(&self.stations, *station) {
                None => OperationResult::Skipped,
                Some(owner) => {
                    let name = format!("Facility{}", self.facilities.len() + 1);
                    let spec =
                        FacilitySpec::new(name).with_enter_condition(self.responds_condition());
                    match self.traffic.create_facility(owner, spec) {
                        Ok(id) => {
                            self.facilities.push(id);
                            OperationResult::Ok
                        },
                        Err(err) => classify(&err),
                    }
                },
            },
            Operation::TravelTo { station, facility, arrives } => {
                match pick(&self.stations, *station) {
                    None => OperationResult::Skipped,
                    Some(dest) => {
                        let mut trip = Trip::travel_to(dest);
                        if let Some(f) = (*facility).and_then(|f| pick(&self.facilities, f)) {
                            trip = trip.with_facility(f);
                        }
                        self.run(trip, *arrives).await
                    },
                }
            },
            Operation::CheckIn { facility, arrives } => match pick(&self.facilities, *facility) {
                None => OperationResult::Skipped,
                Some(f) => self.run(Trip::check_in(f), *arrives).await,
            },
            Operation::CheckOut { facility } => match pick(&self.facilities, *facility) {
                None => OperationResult::Skipped,
                Some(f) => self.run(Trip::check_out(f), true).await,
            },
        };

        if let Some(invariants) = &self.invariants {
            invariants.assert_all(&self.traffic.snapshot(), &format!("after {op:?}"));
        }
        result
    }

    async fn run(&self, trip: Trip, arrives: bool) -> OperationResult {
        let responds = Arc::clone(&self.responds);
        let trip = trip.with_trigger(move || responds.store(arrives, Ordering::SeqCst));
        match trip.run(&self.traffic, &self.env).await {
            Ok(_) => OperationResult::Ok,
            Err(err) => classify(&err),
        }
    }

    fn responds_condition(&self) -> SharedCondition {
        let responds = Arc::clone(&self.responds);
        condition::from_fn("application responds", move || responds.load(Ordering::SeqCst))
    }
}

fn pick<T: Copy>(items: &[T], idx: u8) -> Option<T> {
    (!items.is_empty()).then(|| items[idx as usize % items.len()])
}

fn classify(err: &TransitError) -> OperationResult {
    if err.is_transient() { OperationResult::TimedOut } else { OperationResult::Rejected }
}

/// Station kind tag for a model kind.
pub fn kind_tag(kind: ModelKind) -> StationKind {
    StationKind::new(kind.name())
}

#[cfg(test)]
mod tests {
    use transit_core::Phase;

    use super::*;

    #[tokio::test]
    async fn timed_out_travel_costs_exactly_the_bound() {
        let mut driver = SimDriver::new().with_invariants(InvariantRegistry::standard());
        driver.apply(&Operation::CreateStation { kind: ModelKind::Home }).await;
        driver.apply(&Operation::CreateStation { kind: ModelKind::Results }).await;

        let home = Operation::TravelTo { station: 0, facility: None, arrives: true };
        assert_eq!(driver.apply(&home).await, OperationResult::Ok);
        let start = driver.env().elapsed();

        let stalled = Operation::TravelTo { station: 1, facility: None, arrives: false };
        assert_eq!(driver.apply(&stalled).await, OperationResult::TimedOut);

        assert_eq!(driver.env().elapsed() - start, SIM_TRIP_TIMEOUT);
        assert_eq!(driver.observable_state().stations, vec![
            Phase::TransitioningFrom,
            Phase::TransitioningTo
        ]);
    }
}
