//! Trip: one transition between tracked states.
//!
//! A trip leaves its origin, fires the triggering action, then waits for the
//! destination's entry conditions (and the origin's exit conditions) before
//! committing the new phases and reassigning the registry's active station.
//!
//! ```text
//!  validate ──> origin FROM ──> trigger() ──> destination TO ──> wait ──┬──> commit
//!                                                                       │    origin FINISHED
//!                                                                       │    destination ACTIVE
//!                                                                       │    active := destination
//!                                                                       │
//!                                                                       └──> timeout / cancel
//!                                                                            (phases left as is)
//! ```
//!
//! Every phase mutation happens inside a short write critical section; the
//! only suspension point is the condition wait, which holds no lock. A trip
//! that fails validation mutates nothing. A trip that stalls leaves origin
//! and destination in `TRANSITIONING_FROM` / `TRANSITIONING_TO` so the
//! station list shows exactly where it stopped.

use std::{fmt, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    condition::{ConditionReport, ConditionRole, ConditionWaiter, PendingCondition},
    env::Environment,
    error::TransitError,
    phase::Phase,
    station::{FacilityId, StateRef, StationId},
    traffic::{Registry, TrafficControl},
};

/// Default bound on a trip's condition wait.
pub const DEFAULT_TRIP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time between two rounds of condition checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Trip timing configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripConfig {
    /// Bound on the condition wait
    pub timeout: Duration,
    /// Pause between condition polling rounds
    pub poll_interval: Duration,
}

impl Default for TripConfig {
    fn default() -> Self {
        Self { timeout: DEFAULT_TRIP_TIMEOUT, poll_interval: DEFAULT_POLL_INTERVAL }
    }
}

type Trigger = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Travel { destination: StationId, facilities: Vec<FacilityId> },
    CheckIn(Vec<FacilityId>),
    CheckOut(Vec<FacilityId>),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (verb, states): (&str, Vec<StateRef>) = match self {
            Self::Travel { destination, facilities } => (
                "travel to",
                std::iter::once((*destination).into())
                    .chain(facilities.iter().map(|&id| id.into()))
                    .collect(),
            ),
            Self::CheckIn(facilities) => ("check in", ids(facilities)),
            Self::CheckOut(facilities) => ("check out", ids(facilities)),
        };
        write!(f, "{verb}")?;
        for state in states {
            write!(f, " {state}")?;
        }
        Ok(())
    }
}

fn ids(facilities: &[FacilityId]) -> Vec<StateRef> {
    facilities.iter().map(|&id| id.into()).collect()
}

/// Validated set of states a trip will move.
#[derive(Debug, Default)]
struct Plan {
    origin_station: Option<StationId>,
    /// Origin facilities in creation order; `ACTIVE` or already departing.
    origin_facilities: Vec<FacilityId>,
    destination_station: Option<StationId>,
    destination_facilities: Vec<FacilityId>,
}

impl Plan {
    /// Facilities first, then their station.
    fn origins(&self) -> Vec<StateRef> {
        let mut states = ids(&self.origin_facilities);
        states.extend(self.origin_station.map(StateRef::from));
        states
    }

    /// Station first, then its facilities.
    fn destinations(&self) -> Vec<StateRef> {
        let mut states: Vec<StateRef> =
            self.destination_station.map(StateRef::from).into_iter().collect();
        states.extend(ids(&self.destination_facilities));
        states
    }

    /// A travel commits only if the active station is still the one it left,
    /// and that station is still departing.
    fn ensure_origin_unchanged(&self, registry: &Registry) -> Result<(), TransitError> {
        if self.destination_station.is_none() {
            return Ok(());
        }
        let active = registry.active();
        if active != self.origin_station {
            return Err(TransitError::ActiveStationChanged { expected: self.origin_station, active });
        }
        if let Some(origin) = self.origin_station {
            let phase = registry.station(origin)?.phase();
            if phase != Phase::TransitioningFrom {
                return Err(TransitError::OriginNotActive { station: origin, active, phase });
            }
        }
        Ok(())
    }
}

impl Route {
    /// Check every precondition against the registry without mutating it.
    fn plan(&self, registry: &Registry) -> Result<Plan, TransitError> {
        match self {
            Self::Travel { destination, facilities } => {
                if registry.active() == Some(*destination) {
                    return Err(TransitError::DuplicateActivation { station: *destination });
                }
                registry.state((*destination).into())?.ensure_can_transition(Phase::TransitioningTo)?;

                for &facility in facilities {
                    let record = registry.facility(facility)?;
                    if record.owner != *destination {
                        return Err(TransitError::FacilityOwnerMismatch {
                            facility,
                            owner: record.owner,
                            station: *destination,
                        });
                    }
                    record.state.ensure_can_transition(Phase::TransitioningTo)?;
                }

                let mut plan = Plan {
                    destination_station: Some(*destination),
                    destination_facilities: facilities.clone(),
                    ..Plan::default()
                };

                if let Some(origin) = registry.active() {
                    let station = registry.station(origin)?;
                    if station.phase() != Phase::Active {
                        return Err(TransitError::OriginNotActive {
                            station: origin,
                            active: Some(origin),
                            phase: station.phase(),
                        });
                    }
                    plan.origin_station = Some(origin);
                    plan.origin_facilities = station
                        .facilities
                        .iter()
                        .copied()
                        .filter(|&f| {
                            registry.facility(f).is_ok_and(|f| {
                                matches!(f.phase(), Phase::Active | Phase::TransitioningFrom)
                            })
                        })
                        .collect();
                }
                Ok(plan)
            },

            Self::CheckIn(facilities) => {
                for &facility in facilities {
                    let record = registry.facility(facility)?;
                    let owner_phase = registry.station(record.owner)?.phase();
                    if registry.active() != Some(record.owner) || owner_phase != Phase::Active {
                        return Err(TransitError::OwnerNotActive {
                            facility: record.state.to_string(),
                            owner: record.owner,
                            phase: owner_phase,
                        });
                    }
                    record.state.ensure_can_transition(Phase::TransitioningTo)?;
                }
                Ok(Plan { destination_facilities: facilities.clone(), ..Plan::default() })
            },

            Self::CheckOut(facilities) => {
                for &facility in facilities {
                    let record = registry.facility(facility)?;
                    if registry.active() != Some(record.owner) {
                        return Err(TransitError::OwnerNotActive {
                            facility: record.state.to_string(),
                            owner: record.owner,
                            phase: registry.station(record.owner)?.phase(),
                        });
                    }
                    record.state.ensure_can_transition(Phase::TransitioningFrom)?;
                }
                Ok(Plan { origin_facilities: facilities.clone(), ..Plan::default() })
            },
        }
    }
}

/// What a completed trip observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripReport {
    /// States that were left, facilities before their station.
    pub departed: Vec<StateRef>,
    /// States that were entered, station before its facilities.
    pub arrived: Vec<StateRef>,
    /// Time spent waiting for conditions.
    pub elapsed: Duration,
    /// Number of condition polling rounds.
    pub polls: u32,
    /// Per-condition observations.
    pub conditions: Vec<ConditionReport>,
}

/// A single transition request.
///
/// Build with [`Trip::travel_to`], [`Trip::check_in`] or [`Trip::check_out`]
/// and execute with [`Trip::run`]. A trip is consumed by running it.
pub struct Trip {
    route: Route,
    trigger: Option<Trigger>,
    config: Option<TripConfig>,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl Trip {
    fn new(route: Route) -> Self {
        Self { route, trigger: None, config: None, timeout: None, cancel: None }
    }

    /// Move from the active station (if any) to `destination`.
    ///
    /// The active station's live facilities are left along with it.
    pub fn travel_to(destination: StationId) -> Self {
        Self::new(Route::Travel { destination, facilities: Vec::new() })
    }

    /// Enter a facility of the active station. The station stays active.
    pub fn check_in(facility: FacilityId) -> Self {
        Self::new(Route::CheckIn(vec![facility]))
    }

    /// Leave an active facility. The station stays active.
    pub fn check_out(facility: FacilityId) -> Self {
        Self::new(Route::CheckOut(vec![facility]))
    }

    /// Add a facility to enter (or, for [`Trip::check_out`], leave) as part
    /// of the same trip. Adding the same facility twice has no effect.
    #[must_use]
    pub fn with_facility(mut self, facility: FacilityId) -> Self {
        let facilities = match &mut self.route {
            Route::Travel { facilities, .. }
            | Route::CheckIn(facilities)
            | Route::CheckOut(facilities) => facilities,
        };
        if !facilities.contains(&facility) {
            facilities.push(facility);
        }
        self
    }

    /// Action that makes the application start changing state. Invoked
    /// exactly once, after the origin is marked `TRANSITIONING_FROM`.
    #[must_use]
    pub fn with_trigger(mut self, trigger: impl FnOnce() + Send + 'static) -> Self {
        self.trigger = Some(Box::new(trigger));
        self
    }

    /// Use this configuration instead of the registry's default.
    #[must_use]
    pub fn with_config(mut self, config: TripConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override only the wait bound.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Abandon the condition wait when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Execute the trip.
    ///
    /// Returns only after the destination is `ACTIVE` and the registry's
    /// active station has been reassigned.
    ///
    /// # Errors
    ///
    /// - Misuse errors (`InvalidPhaseTransition`, `DuplicateActivation`,
    ///   `OwnerNotActive`, `FacilityOwnerMismatch`, `OriginNotActive`,
    ///   `UnknownState`) before anything is mutated
    /// - `TransitError::TransitionTimeout` / `TransitError::Cancelled` if the
    ///   wait ends unsatisfied; phases are left partial
    /// - `TransitError::ActiveStationChanged` if another trip reassigned the
    ///   active station during the wait; nothing is committed
    pub async fn run<E: Environment>(
        self,
        traffic: &TrafficControl,
        env: &E,
    ) -> Result<TripReport, TransitError> {
        let Self { route, trigger, config, timeout, cancel } = self;
        let mut config = config.unwrap_or_else(|| traffic.trip_config().clone());
        if let Some(timeout) = timeout {
            config.timeout = timeout;
        }

        let plan = {
            let mut registry = traffic.write();
            let plan = route.plan(&registry)?;
            tracing::info!(trip = %route, origin = ?plan.origin_station, "trip departing");
            for state in plan.origins() {
                if registry.state(state)?.phase() == Phase::Active {
                    registry.advance(state, Phase::TransitioningFrom)?;
                }
            }
            plan
        };

        if let Some(trigger) = trigger {
            trigger();
        }

        let pending = {
            let mut registry = traffic.write();
            let mut pending = Vec::new();
            for state in plan.destinations() {
                registry.advance(state, Phase::TransitioningTo)?;
                let tracked = registry.state(state)?;
                pending.extend(tracked.enter_conditions().iter().map(|c| {
                    PendingCondition::new(tracked.to_string(), ConditionRole::Enter, Arc::clone(c))
                }));
            }
            for state in plan.origins() {
                let tracked = registry.state(state)?;
                pending.extend(tracked.exit_conditions().iter().map(|c| {
                    PendingCondition::new(tracked.to_string(), ConditionRole::Exit, Arc::clone(c))
                }));
            }
            pending
        };

        let waiter = ConditionWaiter::new(env, config.timeout, config.poll_interval)
            .with_cancellation(cancel.as_ref());
        let outcome = match waiter.wait(pending).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(trip = %route, error = %err, "trip stalled");
                return Err(err);
            },
        };

        {
            let mut registry = traffic.write();
            if let Err(err) = plan.ensure_origin_unchanged(&registry) {
                tracing::warn!(trip = %route, error = %err, "trip lost its origin");
                return Err(err);
            }
            for state in plan.destinations() {
                registry.mark_conditions_met(state, true)?;
            }
            for state in plan.origins() {
                registry.mark_conditions_met(state, false)?;
            }

            match plan.origin_station {
                Some(station) => registry.finish_station(station)?,
                None => {
                    for &facility in &plan.origin_facilities {
                        registry.advance(facility.into(), Phase::Finished)?;
                    }
                },
            }
            for state in plan.destinations() {
                registry.advance(state, Phase::Active)?;
            }
            if let Some(station) = plan.destination_station {
                registry.set_active(station)?;
            }
        }

        tracing::info!(trip = %route, elapsed = ?outcome.elapsed, polls = outcome.polls, "trip arrived");
        Ok(TripReport {
            departed: plan.origins(),
            arrived: plan.destinations(),
            elapsed: outcome.elapsed,
            polls: outcome.polls,
            conditions: outcome.reports,
        })
    }
}

impl fmt::Debug for Trip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trip")
            .field("route", &self.route)
            .field("has_trigger", &self.trigger.is_some())
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}
