//! Deterministic simulation harness for transit testing.
//!
//! Virtual-clock implementation of the [`transit_core::Environment`] trait
//! plus a scripted application, so trips, timeouts and cancellations run
//! reproducibly and instantly.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real registry
//! (through [`SimDriver`]), and their observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks over registry snapshots. Use [`InvariantRegistry::standard()`] for
//! the station/facility invariants.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_app;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    ActiveStationLive, FacilitiesFinishBeforeOwner, FacilityRequiresActiveOwner, Invariant,
    InvariantRegistry, InvariantResult, PhaseProgression, SingleActiveStation, Violation,
};
pub use model::{
    FacilityIdx, ModelKind, ModelWorld, ObservableState, Operation, OperationResult, StationIdx,
};
pub use sim_app::SimApp;
pub use sim_driver::{SIM_POLL_INTERVAL, SIM_TRIP_TIMEOUT, SimDriver, kind_tag};
pub use sim_env::SimEnv;

/// Install a `tracing` subscriber for tests.
///
/// Honors `RUST_LOG` (default `warn`) and writes through the test harness
/// capture. Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter)
        .try_init();
}
