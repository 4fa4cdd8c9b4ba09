//! Transit core
//!
//! Race-free orchestration of UI test steps. The application under test is
//! modelled as a sequence of screens (stations) with sub-components
//! (facilities), each moving through a forward-only phase lifecycle. A test
//! moves between them with trips that fire an action and wait until the
//! application has observably arrived, so assertions never race against
//! asynchronous UI transitions.
//!
//! # Architecture
//!
//! ```text
//! TransitAsserts ──query──> TrafficControl ──> ConditionalState
//! Trip ──────────mutate───> TrafficControl ──> phase changes
//! ```
//!
//! Time flows through the [`Environment`] trait: production code waits on
//! [`SystemEnv`], simulations plug in a virtual clock. The only suspension
//! point is the bounded condition wait inside [`Trip::run`].
//!
//! # Components
//!
//! - [`TrafficControl`]: registry of stations, facilities and the active
//!   station
//! - [`Trip`]: transition engine
//! - [`Condition`]: collaborator that inspects the application
//! - [`check_final_destination`] / [`check_current_station_kind`]: end-state
//!   verification

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod asserts;
pub mod condition;
pub mod env;
pub mod error;
pub mod phase;
pub mod state;
pub mod station;
mod system_env;
pub mod traffic;
pub mod trip;

pub use asserts::{
    AssertionFailure, assert_current_station_kind, assert_final_destination,
    check_current_station_kind, check_final_destination,
};
pub use condition::{
    Condition, ConditionReport, ConditionRole, ConditionStatus, SharedCondition, WaitOutcome,
};
pub use env::Environment;
pub use error::TransitError;
pub use phase::Phase;
pub use state::ConditionalState;
pub use station::{FacilityId, FacilitySpec, StateRef, StationId, StationKind, StationSpec};
pub use system_env::SystemEnv;
pub use tokio_util::sync::CancellationToken;
pub use traffic::{FacilitySnapshot, PhaseChange, StationSnapshot, TrafficControl, TrafficSnapshot};
pub use trip::{DEFAULT_POLL_INTERVAL, DEFAULT_TRIP_TIMEOUT, Trip, TripConfig, TripReport};
