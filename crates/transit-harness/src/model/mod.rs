//! Model-based testing for the transit registry.
//!
//! Random operation sequences are applied to a simple reference model
//! ([`ModelWorld`]) and to the real registry driven by trips
//! ([`crate::SimDriver`]); results and observable state must agree.

mod operation;
mod world;

pub use operation::{FacilityIdx, ModelKind, Operation, OperationResult, StationIdx};
pub use world::{ModelWorld, ObservableState};
