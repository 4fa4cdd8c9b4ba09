//! Operations for model-based testing.
//!
//! Operations represent every action a test can take against the registry.
//! They are generated randomly by proptest (or decoded from fuzz input) and
//! applied to both the model and the real implementation.

use arbitrary::Arbitrary;

/// Index into the stations created so far, taken modulo their count.
pub type StationIdx = u8;

/// Index into the facilities created so far, taken modulo their count.
pub type FacilityIdx = u8;

/// Screen kinds available to generated stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum ModelKind {
    /// Landing screen.
    Home,
    /// Search results.
    Results,
    /// Item details.
    Details,
}

impl ModelKind {
    /// Kind tag name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Results => "Results",
            Self::Details => "Details",
        }
    }
}

/// Operations that can be applied to the system.
///
/// Indices are resolved against what exists at the time the operation is
/// applied, so any sequence is meaningful. Operations that reference nothing
/// (no stations yet) are skipped.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Declare a new station.
    CreateStation {
        /// Kind of the station.
        kind: ModelKind,
    },

    /// Declare a facility on an existing station.
    CreateFacility {
        /// Owning station.
        station: StationIdx,
    },

    /// Travel from the active station to another one.
    TravelTo {
        /// Destination station.
        station: StationIdx,
        /// Facility to enter along with the destination.
        facility: Option<FacilityIdx>,
        /// Whether the application ever reaches the destination. If not, the
        /// trip times out.
        arrives: bool,
    },

    /// Enter a facility of the active station.
    CheckIn {
        /// Facility to enter.
        facility: FacilityIdx,
        /// Whether the facility ever shows up.
        arrives: bool,
    },

    /// Leave an active facility.
    CheckOut {
        /// Facility to leave.
        facility: FacilityIdx,
    },
}

/// Outcome of applying an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation completed.
    Ok,
    /// Operation referenced nothing and was not attempted.
    Skipped,
    /// Operation was rejected as misuse; nothing changed.
    Rejected,
    /// Trip waited out its bound; phases are left partial.
    TimedOut,
}

impl OperationResult {
    /// Returns true for [`OperationResult::Ok`].
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}
