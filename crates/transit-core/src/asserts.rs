//! Verification of where a test run ended up.
//!
//! Each check reads one [`TrafficSnapshot`], so every mismatch line and the
//! station list describe the same instant even if a trip is still running on
//! another task. `check_*` returns the failure; `assert_*` panics with its
//! rendering for use directly in test bodies.

use std::fmt;

use crate::{
    phase::Phase,
    station::{FacilityId, StationId, StationKind},
    traffic::{TrafficControl, TrafficSnapshot},
};

/// A failed check: the mismatches found and the station list at that time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    /// One line per mismatch.
    pub mismatches: Vec<String>,
    /// Rendered station list, see [`TrafficSnapshot::render_station_list`].
    pub station_list: String,
}

impl AssertionFailure {
    fn new(mismatches: Vec<String>, snapshot: &TrafficSnapshot) -> Self {
        Self { mismatches, station_list: snapshot.render_station_list() }
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.mismatches {
            writeln!(f, "{line}")?;
        }
        f.write_str(&self.station_list)
    }
}

impl std::error::Error for AssertionFailure {}

/// Check that `station` is the active station, in [`Phase::Active`], with
/// every one of `facilities` also active.
///
/// # Errors
///
/// Returns every mismatch found, not just the first.
pub fn check_final_destination(
    traffic: &TrafficControl,
    station: StationId,
    facilities: &[FacilityId],
) -> Result<(), AssertionFailure> {
    let snapshot = traffic.snapshot();
    let describe_station = |id: StationId| {
        snapshot.station(id).map_or_else(|| format!("<{id}: unknown>"), ToString::to_string)
    };
    let mut mismatches = Vec::new();

    if snapshot.active != Some(station) {
        let actual = snapshot.active.map_or_else(|| "null".to_string(), describe_station);
        mismatches.push(format!(
            "Expected final destination to be {}, but was {actual}",
            describe_station(station)
        ));
    }

    if let Some(expected) = snapshot.station(station)
        && expected.phase != Phase::Active
    {
        mismatches.push(format!(
            "Station {expected} expected to be the final one and ACTIVE, but it is {}",
            expected.phase
        ));
    }

    for &id in facilities {
        match snapshot.facility(id) {
            Some(facility) if facility.phase == Phase::Active => {},
            Some(facility) => mismatches.push(format!(
                "Facility {facility} expected to be ACTIVE at the end, but it is in {}",
                facility.phase
            )),
            None => mismatches.push(format!("Facility <{id}: unknown> was never created")),
        }
    }

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(AssertionFailure::new(mismatches, &snapshot))
    }
}

/// Panicking form of [`check_final_destination`].
#[track_caller]
#[allow(clippy::panic, reason = "assertion helper for test bodies")]
pub fn assert_final_destination(
    traffic: &TrafficControl,
    station: StationId,
    facilities: &[FacilityId],
) {
    if let Err(failure) = check_final_destination(traffic, station, facilities) {
        panic!("{failure}");
    }
}

/// Check that the active station is of `kind`.
///
/// `situation` names the point in the test being checked and appears in the
/// message. With `allow_none`, having no active station also passes.
///
/// # Errors
///
/// Returns the mismatch and the station list.
pub fn check_current_station_kind(
    traffic: &TrafficControl,
    kind: StationKind,
    situation: &str,
    allow_none: bool,
) -> Result<(), AssertionFailure> {
    let snapshot = traffic.snapshot();
    let actual = snapshot.active.and_then(|id| snapshot.station(id)).map(|s| s.kind);

    match actual {
        Some(actual) if actual == kind => Ok(()),
        None if allow_none => Ok(()),
        _ => {
            let actual = actual.map_or("null", StationKind::name);
            let line = format!(
                "Expected current station to be of type <{kind}> at <{situation}>, but was actually of type <{actual}>"
            );
            Err(AssertionFailure::new(vec![line], &snapshot))
        },
    }
}

/// Panicking form of [`check_current_station_kind`].
#[track_caller]
#[allow(clippy::panic, reason = "assertion helper for test bodies")]
pub fn assert_current_station_kind(
    traffic: &TrafficControl,
    kind: StationKind,
    situation: &str,
    allow_none: bool,
) {
    if let Err(failure) = check_current_station_kind(traffic, kind, situation, allow_none) {
        panic!("{failure}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        station::{FacilitySpec, StationSpec},
        traffic::TrafficControl,
    };

    const HOME: StationKind = StationKind::new("Home");
    const RESULTS: StationKind = StationKind::new("Results");

    fn activate(traffic: &TrafficControl, id: StationId) {
        let mut registry = traffic.write();
        registry.advance(id.into(), Phase::TransitioningTo).unwrap();
        registry.advance(id.into(), Phase::Active).unwrap();
        registry.set_active(id).unwrap();
    }

    #[test]
    fn empty_registry_passes_kind_check_only_when_none_allowed() {
        let traffic = TrafficControl::new();
        check_current_station_kind(&traffic, HOME, "init", true).unwrap();

        let failure = check_current_station_kind(&traffic, HOME, "init", false).unwrap_err();
        insta::assert_snapshot!(
            failure.to_string(),
            @"Expected current station to be of type <Home> at <init>, but was actually of type <null>"
        );
    }

    #[test]
    fn kind_check_compares_by_value() {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME).named("Home (guest)"));
        activate(&traffic, home);

        check_current_station_kind(&traffic, HOME, "after login", false).unwrap();
        let failure = check_current_station_kind(&traffic, RESULTS, "search", true).unwrap_err();
        assert_eq!(failure.mismatches, vec![
            "Expected current station to be of type <Results> at <search>, but was actually of type <Home>"
                .to_string()
        ]);
    }

    #[test]
    fn final_destination_reports_every_mismatch_with_station_list() {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME));
        let results = traffic.create_station(StationSpec::new(RESULTS));
        let bar = traffic.create_facility(home, FacilitySpec::new("SearchBar")).unwrap();
        activate(&traffic, results);

        let failure = check_final_destination(&traffic, home, &[bar]).unwrap_err();
        insta::assert_snapshot!(failure.to_string(), @r"
        Expected final destination to be <S1: Home>, but was <S2: Results>
        Station <S1: Home> expected to be the final one and ACTIVE, but it is NEW
        Facility <F1: SearchBar> expected to be ACTIVE at the end, but it is in NEW
          [1] (NEW) <S1: Home>
          [2] (ACT) <S2: Results>
        ");
    }

    #[test]
    fn final_destination_passes_for_active_station() {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME));
        activate(&traffic, home);

        check_final_destination(&traffic, home, &[]).unwrap();
        assert_final_destination(&traffic, home, &[]);
    }

    #[test]
    #[should_panic(expected = "Expected final destination to be <S1: Home>, but was null")]
    fn assert_final_destination_panics_with_rendering() {
        let traffic = TrafficControl::new();
        let home = traffic.create_station(StationSpec::new(HOME));
        assert_final_destination(&traffic, home, &[]);
    }
}
