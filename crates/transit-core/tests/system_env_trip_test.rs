//! Trips on the real clock.
//!
//! Kept short: the timings here are wall-clock, so the assertions only use
//! lower bounds.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use transit_core::{
    Phase, StationKind, StationSpec, SystemEnv, TrafficControl, Trip, TripConfig,
    assert_final_destination, condition,
};

const HOME: StationKind = StationKind::new("Home");
const RESULTS: StationKind = StationKind::new("Results");

fn fast_config() -> TripConfig {
    TripConfig { timeout: Duration::from_millis(200), poll_interval: Duration::from_millis(5) }
}

#[tokio::test]
async fn trip_waits_for_condition_set_by_trigger() {
    let env = SystemEnv::new();
    let traffic = TrafficControl::new().with_trip_config(fast_config());
    let shown = Arc::new(AtomicBool::new(false));
    let probe = Arc::clone(&shown);
    let home = traffic.create_station(
        StationSpec::new(HOME)
            .with_enter_condition(condition::from_fn("home shown", move || {
                probe.load(Ordering::SeqCst)
            })),
    );

    let report = Trip::travel_to(home)
        .with_trigger(move || shown.store(true, Ordering::SeqCst))
        .run(&traffic, &env)
        .await
        .unwrap();

    assert_eq!(report.polls, 1);
    assert_final_destination(&traffic, home, &[]);
}

#[tokio::test]
async fn trip_times_out_on_real_clock() {
    let env = SystemEnv::new();
    let traffic = TrafficControl::new().with_trip_config(fast_config());
    let home = traffic.create_station(StationSpec::new(HOME));
    Trip::travel_to(home).run(&traffic, &env).await.unwrap();
    let results = traffic.create_station(
        StationSpec::new(RESULTS).with_enter_condition(condition::from_fn("never", || false)),
    );

    let err = Trip::travel_to(results)
        .with_timeout(Duration::from_millis(30))
        .run(&traffic, &env)
        .await
        .unwrap_err();

    match err {
        transit_core::TransitError::TransitionTimeout { elapsed, unsatisfied } => {
            assert!(elapsed >= Duration::from_millis(30));
            assert_eq!(unsatisfied.len(), 1);
        },
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(traffic.phase(results), Some(Phase::TransitioningTo));
    assert_eq!(traffic.active_station(), Some(home));
}
