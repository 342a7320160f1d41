mod support;

use bevy_ecs::prelude::World;
use qsr_core::clock::{EventKind, EventSubject, SimulationClock, ONE_MIN_MS};
use qsr_core::ecs::{AbandonmentPolicy, Channel, ResourceKind};
use qsr_core::error::SimError;
use qsr_core::test_helpers::{create_test_world, quiet_config, spawn_test_customer};

use support::schedule::ScheduleRunner;

fn quiet_world() -> World {
    create_test_world(&quiet_config(), 3)
}

fn schedule(world: &mut World, at: u64, kind: EventKind, subject: EventSubject) {
    world
        .resource_mut::<SimulationClock>()
        .schedule(at, kind, subject)
        .expect("schedule");
}

fn expect_invariant(world: &mut World) -> SimError {
    let err = ScheduleRunner::new()
        .run_one(world)
        .expect_err("step should fail");
    assert!(err.is_invariant_violation(), "unexpected error {err}");
    err
}

#[test]
fn event_for_departed_customer_is_reported() {
    let mut world = quiet_world();
    let ghost = spawn_test_customer(
        &mut world,
        1,
        Channel::WalkIn,
        vec![ResourceKind::Cashier],
        AbandonmentPolicy::Never,
    );
    world.despawn(ghost);
    schedule(
        &mut world,
        2 * ONE_MIN_MS,
        EventKind::ServiceComplete,
        EventSubject::Stage(ghost, ResourceKind::Cashier),
    );

    let err = expect_invariant(&mut world);
    match err {
        SimError::Invariant { at_ms, trace, .. } => {
            assert_eq!(at_ms, 2 * ONE_MIN_MS);
            assert_eq!(trace.last().map(|e| e.kind), Some(EventKind::ServiceComplete));
        }
        other => panic!("expected invariant, got {other}"),
    }
}

#[test]
fn departure_before_service_is_reported() {
    let mut world = quiet_world();
    let customer = spawn_test_customer(
        &mut world,
        1,
        Channel::WalkIn,
        vec![ResourceKind::Cashier],
        AbandonmentPolicy::Never,
    );
    schedule(&mut world, 0, EventKind::Departure, EventSubject::Customer(customer));

    expect_invariant(&mut world);
}

#[test]
fn renege_without_pending_timer_is_reported() {
    let mut world = quiet_world();
    let customer = spawn_test_customer(
        &mut world,
        1,
        Channel::Mobile,
        vec![ResourceKind::Packer],
        AbandonmentPolicy::Renege {
            patience_ms: ONE_MIN_MS,
        },
    );
    schedule(&mut world, ONE_MIN_MS, EventKind::Renege, EventSubject::Customer(customer));

    let err = expect_invariant(&mut world);
    assert!(err.to_string().contains("fired twice"));
}

#[test]
fn service_start_for_wrong_stage_is_reported() {
    let mut world = quiet_world();
    let customer = spawn_test_customer(
        &mut world,
        1,
        Channel::WalkIn,
        vec![ResourceKind::Cashier, ResourceKind::Packer],
        AbandonmentPolicy::Never,
    );
    schedule(
        &mut world,
        0,
        EventKind::ServiceStart,
        EventSubject::Stage(customer, ResourceKind::Packer),
    );

    expect_invariant(&mut world);
}

#[test]
fn arrival_addressed_to_a_customer_is_reported() {
    let mut world = quiet_world();
    let customer = spawn_test_customer(
        &mut world,
        1,
        Channel::WalkIn,
        vec![ResourceKind::Cashier],
        AbandonmentPolicy::Never,
    );
    schedule(&mut world, 0, EventKind::Arrival, EventSubject::Customer(customer));

    expect_invariant(&mut world);
}

#[test]
fn fault_stops_the_run_at_the_failing_step() {
    let mut world = quiet_world();
    let ghost = world.spawn_empty().id();
    world.despawn(ghost);
    schedule(&mut world, ONE_MIN_MS, EventKind::Departure, EventSubject::Customer(ghost));
    schedule(
        &mut world,
        2 * ONE_MIN_MS,
        EventKind::Arrival,
        EventSubject::Channel(Channel::WalkIn),
    );

    let mut runner = ScheduleRunner::new();
    let err = runner.run_full(&mut world).expect_err("run should abort");
    assert!(err.is_invariant_violation());
    let clock = world.resource::<SimulationClock>();
    assert_eq!(clock.now(), ONE_MIN_MS);
    assert_eq!(clock.len(), 1, "later events are left untouched");
}

#[test]
fn brew_completion_without_a_running_brew_is_reported() {
    let mut world = quiet_world();
    schedule(&mut world, ONE_MIN_MS, EventKind::BrewComplete, EventSubject::CoffeeUrns);

    let err = expect_invariant(&mut world);
    assert!(err.to_string().contains("coffee brew"));
}
