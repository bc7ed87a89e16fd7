//! Tests for advancing particles along a single track.

mod common;

use common::track;
use std::f32::consts::FRAC_PI_2;
use street_flow::simulation::{
    CarParticle, Location, Orientation, PhysicsEngine, StreetId, StreetProgress, Vec2,
};

const EPSILON: f32 = 1e-4;

fn car_at(track: &street_flow::simulation::Track, offset: f32, speed: f32) -> CarParticle {
    let mut car = CarParticle::placed(StreetId(0), track, offset, 0);
    car.speed = speed;
    car
}

#[test]
fn speed_approaches_limit_without_overshoot() {
    let physics = PhysicsEngine::new(4.0, 6.0);
    assert!((physics.approach_speed(0.0, 10.0, 1.0) - 4.0).abs() < EPSILON);
    assert_eq!(physics.approach_speed(0.0, 10.0, 5.0), 10.0);
    assert!((physics.approach_speed(20.0, 10.0, 1.0) - 14.0).abs() < EPSILON);
    assert_eq!(physics.approach_speed(20.0, 10.0, 5.0), 10.0);
    assert_eq!(physics.approach_speed(10.0, 10.0, 1.0), 10.0);
}

#[test]
fn particle_interpolates_within_segment() {
    let physics = PhysicsEngine::new(4.0, 6.0);
    let t = track(&[[0.0, 0.0, 0.0], [100.0, 0.0, 0.0]], 10.0);
    let mut car = car_at(&t, 0.0, 10.0);

    assert_eq!(physics.advance_on_street(&mut car, &t, 1.0), StreetProgress::Moving);
    assert!((car.position.x - 10.0).abs() < EPSILON);
    assert!((car.segment_dist - 10.0).abs() < EPSILON);
    assert_eq!(car.segment, 0);
}

#[test]
fn particle_crosses_several_segments_in_one_step() {
    let physics = PhysicsEngine::new(4.0, 6.0);
    let t = track(
        &[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 2.0, 0.0], [10.0, 30.0, 0.0]],
        10.0,
    );
    let mut car = car_at(&t, 0.0, 10.0);

    // 15 units: all of segment 0 (10), all of segment 1 (2), 3 into segment 2
    assert_eq!(physics.advance_on_street(&mut car, &t, 1.5), StreetProgress::Moving);
    assert_eq!(car.segment, 2);
    assert!((car.segment_dist - 3.0).abs() < EPSILON);
    assert!((car.position.x - 10.0).abs() < EPSILON);
    assert!((car.position.y - 5.0).abs() < EPSILON);

    let heading = car.orientation.heading().expect("moving car is oriented");
    assert!(heading.x.abs() < EPSILON);
    assert!(heading.y < 0.0, "render plane flips y, got {:?}", heading);
}

#[test]
fn completing_a_street_reports_leftover_time() {
    let physics = PhysicsEngine::new(4.0, 6.0);
    let t = track(&[[0.0, 0.0, 0.0], [100.0, 0.0, 0.0]], 10.0);
    let mut car = car_at(&t, 95.0, 10.0);

    match physics.advance_on_street(&mut car, &t, 1.0) {
        StreetProgress::Completed { leftover } => assert!((leftover - 0.5).abs() < EPSILON),
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(car.position.x, 100.0);
    assert_eq!(car.segment, 0);
    assert_eq!(car.segment_dist, 100.0);
}

#[test]
fn stationary_particle_at_the_end_completes_with_no_time() {
    let physics = PhysicsEngine::new(4.0, 6.0);
    let t = track(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]], 0.0);
    let mut car = car_at(&t, 10.0, 0.0);

    assert_eq!(
        physics.advance_on_street(&mut car, &t, 0.5),
        StreetProgress::Completed { leftover: 0.0 }
    );
}

#[test]
fn degenerate_track_completes_immediately() {
    let physics = PhysicsEngine::new(4.0, 6.0);
    let t = track(&[[3.0, 4.0, 0.0]], 10.0);
    let mut car = car_at(&t, 0.0, 0.0);

    assert_eq!(
        physics.advance_on_street(&mut car, &t, 0.25),
        StreetProgress::Completed { leftover: 0.25 }
    );
    assert_eq!(car.position.x, 3.0);
    assert_eq!(car.orientation, Orientation::Unoriented);
}

#[test]
fn rotation_follows_heading() {
    let east = Orientation::from_heading(Vec2::new(5.0, 0.0)).expect("non-zero heading");
    assert!(east.rotation().expect("oriented").angle().abs() < EPSILON);

    let down = Orientation::from_heading(Vec2::new(0.0, -3.0)).expect("non-zero heading");
    assert!((down.rotation().expect("oriented").angle() + FRAC_PI_2).abs() < EPSILON);

    assert_eq!(Orientation::from_heading(Vec2::zeros()), None);
}

#[test]
fn placement_starts_stationary_on_the_street() {
    let t = track(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 10.0, 0.0]], 10.0);
    let car = CarParticle::placed(StreetId(3), &t, 15.0, 2);

    assert_eq!(car.location, Location::Street(StreetId(3)));
    assert_eq!(car.segment, 1);
    assert!((car.segment_dist - 5.0).abs() < EPSILON);
    assert!((car.position.y - 5.0).abs() < EPSILON);
    assert_eq!(car.speed, 0.0);
    assert_eq!(car.variant, 2);
    assert!(!car.is_waiting());
}
