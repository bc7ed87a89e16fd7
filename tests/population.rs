//! Tests for capacity, target counts and particle placement.

mod common;

use common::{single_street_network, straight, street};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use street_flow::simulation::{
    street_capacity, Density, Location, NetworkModel, SimulationState, StreetId, TrafficManager,
};

fn two_street_network() -> NetworkModel {
    NetworkModel::new(
        vec![
            straight(20.0, 10.0, None),
            street(&[[0.0, 50.0, 0.0], [10.0, 50.0, 0.0]], 10.0, None),
        ],
        Vec::new(),
        HashMap::new(),
        vec![StreetId(1)],
        vec![1.0],
    )
    .expect("valid network")
}

#[test]
fn street_capacity_grows_with_length() {
    assert_eq!(street_capacity(0.0, 5.0), 1);
    assert_eq!(street_capacity(4.9, 5.0), 1);
    assert_eq!(street_capacity(5.0, 5.0), 2);
    assert_eq!(street_capacity(100.0, 8.1), 13);

    let mut previous = 0;
    for step in 0..500 {
        let capacity = street_capacity(step as f32 * 0.7, 8.1);
        assert!(capacity >= previous, "capacity dropped at length {}", step as f32 * 0.7);
        previous = capacity;
    }
}

#[test]
fn density_orders_target_counts() {
    for capacity in [0, 1, 2, 3, 14, 15, 100, 9000] {
        let low = Density::Low.target_count(capacity);
        let medium = Density::Medium.target_count(capacity);
        let high = Density::High.target_count(capacity);
        assert!(high >= medium && medium >= low, "capacity {}: {} {} {}", capacity, low, medium, high);
    }
    assert_eq!(Density::Low.target_count(100), 20);
    assert_eq!(Density::Medium.target_count(100), 33);
    assert_eq!(Density::High.target_count(100), 100);
}

#[test]
fn capacity_is_summed_and_capped() {
    let network = two_street_network();
    // 20 / 5 + 1 = 5 and 10 / 5 + 1 = 3
    assert_eq!(TrafficManager::new(9000, 4).capacity(&network, 5.0), 8);
    assert_eq!(TrafficManager::new(6, 4).capacity(&network, 5.0), 6);
    assert_eq!(TrafficManager::new(9000, 4).target_count(&network, 5.0, Density::Low), 1);
}

#[test]
fn initial_placement_packs_backward_round_robin() {
    let network = two_street_network();
    let traffic = TrafficManager::new(9000, 4);
    let mut rng = StdRng::seed_from_u64(11);

    let cars = traffic.initial_placement(&network, 5.0, 4, &mut rng);

    assert_eq!(cars.len(), 4);
    let placed: Vec<(Location, f32)> = cars.iter().map(|c| (c.location, c.position.x)).collect();
    assert_eq!(
        placed,
        vec![
            (Location::Street(StreetId(0)), 20.0),
            (Location::Street(StreetId(1)), 10.0),
            (Location::Street(StreetId(0)), 15.0),
            (Location::Street(StreetId(1)), 5.0),
        ]
    );
    assert!(cars.iter().all(|car| car.speed == 0.0 && car.variant < 4));
}

#[test]
fn initial_placement_stops_when_streets_are_full() {
    let network = two_street_network();
    let traffic = TrafficManager::new(9000, 4);
    let mut rng = StdRng::seed_from_u64(12);

    let cars = traffic.initial_placement(&network, 5.0, 100, &mut rng);

    assert_eq!(cars.len(), traffic.capacity(&network, 5.0));
    let on_first = cars
        .iter()
        .filter(|car| car.location == Location::Street(StreetId(0)))
        .count();
    assert_eq!(on_first, 5);
}

#[test]
fn initial_placement_fills_every_capacity_slot() {
    let traffic = TrafficManager::new(9000, 4);
    let mut rng = StdRng::seed_from_u64(15);

    // 162 / 8.1 lands exactly on a slot boundary
    let network = single_street_network(162.0, 10.0);
    let capacity = traffic.capacity(&network, 8.1);
    assert_eq!(capacity, street_capacity(162.0, 8.1));

    let cars = traffic.initial_placement(&network, 8.1, capacity, &mut rng);
    assert_eq!(cars.len(), capacity);
    assert!(cars.iter().all(|car| car.position.x >= 0.0 && car.position.x <= 162.0));
    assert_eq!(cars[0].position.x, 162.0);

    for step in 1..400 {
        let length = step as f32 * 0.9;
        let network = single_street_network(length, 10.0);
        let capacity = traffic.capacity(&network, 8.1);
        let cars = traffic.initial_placement(&network, 8.1, usize::MAX, &mut rng);
        assert_eq!(cars.len(), capacity, "length {}", length);
    }
}

#[test]
fn reconcile_grows_and_shrinks_to_target() {
    let network = two_street_network();
    let traffic = TrafficManager::new(9000, 4);
    let mut rng = StdRng::seed_from_u64(13);
    let mut state = SimulationState::new();

    assert_eq!(traffic.reconcile(&network, &mut state, 7, &mut rng), 7);
    assert_eq!(state.active_cars(), 7);
    assert_eq!(state.total_spawned, 7);

    assert_eq!(traffic.reconcile(&network, &mut state, 7, &mut rng), 0);
    assert_eq!(state.active_cars(), 7);

    let leading = state.cars[..2].to_vec();
    assert_eq!(traffic.reconcile(&network, &mut state, 2, &mut rng), -5);
    assert_eq!(state.active_cars(), 2);
    assert_eq!(state.cars, leading);
}

#[test]
fn random_spawns_use_entry_streets_only() {
    let network = two_street_network();
    let traffic = TrafficManager::new(9000, 4);
    let mut rng = StdRng::seed_from_u64(14);

    for _ in 0..200 {
        let car = traffic.spawn_random(&network, &mut rng).expect("network has an entry");
        assert_eq!(car.location, Location::Street(StreetId(1)));
        assert!(car.position.x >= 0.0 && car.position.x < 10.0);
        assert_eq!(car.position.y, 50.0);
    }

    assert!(traffic.spawn_random(&NetworkModel::default(), &mut rng).is_none());
}
