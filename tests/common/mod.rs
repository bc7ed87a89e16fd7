#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::{HashMap, VecDeque};
use street_flow::simulation::{
    cumulative_probabilities, ConnectorPath, Intersection, IntersectionId, NetworkModel, PathId,
    Point, Street, StreetId, Track,
};

pub fn track(points: &[[f32; 3]], speed_limit: f32) -> Track {
    Track::from_points(
        points.iter().map(|&[x, y, z]| Point::new(x, y, z)).collect(),
        speed_limit,
    )
}

pub fn street(points: &[[f32; 3]], speed_limit: f32, in_to: Option<u32>) -> Street {
    Street {
        track: track(points, speed_limit),
        in_to: in_to.map(IntersectionId),
    }
}

/// Street along the x axis from the origin.
pub fn straight(length: f32, speed_limit: f32, in_to: Option<u32>) -> Street {
    street(&[[0.0, 0.0, 0.0], [length, 0.0, 0.0]], speed_limit, in_to)
}

/// Single street of the given length that runs off the network edge.
pub fn single_street_network(length: f32, speed_limit: f32) -> NetworkModel {
    NetworkModel::new(
        vec![straight(length, speed_limit, None)],
        Vec::new(),
        HashMap::new(),
        vec![StreetId(0)],
        vec![1.0],
    )
    .expect("single street network is valid")
}

/// Street 0 runs into intersection 1, which fans out onto streets 1 and 2
/// with the given cumulative probabilities. Street 0 is the only entry.
pub fn fork_network(cumulative: Vec<f32>, stop: bool, with_paths: bool) -> NetworkModel {
    let streets = vec![
        straight(100.0, 10.0, Some(1)),
        street(&[[110.0, 0.0, 0.0], [210.0, 0.0, 0.0]], 10.0, None),
        street(&[[100.0, 10.0, 0.0], [100.0, 110.0, 0.0]], 10.0, None),
    ];

    let mut paths = Vec::new();
    let mut intersection = Intersection {
        outbound: vec![StreetId(1), StreetId(2)],
        stop,
        ..Default::default()
    };
    intersection.probabilities.insert(StreetId(0), cumulative);

    if with_paths {
        paths.push(ConnectorPath {
            track: track(&[[100.0, 0.0, 0.0], [110.0, 0.0, 0.0]], 5.0),
            in_to: StreetId(1),
        });
        paths.push(ConnectorPath {
            track: track(&[[100.0, 0.0, 0.0], [100.0, 10.0, 0.0]], 5.0),
            in_to: StreetId(2),
        });
        intersection
            .paths
            .insert(StreetId(0), vec![PathId(0), PathId(1)]);
    }

    let mut intersections = HashMap::new();
    intersections.insert(IntersectionId(1), intersection);

    NetworkModel::new(
        streets,
        paths,
        intersections,
        vec![StreetId(0)],
        cumulative_probabilities(&[1.0]).expect("positive weight"),
    )
    .expect("fork network is valid")
}

/// RNG that hands out scripted `[0, 1)` draws first, then defers to a
/// seeded generator.
pub struct ScriptedRng {
    draws: VecDeque<u32>,
    fallback: StdRng,
}

impl ScriptedRng {
    pub fn new(draws: &[f32]) -> Self {
        Self {
            draws: draws
                .iter()
                .map(|&r| ((r * (1u32 << 24) as f32) as u32) << 8)
                .collect(),
            fallback: StdRng::seed_from_u64(7),
        }
    }
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        self.draws
            .pop_front()
            .unwrap_or_else(|| self.fallback.next_u32())
    }

    fn next_u64(&mut self) -> u64 {
        self.fallback.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.fallback.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fallback.try_fill_bytes(dest)
    }
}
