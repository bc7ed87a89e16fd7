use super::{CarParticle, NetworkModel, SimulationState, StreetId};
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Share of network capacity to fill with particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Low,
    #[default]
    Medium,
    High,
}

impl Density {
    pub fn target_count(self, capacity: usize) -> usize {
        match self {
            Density::Low => capacity / 5,
            Density::Medium => capacity / 3,
            Density::High => capacity,
        }
    }
}

/// Number of particles that fit on a street of `total_distance` when packed
/// `spacing` apart, counting both ends.
pub fn street_capacity(total_distance: f32, spacing: f32) -> usize {
    if !(spacing > 0.0) || !(total_distance > 0.0) {
        return 1;
    }
    (total_distance / spacing).floor() as usize + 1
}

/// Keeps the particle population at its target size.
#[derive(Debug, Clone)]
pub struct TrafficManager {
    max_cars: usize,
    variant_count: u32,
}

impl TrafficManager {
    pub fn new(max_cars: usize, variant_count: u32) -> Self {
        Self {
            max_cars,
            variant_count: variant_count.max(1),
        }
    }

    /// Summed street capacity, capped at the configured maximum.
    pub fn capacity(&self, network: &NetworkModel, spacing: f32) -> usize {
        network
            .streets()
            .iter()
            .map(|street| street_capacity(street.track.total_distance, spacing))
            .sum::<usize>()
            .min(self.max_cars)
    }

    pub fn target_count(&self, network: &NetworkModel, spacing: f32, density: Density) -> usize {
        density.target_count(self.capacity(network, spacing))
    }

    /// Grows or shrinks the population to `target`. Returns the signed change.
    pub fn reconcile<R: Rng + ?Sized>(
        &self,
        network: &NetworkModel,
        state: &mut SimulationState,
        target: usize,
        rng: &mut R,
    ) -> isize {
        let before = state.cars.len();

        if before > target {
            state.cars.truncate(target);
        }

        while state.cars.len() < target {
            match self.spawn_random(network, rng) {
                Some(car) => state.add_car(car),
                None => {
                    warn!("No entry street available, population stuck at {}", state.cars.len());
                    break;
                }
            }
        }

        let after = state.cars.len();
        if after != before {
            debug!("Population adjusted {} -> {} (target {})", before, after, target);
        }
        after as isize - before as isize
    }

    /// A particle at a random offset along a weighted-random entry street.
    pub fn spawn_random<R: Rng + ?Sized>(
        &self,
        network: &NetworkModel,
        rng: &mut R,
    ) -> Option<CarParticle> {
        let id = network.pick_start_street(rng.gen())?;
        let track = &network.street(id)?.track;
        let offset = if track.total_distance > 0.0 {
            rng.gen_range(0.0..track.total_distance)
        } else {
            0.0
        };
        Some(CarParticle::placed(id, track, offset, self.random_variant(rng)))
    }

    /// Packs up to `count` particles backward from every street's terminal
    /// end, `spacing` apart, visiting streets round-robin. Each street gets
    /// at most `street_capacity` slots. Positions are deterministic; only
    /// variants are drawn from `rng`.
    pub fn initial_placement<R: Rng + ?Sized>(
        &self,
        network: &NetworkModel,
        spacing: f32,
        count: usize,
        rng: &mut R,
    ) -> Vec<CarParticle> {
        let mut cars = Vec::with_capacity(count.min(self.max_cars));
        if !(spacing > 0.0) {
            return cars;
        }

        let slots: Vec<(StreetId, usize)> = network
            .streets()
            .iter()
            .enumerate()
            .filter(|(_, street)| !street.track.points.is_empty())
            .map(|(index, street)| {
                (StreetId(index), street_capacity(street.track.total_distance, spacing))
            })
            .collect();
        let rounds = slots.iter().map(|(_, count)| *count).max().unwrap_or(0);

        'rounds: for slot in 0..rounds {
            for (id, street_slots) in &slots {
                if cars.len() >= count {
                    break 'rounds;
                }
                if slot >= *street_slots {
                    continue;
                }
                if let Some(street) = network.street(*id) {
                    // Computed per slot so rounding never drops the last one
                    let offset = (street.track.total_distance - slot as f32 * spacing).max(0.0);
                    let variant = self.random_variant(rng);
                    cars.push(CarParticle::placed(*id, &street.track, offset, variant));
                }
            }
        }

        debug!("Initial placement put {} of {} requested cars", cars.len(), count);
        cars
    }

    fn random_variant<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(0..self.variant_count)
    }
}
