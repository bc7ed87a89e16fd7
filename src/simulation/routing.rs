use super::{CarParticle, IntersectionId, Location, NetworkModel, PathId, StreetId};
use log::debug;
use rand::Rng;

/// What happened to a particle that finished its track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// Moved onto a new track with `remaining` seconds of the frame left.
    Continue { remaining: f32 },
    /// Stopped at an intersection; the wait runs into later frames.
    Waiting,
    /// Left the network and was put back at an entry street.
    Respawned,
}

/// Decides where particles go once they reach the end of a street or path.
#[derive(Debug, Clone)]
pub struct RoutingEngine {
    wait_duration: f32,
    variant_count: u32,
}

impl RoutingEngine {
    pub fn new(wait_duration: f32, variant_count: u32) -> Self {
        Self {
            wait_duration: wait_duration.max(0.0),
            variant_count: variant_count.max(1),
        }
    }

    pub fn transition<R: Rng + ?Sized>(
        &self,
        network: &NetworkModel,
        car: &mut CarParticle,
        remaining: f32,
        rng: &mut R,
    ) -> Transition {
        match car.location {
            Location::Intersection { path, .. } => {
                self.leave_intersection(network, car, path, remaining, rng)
            }
            Location::Street(street) => self.enter_intersection(network, car, street, remaining, rng),
        }
    }

    fn leave_intersection<R: Rng + ?Sized>(
        &self,
        network: &NetworkModel,
        car: &mut CarParticle,
        path: PathId,
        remaining: f32,
        rng: &mut R,
    ) -> Transition {
        match network.path(path) {
            Some(path) => {
                Self::move_to_street_start(network, car, path.in_to);
                Transition::Continue { remaining }
            }
            None => self.respawn(network, car, rng),
        }
    }

    fn enter_intersection<R: Rng + ?Sized>(
        &self,
        network: &NetworkModel,
        car: &mut CarParticle,
        inbound: StreetId,
        remaining: f32,
        rng: &mut R,
    ) -> Transition {
        let Some(street) = network.street(inbound) else {
            return self.respawn(network, car, rng);
        };
        if street.track.is_degenerate() {
            debug!("Street {} has no segments, respawning", inbound.0);
            return self.respawn(network, car, rng);
        }
        let Some(intersection_id) = street.in_to else {
            return self.respawn(network, car, rng);
        };
        let Some(intersection) = network
            .intersection(intersection_id)
            .filter(|intersection| !intersection.is_dead_end())
        else {
            debug!("Intersection {} has no way out, respawning", intersection_id.0);
            return self.respawn(network, car, rng);
        };

        let r: f32 = rng.gen();
        let Some(outbound) = intersection.choose_outbound(inbound, r) else {
            debug!(
                "Draw {:.4} from street {} missed every bucket at intersection {}, respawning",
                r, inbound.0, intersection_id.0
            );
            return self.respawn(network, car, rng);
        };

        match network.find_path(intersection_id, inbound, outbound) {
            None => {
                Self::move_to_street_start(network, car, outbound);
                Transition::Continue { remaining }
            }
            Some(path) => self.enter_path(network, car, intersection_id, path, intersection.stop, remaining),
        }
    }

    fn enter_path(
        &self,
        network: &NetworkModel,
        car: &mut CarParticle,
        intersection: IntersectionId,
        path: PathId,
        stop: bool,
        remaining: f32,
    ) -> Transition {
        car.location = Location::Intersection { intersection, path };
        car.segment = 0;
        car.segment_dist = 0.0;

        let track = network.path(path).map(|path| &path.track);
        if let Some(origin) = track.and_then(|track| track.origin()) {
            car.position = origin;
        }

        if stop {
            car.speed = 0.0;
            if remaining < self.wait_duration {
                car.waiting = self.wait_duration - remaining;
                return Transition::Waiting;
            }
            return Transition::Continue {
                remaining: remaining - self.wait_duration,
            };
        }

        if let Some(heading) = track.and_then(|track| track.heading(0)) {
            car.orient(heading);
        }
        Transition::Continue { remaining }
    }

    fn move_to_street_start(network: &NetworkModel, car: &mut CarParticle, street: StreetId) {
        car.location = Location::Street(street);
        car.segment = 0;
        car.segment_dist = 0.0;
        if let Some(track) = network.street(street).map(|street| &street.track) {
            if let Some(origin) = track.origin() {
                car.position = origin;
            }
            if let Some(heading) = track.heading(0) {
                car.orient(heading);
            }
        }
    }

    /// Puts the particle back at the origin of a weighted-random entry street
    /// with a fresh variant. Leaves it untouched if the network has no streets.
    pub fn respawn<R: Rng + ?Sized>(
        &self,
        network: &NetworkModel,
        car: &mut CarParticle,
        rng: &mut R,
    ) -> Transition {
        let entry = network
            .pick_start_street(rng.gen())
            .and_then(|id| network.street(id).map(|street| (id, street)));
        if let Some((id, street)) = entry {
            let variant = rng.gen_range(0..self.variant_count);
            *car = CarParticle::placed(id, &street.track, 0.0, variant);
        }
        Transition::Respawned
    }
}
