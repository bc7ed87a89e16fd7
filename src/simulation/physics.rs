use super::{CarParticle, Track};

/// Outcome of advancing a particle along its current track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreetProgress {
    /// The particle is still on the track; the elapsed time was used up.
    Moving,
    /// The particle reached the terminal point with `leftover` seconds of the
    /// elapsed time unspent. Routing has to move it somewhere else.
    Completed { leftover: f32 },
}

/// Moves particles along polyline tracks.
#[derive(Debug, Clone)]
pub struct PhysicsEngine {
    acceleration: f32,
    deceleration: f32,
}

impl PhysicsEngine {
    pub fn new(acceleration: f32, deceleration: f32) -> Self {
        Self {
            acceleration: acceleration.max(0.0),
            deceleration: deceleration.max(0.0),
        }
    }

    /// Moves `speed` toward `limit` without overshooting it.
    pub fn approach_speed(&self, speed: f32, limit: f32, elapsed: f32) -> f32 {
        if speed < limit {
            (speed + self.acceleration * elapsed).min(limit)
        } else {
            (speed - self.deceleration * elapsed).max(limit)
        }
    }

    pub fn advance_on_street(
        &self,
        car: &mut CarParticle,
        track: &Track,
        elapsed: f32,
    ) -> StreetProgress {
        car.speed = self.approach_speed(car.speed, track.speed_limit, elapsed);

        if track.is_degenerate() {
            if let Some(origin) = track.origin() {
                car.position = origin;
            }
            return StreetProgress::Completed { leftover: elapsed };
        }

        let last = track.segment_count() - 1;
        let mut segment = car.segment.min(last);
        car.segment_dist += car.speed * elapsed;

        while car.segment_dist >= track.distance[segment] {
            car.segment_dist -= track.distance[segment];
            if segment == last {
                let leftover = if car.speed > 0.0 {
                    car.segment_dist / car.speed
                } else {
                    0.0
                };
                car.segment = last;
                car.segment_dist = track.distance[last];
                if let Some(terminal) = track.terminal() {
                    car.position = terminal;
                }
                if let Some(heading) = track.heading(last) {
                    car.orient(heading);
                }
                return StreetProgress::Completed { leftover };
            }
            segment += 1;
        }

        car.segment = segment;
        car.position = track.point_at(segment, car.segment_dist);
        if let Some(heading) = track.heading(segment) {
            car.orient(heading);
        }
        StreetProgress::Moving
    }
}
