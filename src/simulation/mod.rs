use nalgebra::{Matrix2, Point3, Rotation2, Vector2};
use instant::Instant;
use std::time::Duration;

pub mod network;
pub mod physics;
pub mod routing;
pub mod traffic;
pub mod engine;

pub use network::*;
pub use physics::*;
pub use routing::*;
pub use traffic::*;
pub use engine::*;

pub type Vec2 = Vector2<f32>;
pub type Point = Point3<f32>;

/// Where a particle currently travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// On an ordinary street.
    Street(StreetId),
    /// Crossing an intersection along one of its synthetic connector paths.
    Intersection {
        intersection: IntersectionId,
        path: PathId,
    },
}

impl Location {
    pub fn intersection(&self) -> Option<IntersectionId> {
        match self {
            Location::Street(_) => None,
            Location::Intersection { intersection, .. } => Some(*intersection),
        }
    }

    pub fn street(&self) -> Option<StreetId> {
        match self {
            Location::Street(street) => Some(*street),
            Location::Intersection { .. } => None,
        }
    }
}

/// Render orientation of a particle. Particles are unoriented until they
/// have been placed on a segment with a non-zero direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Orientation {
    Unoriented,
    Oriented {
        /// Direction of travel in render-plane convention (Y negated).
        heading: Vec2,
        /// 2D basis built from the normalized heading.
        rotation: Rotation2<f32>,
    },
}

impl Orientation {
    /// Builds an orientation from a render-plane heading. Returns `None` for
    /// zero-length headings, which carry no direction.
    pub fn from_heading(heading: Vec2) -> Option<Self> {
        let unit = heading.try_normalize(f32::EPSILON)?;
        let basis = Matrix2::new(unit.x, -unit.y, unit.y, unit.x);
        Some(Orientation::Oriented {
            heading,
            rotation: Rotation2::from_matrix_unchecked(basis),
        })
    }

    pub fn heading(&self) -> Option<Vec2> {
        match self {
            Orientation::Unoriented => None,
            Orientation::Oriented { heading, .. } => Some(*heading),
        }
    }

    pub fn rotation(&self) -> Option<&Rotation2<f32>> {
        match self {
            Orientation::Unoriented => None,
            Orientation::Oriented { rotation, .. } => Some(rotation),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarParticle {
    pub position: Point,
    pub speed: f32,
    pub location: Location,
    /// Index of the segment of the current track being traversed.
    pub segment: usize,
    /// Progress along the current segment.
    pub segment_dist: f32,
    /// Seconds left standing at a stop intersection, zero while moving.
    pub waiting: f32,
    /// Visual variant used by the renderer to pick a sprite bucket.
    pub variant: u32,
    pub orientation: Orientation,
}

impl CarParticle {
    /// Places a stationary particle `offset` units along `street`.
    pub fn placed(street: StreetId, track: &Track, offset: f32, variant: u32) -> Self {
        let (segment, segment_dist) = track.locate(offset);
        let mut car = CarParticle {
            position: track.point_at(segment, segment_dist),
            speed: 0.0,
            location: Location::Street(street),
            segment,
            segment_dist,
            waiting: 0.0,
            variant,
            orientation: Orientation::Unoriented,
        };
        if let Some(heading) = track.heading(segment) {
            car.orient(heading);
        }
        car
    }

    /// Adopts `heading`, keeping the previous orientation when it has no direction.
    pub fn orient(&mut self, heading: Vec2) {
        if let Some(orientation) = Orientation::from_heading(heading) {
            self.orientation = orientation;
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting > 0.0
    }
}

/// Mutable per-frame state: the particle collection plus running counters.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    pub cars: Vec<CarParticle>,
    pub time: f64,
    pub frames: u64,
    pub total_spawned: u64,
    pub total_respawned: u64,
}

impl SimulationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_car(&mut self, car: CarParticle) {
        self.cars.push(car);
        self.total_spawned += 1;
    }

    pub fn active_cars(&self) -> usize {
        self.cars.len()
    }

    pub fn waiting_cars(&self) -> usize {
        self.cars.iter().filter(|car| car.is_waiting()).count()
    }

    pub fn variant_counts(&self, variant_count: u32) -> Vec<usize> {
        let mut counts = vec![0; variant_count as usize];
        for car in &self.cars {
            if let Some(count) = counts.get_mut(car.variant as usize) {
                *count += 1;
            }
        }
        counts
    }

    pub fn speed_distribution(&self, num_buckets: usize) -> Vec<usize> {
        let mut distribution = vec![0; num_buckets];

        if self.cars.is_empty() || num_buckets == 0 {
            return distribution;
        }

        let max_speed = self.cars.iter().map(|car| car.speed).fold(0.0, f32::max);

        if max_speed <= 0.0 {
            distribution[0] = self.cars.len();
            return distribution;
        }

        let bucket_size = max_speed / num_buckets as f32;

        for car in &self.cars {
            let bucket_index = ((car.speed / bucket_size) as usize).min(num_buckets - 1);
            distribution[bucket_index] += 1;
        }

        distribution
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTiming {
    pub frame_time: Duration,
    pub simulation_time: Duration,
}

#[derive(Debug)]
pub struct PerformanceTracker {
    samples: Vec<FrameTiming>,
    max_samples: usize,
    current_frame_start: Option<Instant>,
    current_sim_start: Option<Instant>,
    last_simulation_time: Duration,
}

impl PerformanceTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            current_frame_start: None,
            current_sim_start: None,
            last_simulation_time: Duration::ZERO,
        }
    }

    pub fn start_frame(&mut self) {
        self.current_frame_start = Some(Instant::now());
    }

    pub fn start_simulation(&mut self) {
        self.current_sim_start = Some(Instant::now());
    }

    pub fn end_simulation(&mut self) {
        if let Some(start) = self.current_sim_start.take() {
            self.last_simulation_time = start.elapsed();
        }
    }

    pub fn end_frame(&mut self) {
        if let Some(start) = self.current_frame_start.take() {
            let timing = FrameTiming {
                frame_time: start.elapsed(),
                simulation_time: self.last_simulation_time,
            };

            if self.samples.len() >= self.max_samples {
                self.samples.remove(0);
            }
            self.samples.push(timing);
        }
    }

    pub fn average_frame_time(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }

        let total: Duration = self.samples.iter().map(|s| s.frame_time).sum();
        total / self.samples.len() as u32
    }

    pub fn average_simulation_time(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }

        let total: Duration = self.samples.iter().map(|s| s.simulation_time).sum();
        total / self.samples.len() as u32
    }

    pub fn fps(&self) -> f32 {
        let avg_frame_time = self.average_frame_time();
        if avg_frame_time.is_zero() {
            return 0.0;
        }
        1.0 / avg_frame_time.as_secs_f32()
    }
}
