use super::{
    CarParticle, Density, NetworkModel, PhysicsEngine, Point, RoutingEngine, SimulationState,
    StreetProgress, TrafficManager, Transition, Vec2,
};
use crate::config::{CarsConfig, SimulationConfig};
use anyhow::Result;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upper bound on track changes a single particle may make in one frame.
const MAX_TRANSITIONS_PER_FRAME: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    /// Hard cap on network capacity.
    pub max_cars: usize,
    pub density: Density,
    /// Scale factor applied to the base car dimensions.
    pub size: f32,
    pub variant_count: u32,
    pub car_length: f32,
    pub car_width: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub spacing_constant: f32,
    pub packing_ratio: f32,
    /// Seconds a particle stands at a stop intersection.
    pub wait_duration: f32,
    pub paused: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            max_cars: 9000,
            density: Density::Medium,
            size: 1.0,
            variant_count: 4,
            car_length: 4.5,
            car_width: 2.0,
            acceleration: 4.0,
            deceleration: 6.0,
            spacing_constant: 1.5,
            packing_ratio: 1.2,
            wait_duration: 1.0,
            paused: false,
        }
    }
}

impl From<&CarsConfig> for SimulationSettings {
    fn from(config: &CarsConfig) -> Self {
        Self {
            max_cars: config.simulation.max_cars,
            density: config.simulation.density,
            size: config.simulation.size,
            variant_count: config.simulation.variant_count,
            car_length: config.car.length,
            car_width: config.car.width,
            acceleration: config.car.acceleration,
            deceleration: config.car.deceleration,
            spacing_constant: config.spacing.spacing_constant,
            packing_ratio: config.spacing.packing_ratio,
            wait_duration: config.intersection.wait_duration,
            paused: config.simulation.paused,
        }
    }
}

impl SimulationSettings {
    /// Sprite dimensions after scaling: x is the width, y the length.
    pub fn car_size(&self) -> Vec2 {
        Vec2::new(self.car_width * self.size, self.car_length * self.size)
    }

    /// Distance between packed particles.
    pub fn spacing(&self) -> f32 {
        self.car_size().y * self.spacing_constant * self.packing_ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationStats {
    pub frames: u64,
    pub time: f64,
    pub active: usize,
    pub waiting: usize,
    pub target: usize,
    pub total_spawned: u64,
    pub total_respawned: u64,
}

/// How a particle's frame ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarOutcome {
    Moved,
    Waiting,
    Respawned,
}

/// Runs one particle through `elapsed` seconds: pending stop time first,
/// then kinematics and routing until the time is spent.
pub fn advance_car<R: Rng + ?Sized>(
    physics: &PhysicsEngine,
    routing: &RoutingEngine,
    network: &NetworkModel,
    car: &mut CarParticle,
    elapsed: f32,
    rng: &mut R,
) -> CarOutcome {
    let mut remaining = elapsed.max(0.0);

    if car.waiting > 0.0 {
        if remaining < car.waiting {
            car.waiting -= remaining;
            return CarOutcome::Waiting;
        }
        remaining -= car.waiting;
        car.waiting = 0.0;
    }

    for _ in 0..MAX_TRANSITIONS_PER_FRAME {
        let Some(track) = network.track(car.location) else {
            routing.respawn(network, car, rng);
            return CarOutcome::Respawned;
        };

        remaining = match physics.advance_on_street(car, track, remaining) {
            StreetProgress::Moving => return CarOutcome::Moved,
            StreetProgress::Completed { leftover } => leftover,
        };

        match routing.transition(network, car, remaining, rng) {
            Transition::Continue { remaining: left } => remaining = left,
            Transition::Waiting => return CarOutcome::Waiting,
            Transition::Respawned => return CarOutcome::Respawned,
        }
    }

    debug!("Car hit the per-frame transition limit at {:?}", car.location);
    CarOutcome::Moved
}

/// Frame-driven simulation over a read-only street network.
pub struct Simulation<R: Rng = StdRng> {
    network: NetworkModel,
    settings: SimulationSettings,
    physics: PhysicsEngine,
    routing: RoutingEngine,
    traffic: TrafficManager,
    state: SimulationState,
    corners: [Point; 4],
    target: Option<usize>,
    rng: R,
}

impl Simulation<StdRng> {
    pub fn new(settings: SimulationSettings, network: NetworkModel) -> Self {
        Self::with_rng(settings, network, StdRng::from_entropy())
    }

    pub fn seeded(settings: SimulationSettings, network: NetworkModel, seed: u64) -> Self {
        Self::with_rng(settings, network, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let network = config.network.build()?;
        let settings = SimulationSettings::from(&config.cars);
        Ok(match config.cars.random.seed {
            Some(seed) => Self::seeded(settings, network, seed),
            None => Self::new(settings, network),
        })
    }
}

impl<R: Rng> Simulation<R> {
    /// Builds the simulation and packs the initial population onto the network.
    pub fn with_rng(settings: SimulationSettings, network: NetworkModel, rng: R) -> Self {
        let mut simulation = Self {
            corners: corners_of(&network),
            physics: PhysicsEngine::new(settings.acceleration, settings.deceleration),
            routing: RoutingEngine::new(settings.wait_duration, settings.variant_count),
            traffic: TrafficManager::new(settings.max_cars, settings.variant_count),
            network,
            settings,
            state: SimulationState::new(),
            target: None,
            rng,
        };
        let target = simulation.target_count();
        simulation.reset(target);
        simulation
    }

    /// Advances every particle by `elapsed` seconds and returns them.
    /// While paused the particles are returned untouched.
    pub fn update(&mut self, elapsed: f32) -> &[CarParticle] {
        if self.settings.paused {
            return &self.state.cars;
        }

        let target = self.target_count();
        self.traffic
            .reconcile(&self.network, &mut self.state, target, &mut self.rng);

        let elapsed = elapsed.max(0.0);
        let mut respawned = 0;
        for car in &mut self.state.cars {
            let outcome = advance_car(
                &self.physics,
                &self.routing,
                &self.network,
                car,
                elapsed,
                &mut self.rng,
            );
            if outcome == CarOutcome::Respawned {
                respawned += 1;
            }
        }

        self.state.total_respawned += respawned;
        self.state.time += f64::from(elapsed);
        self.state.frames += 1;
        &self.state.cars
    }

    /// Takes effect on the next update.
    pub fn change_density(&mut self, density: Density) {
        if self.settings.density != density {
            debug!("Density {:?} -> {:?}", self.settings.density, density);
            self.settings.density = density;
            self.target = None;
        }
    }

    /// Takes effect on the next update.
    pub fn set_size(&mut self, size: f32) {
        if !(size > 0.0) || !size.is_finite() {
            warn!("Ignoring invalid car size {}", size);
            return;
        }
        self.settings.size = size;
        self.target = None;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.settings.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.settings.paused
    }

    /// Discards every particle and packs `count` new ones onto the network.
    pub fn reset(&mut self, count: usize) {
        let cars = self.traffic.initial_placement(
            &self.network,
            self.settings.spacing(),
            count,
            &mut self.rng,
        );
        self.state.cars.clear();
        for car in cars {
            self.state.add_car(car);
        }
        info!("Reset placed {} cars (requested {})", self.state.cars.len(), count);
    }

    /// Swaps in a new network and repopulates it from scratch.
    pub fn replace_network(&mut self, network: NetworkModel) {
        info!("Replacing network ({} streets)", network.streets().len());
        self.corners = corners_of(&network);
        self.network = network;
        self.target = None;
        let target = self.target_count();
        self.reset(target);
    }

    /// Target population for the current density, size and network.
    pub fn target_count(&mut self) -> usize {
        if let Some(target) = self.target {
            return target;
        }
        let target = self.traffic.target_count(
            &self.network,
            self.settings.spacing(),
            self.settings.density,
        );
        debug!("Target population is now {}", target);
        self.target = Some(target);
        target
    }

    /// Ground-plane corners of the network footprint, counter-clockwise from
    /// the minimum corner.
    pub fn corners(&self) -> [Point; 4] {
        self.corners
    }

    pub fn particles(&self) -> &[CarParticle] {
        &self.state.cars
    }

    /// Particles grouped by variant for batched drawing.
    pub fn particles_by_variant(&self) -> Vec<Vec<&CarParticle>> {
        let mut buckets = vec![Vec::new(); self.settings.variant_count as usize];
        for car in &self.state.cars {
            if let Some(bucket) = buckets.get_mut(car.variant as usize) {
                bucket.push(car);
            }
        }
        buckets
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn car_size(&self) -> Vec2 {
        self.settings.car_size()
    }

    pub fn stats(&self) -> SimulationStats {
        SimulationStats {
            frames: self.state.frames,
            time: self.state.time,
            active: self.state.active_cars(),
            waiting: self.state.waiting_cars(),
            target: self.target.unwrap_or_default(),
            total_spawned: self.state.total_spawned,
            total_respawned: self.state.total_respawned,
        }
    }
}

fn corners_of(network: &NetworkModel) -> [Point; 4] {
    let (min, max) = network
        .bounds()
        .unwrap_or((Point::origin(), Point::origin()));
    [
        Point::new(min.x, min.y, 0.0),
        Point::new(max.x, min.y, 0.0),
        Point::new(max.x, max.y, 0.0),
        Point::new(min.x, max.y, 0.0),
    ]
}
