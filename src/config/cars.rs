use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use crate::simulation::Density;
use super::Validate;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CarsConfig {
    pub simulation: SimulationParams,
    pub car: CarDimensions,
    pub spacing: SpacingConfig,
    pub intersection: IntersectionPolicy,
    #[serde(default)]
    pub random: RandomConfig,
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationParams {
    pub max_cars: usize,
    #[serde(default)]
    pub density: Density,
    pub size: f32,
    pub variant_count: u32,
    #[serde(default)]
    pub paused: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CarDimensions {
    pub length: f32,
    pub width: f32,
    pub acceleration: f32,
    pub deceleration: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpacingConfig {
    pub spacing_constant: f32,
    pub packing_ratio: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntersectionPolicy {
    pub wait_duration: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RandomConfig {
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerformanceConfig {
    pub timing_samples: u32,
}

impl Validate for CarsConfig {
    fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if sim.max_cars == 0 {
            return Err(anyhow!("Max cars must be greater than zero"));
        }

        if sim.size <= 0.0 {
            return Err(anyhow!("Car size factor must be positive"));
        }

        if sim.variant_count == 0 {
            return Err(anyhow!("At least one car variant must be configured"));
        }

        let car = &self.car;
        if car.length <= 0.0 || car.width <= 0.0 {
            return Err(anyhow!("Car dimensions must be positive"));
        }

        if car.acceleration <= 0.0 || car.deceleration <= 0.0 {
            return Err(anyhow!("Car acceleration values must be positive"));
        }

        let spacing = &self.spacing;
        if spacing.spacing_constant <= 0.0 || spacing.packing_ratio <= 0.0 {
            return Err(anyhow!("Spacing constant and packing ratio must be positive"));
        }

        if self.intersection.wait_duration < 0.0 {
            return Err(anyhow!("Intersection wait duration must be non-negative"));
        }

        if self.performance.timing_samples == 0 {
            return Err(anyhow!("Timing samples must be greater than zero"));
        }

        Ok(())
    }
}
