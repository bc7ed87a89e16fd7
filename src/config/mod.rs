use anyhow::{Context, Result};

pub mod cars;
pub mod layout;

pub use cars::*;
pub use layout::*;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub network: NetworkConfig,
    pub cars: CarsConfig,
}

impl SimulationConfig {
    pub fn load_from_files(network_path: &str, cars_path: &str) -> Result<Self> {
        let network_content = std::fs::read_to_string(network_path)
            .with_context(|| format!("reading network file {}", network_path))?;
        let cars_content = std::fs::read_to_string(cars_path)
            .with_context(|| format!("reading cars file {}", cars_path))?;

        Self::from_toml_strs(&network_content, &cars_content)
    }

    pub fn from_toml_strs(network_content: &str, cars_content: &str) -> Result<Self> {
        let network: NetworkConfig = toml::from_str(network_content)?;
        let cars: CarsConfig = toml::from_str(cars_content)?;

        // Validate configurations
        network.validate()?;
        cars.validate()?;

        Ok(SimulationConfig { network, cars })
    }
}

pub trait Validate {
    fn validate(&self) -> Result<()>;
}
