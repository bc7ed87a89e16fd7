pub mod config;
pub mod simulation;

pub use simulation::*;
pub use config::*;
