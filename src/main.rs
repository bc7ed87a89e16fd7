use anyhow::Result;
use clap::Parser;
use instant::Instant;
use log::info;
use std::time::Duration;

use street_flow::{
    config::SimulationConfig,
    simulation::{PerformanceTracker, Simulation},
};

#[derive(Parser)]
#[command(name = "street-flow")]
#[command(about = "Headless car particle simulation over a street network")]
struct Args {
    /// Street network file
    #[arg(short, long, default_value = "network.toml")]
    network: String,

    /// Cars configuration file
    #[arg(short, long, default_value = "cars.toml")]
    cars: String,

    /// Random seed for reproducible simulations
    #[arg(short, long)]
    seed: Option<u64>,

    /// Simulated seconds to run
    #[arg(short = 't', long, default_value_t = 10)]
    seconds: u64,

    /// Sleep between frames to keep a real-time pace
    #[arg(long)]
    realtime: bool,

    /// Enable verbose logging for detailed simulation progress
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();
    info!("Starting street flow simulation (headless)");

    let mut config = SimulationConfig::load_from_files(&args.network, &args.cars)?;
    if args.seed.is_some() {
        config.cars.random.seed = args.seed;
    }
    info!("Loaded network '{}': {} streets, {} intersections",
          config.network.network.name,
          config.network.streets.len(),
          config.network.intersections.len());

    let mut simulation = Simulation::from_config(&config)?;
    let corners = simulation.corners();
    info!("Network footprint: ({:.1}, {:.1}) to ({:.1}, {:.1})",
          corners[0].x, corners[0].y, corners[2].x, corners[2].y);
    let target = simulation.target_count();
    info!("Density {:?}: target {} cars (max {})",
          simulation.settings().density,
          target,
          simulation.settings().max_cars);

    let mut performance_tracker = PerformanceTracker::new(
        config.cars.performance.timing_samples as usize
    );

    let dt = 1.0 / 60.0; // 60 FPS simulation timestep
    let total_frames = args.seconds * 60;
    let start_time = Instant::now();

    for frame in 1..=total_frames {
        performance_tracker.start_frame();
        performance_tracker.start_simulation();

        simulation.update(dt);

        performance_tracker.end_simulation();
        performance_tracker.end_frame();

        if frame % 60 == 0 {
            let stats = simulation.stats();
            info!("t={:.0}s: {} cars active, {} waiting, {} respawned, {:.1} FPS, Sim: {}us",
                  stats.time,
                  stats.active,
                  stats.waiting,
                  stats.total_respawned,
                  performance_tracker.fps(),
                  performance_tracker.average_simulation_time().as_micros());
        }

        if args.realtime {
            let target_frame_time = Duration::from_secs_f64(f64::from(dt));
            let elapsed = performance_tracker.average_frame_time();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }
        }
    }

    let stats = simulation.stats();
    let variants = simulation.state().variant_counts(simulation.settings().variant_count);
    info!("Simulation completed!");
    info!("Wall time: {:.2}s for {} frames", start_time.elapsed().as_secs_f64(), stats.frames);
    info!("Final car count: {} active, {} spawned, {} respawned",
          stats.active, stats.total_spawned, stats.total_respawned);
    info!("Cars per variant: {:?}", variants);
    info!("Speed distribution: {:?}", simulation.state().speed_distribution(5));

    Ok(())
}
