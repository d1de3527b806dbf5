use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use driver_sim::simulation::config::{CommandLineArgs, Config};
use driver_sim::simulation::driver::DriverSimulator;
use driver_sim::simulation::events::{MovementFinishedEvent, PositionChangedEvent};
use driver_sim::simulation::logging;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CommandLineArgs::parse();
    let config = match &args.config {
        Some(path) => Config::from_file(&PathBuf::from(path))?,
        None => Config::default(),
    };
    let _guards = logging::init_logging(&config);

    // Ticks and publications run on a single event-loop thread.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    rt.block_on(run(config));
    Ok(())
}

async fn run(config: Config) {
    let mut simulator = DriverSimulator::new(&config);

    simulator.on::<PositionChangedEvent, _>(|e| {
        info!(
            index = e.index,
            lat = e.point.lat,
            lon = e.point.lon,
            "driver position changed"
        )
    });
    simulator.on::<MovementFinishedEvent, _>(|e| {
        info!(index = e.index, "driver reached the end of the route")
    });

    simulator.setup_route();
    info!("route loaded with {} waypoints", simulator.route().len());

    simulator.start();
    simulator.join_movement().await;
}
