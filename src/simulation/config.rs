use crate::simulation::route::{Route, RoutePoint};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineArgs {
    /// Path to a YAML config file. Built-in defaults apply when omitted.
    #[arg(long, short)]
    pub config: Option<String>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config at {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    simulation: SimulationConfig,
    route: RouteConfig,
    output: OutputConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let file = File::open(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn simulation(&self) -> &SimulationConfig {
        &self.simulation
    }

    pub fn route(&self) -> &RouteConfig {
        &self.route
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    pub fn set_simulation(&mut self, simulation: SimulationConfig) {
        self.simulation = simulation;
    }

    pub fn set_route(&mut self, route: RouteConfig) {
        self.route = route;
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    tick_interval_secs: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            tick_interval_secs: 1.0,
        }
    }
}

impl SimulationConfig {
    pub fn from_secs(tick_interval_secs: f64) -> Self {
        SimulationConfig { tick_interval_secs }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval_secs)
    }
}

/// The waypoints the driver follows. Defaults to the fixed demo route.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RouteConfig {
    waypoints: Vec<RoutePoint>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        RouteConfig {
            waypoints: Route::demo().points().to_vec(),
        }
    }
}

impl RouteConfig {
    pub fn from_waypoints(waypoints: Vec<RoutePoint>) -> Self {
        RouteConfig { waypoints }
    }

    pub fn to_route(&self) -> Route {
        Route::from_points(self.waypoints.clone())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub logging: Logging,
    pub log_dir: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Logging {
    #[default]
    Info,
    Off,
}
