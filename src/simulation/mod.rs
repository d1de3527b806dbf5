pub mod config;
pub mod driver;
pub mod events;
pub mod logging;
pub mod route;

pub use driver::{DriverSimulator, Phase};
pub use route::{Route, RoutePoint};
