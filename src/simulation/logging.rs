use std::io;
use tracing::dispatcher::DefaultGuard;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use tracing_subscriber::{fmt, registry};

use crate::simulation::config::{Config, Logging};

// This is a helper struct to store the logger guards. When they are dropped, logging can be reset.
#[allow(dead_code)]
pub struct LogGuards {
    log_guard: Option<WorkerGuard>,
    default: DefaultGuard,
}

pub fn init_std_out_logging() -> DefaultGuard {
    let collector = registry().with(
        fmt::Layer::new()
            .with_writer(io::stdout)
            .with_filter(LevelFilter::INFO),
    );
    tracing::subscriber::set_default(collector)
}

pub fn init_logging(config: &Config) -> LogGuards {
    let (log_layer, log_guard) = match (config.output().logging, config.output().log_dir.as_ref())
    {
        (Logging::Info, Some(dir)) => {
            let log_file_appender = rolling::never(dir, "driver_sim.log");
            let (log_file, log_guard) = non_blocking(log_file_appender);
            let layer = fmt::Layer::new()
                .with_writer(log_file)
                .json()
                .with_ansi(false)
                .with_filter(LevelFilter::INFO);
            (Some(layer), Some(log_guard))
        }
        _ => (None, None),
    };

    let console_layer = (config.output().logging == Logging::Info).then(|| {
        fmt::layer()
            .with_writer(io::stdout)
            .with_filter(LevelFilter::INFO)
    });

    // Add `Optional`s. If None, then the corresponding layer is not added.
    let collector = registry().with(log_layer).with(console_layer);
    let default = tracing::subscriber::set_default(collector);

    LogGuards { log_guard, default }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::Config;
    use tracing::info;

    #[test]
    fn test_init_logging_with_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_log_dir(dir.path().to_path_buf());

        {
            let _guards = init_logging(&config);
            info!("hello from the test");
        }

        let log_path = dir.path().join("driver_sim.log");
        assert!(log_path.exists());
    }

    fn config_with_log_dir(dir: std::path::PathBuf) -> Config {
        let yaml = format!("output:\n  log_dir: {}\n", dir.display());
        serde_yaml::from_str(&yaml).unwrap()
    }
}
