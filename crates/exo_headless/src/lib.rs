//! Headless colony engine runner for balance testing and CI verification.
//!
//! This crate runs the engine without a transport, on a simulated clock,
//! so games are reproducible from a seed. This enables:
//!
//! - **Balance testing**: many seeds of one scenario run in parallel
//! - **CI verification**: the same seed must always reach the same state hash
//! - **Protocol capture**: a game's transport messages can be streamed as
//!   JSON lines for inspection
//!
//! # Output
//!
//! - **stdout**: transport messages, one JSON object per line
//! - **stderr**: logs and summaries (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Stream one game
//! cargo run -p exo_headless -- run --scenario skirmish_1v1
//!
//! # Balance batch
//! cargo run -p exo_headless -- batch --scenario skirmish_1v1 --count 200
//!
//! # Check a config file
//! cargo run -p exo_headless -- validate --config balance.ron
//! ```

pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, ColonyMetrics, GameMetrics, MetricsCollector};
pub use runner::GameRunner;
pub use scenario::{Scenario, ScenarioError};

/// Load an engine config from a RON file, or the built-in defaults.
pub fn load_engine_config(
    path: Option<&std::path::Path>,
) -> Result<exo_core::config::EngineConfig, ScenarioError> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(ScenarioError::FileNotFound(path.display().to_string()));
            }
            let contents = std::fs::read_to_string(path)?;
            Ok(exo_core::config::EngineConfig::from_ron_str(&contents)?)
        }
        None => Ok(exo_core::config::EngineConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_engine_config() {
        let config = load_engine_config(None).unwrap();
        assert_eq!(config, exo_core::config::EngineConfig::default());
    }

    #[test]
    fn test_engine_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(seed: 99, tick_interval: 0.5)").unwrap();
        let config = load_engine_config(Some(file.path())).unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.tick_interval, 0.5);
    }

    #[test]
    fn test_invalid_engine_config_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(tick_interval: -1.0)").unwrap();
        let err = load_engine_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ScenarioError::Engine(_)));
    }
}
