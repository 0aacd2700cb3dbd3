//! Batch game runner for balance testing.
//!
//! Runs one scenario over many seeds in parallel using rayon and
//! aggregates the outcomes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use exo_core::config::EngineConfig;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, GameMetrics};
use crate::runner::GameRunner;
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario name or RON path
    pub scenario: String,
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Output directory for results
    pub output_dir: PathBuf,
    /// Seed of the first game; game `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Override of the scenario's tick budget
    pub max_ticks: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "skirmish_1v1".to_string(),
            game_count: 100,
            parallel_games: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
            max_ticks: None,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: &str, game_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Cap every game at `ticks`
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual game metrics
    pub games: Vec<GameMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

fn run_single_game(
    scenario: &Scenario,
    engine_config: &EngineConfig,
    seed: u64,
) -> Result<GameMetrics, String> {
    let config = EngineConfig {
        seed,
        ..engine_config.clone()
    };
    let runner = GameRunner::new(scenario.clone(), config).map_err(|e| e.to_string())?;
    runner.run(None).map_err(|e| e.to_string())
}

/// Run a batch of games
pub fn run_batch(config: BatchConfig, scenario: &Scenario, engine_config: &EngineConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    let mut scenario = scenario.clone();
    if let Some(ticks) = config.max_ticks {
        scenario.max_ticks = ticks;
    }

    info!(
        "Starting batch run: {} games of '{}'",
        config.game_count, scenario.name
    );

    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<GameMetrics, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(i as u64);
            match run_single_game(&scenario, engine_config, seed) {
                Ok(metrics) => {
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 10 == 0 {
                        debug!("Progress: {}/{}", done, config.game_count);
                    }
                    Ok(metrics)
                }
                Err(e) => {
                    warn!("Game {} failed: {}", i, e);
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message: e,
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<GameMetrics> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.1}s ({:.1} games/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(0.001)
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Run the same seed `runs` times and check every final state hash matches.
pub fn verify_determinism(
    scenario: &Scenario,
    engine_config: &EngineConfig,
    seed: u64,
    runs: u32,
) -> bool {
    let hashes: Vec<Option<u64>> = (0..runs)
        .into_par_iter()
        .map(|_| {
            run_single_game(scenario, engine_config, seed)
                .ok()
                .map(|m| m.final_state_hash)
        })
        .collect();

    match hashes.first() {
        Some(Some(first)) => hashes.iter().all(|h| *h == Some(*first)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_skirmish() -> Scenario {
        Scenario {
            max_ticks: 60,
            ..Scenario::skirmish_1v1()
        }
    }

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.game_count, 100);
        assert_eq!(config.scenario, "skirmish_1v1");
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new("custom_scenario", 500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345)
            .with_max_ticks(10);

        assert_eq!(config.scenario, "custom_scenario");
        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.max_ticks, Some(10));
    }

    #[test]
    fn test_run_batch_small() {
        let config = BatchConfig::new("skirmish_1v1", 4);
        let results = run_batch(config, &short_skirmish(), &EngineConfig::default());

        assert_eq!(results.games.len(), 4);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_games, 4);
        let mut seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        seeds.sort_unstable();
        assert_eq!(seeds, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_invalid_scenario_reports_errors() {
        let scenario = Scenario {
            colonies: vec![exo_core::factory::ColonySpec::default()],
            ..Scenario::default()
        };
        let results = run_batch(BatchConfig::new("broken", 3), &scenario, &EngineConfig::default());
        assert!(results.games.is_empty());
        assert_eq!(results.errors.len(), 3);
    }

    #[test]
    fn test_verify_determinism() {
        assert!(verify_determinism(&short_skirmish(), &EngineConfig::default(), 12345, 3));
    }

    #[test]
    fn test_batch_results_save_load() {
        let config = BatchConfig::new("skirmish_1v1", 2).with_max_ticks(10);
        let results = run_batch(config, &Scenario::skirmish_1v1(), &EngineConfig::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games.len(), 2);
        assert_eq!(loaded.config.max_ticks, Some(10));
        assert_eq!(loaded.games[0].duration_ticks, 10);
    }
}
