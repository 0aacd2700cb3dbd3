//! Headless colony engine runner.
//!
//! Runs the engine without a transport on a simulated clock. Designed for
//! balance testing, CI determinism checks and protocol capture.
//!
//! # Usage
//!
//! ```bash
//! # Stream a single game as JSON lines
//! cargo run -p exo_headless -- run --scenario skirmish_1v1
//!
//! # Run batch balance test
//! cargo run -p exo_headless -- batch --scenario skirmish_1v1 --count 1000 --output results/
//!
//! # Verify determinism
//! cargo run -p exo_headless -- verify --seed 12345 --runs 5
//!
//! # Validate a balance config
//! cargo run -p exo_headless -- validate --config balance.ron
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exo_core::config::EngineConfig;
use exo_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    load_engine_config,
    runner::GameRunner,
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "exo_headless")]
#[command(about = "Headless colony engine runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine config RON file (defaults to the built-in balance table)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single game and stream its messages to stdout
    Run {
        /// Built-in scenario name (skirmish_1v1, random) or RON file
        #[arg(short, long, default_value = "skirmish_1v1")]
        scenario: String,

        /// Random seed (defaults to the config seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Override the scenario's tick budget
        #[arg(long)]
        ticks: Option<u64>,

        /// Print only the metrics summary
        #[arg(long)]
        quiet: bool,
    },

    /// Run batch of games for balance testing
    Batch {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish_1v1")]
        scenario: String,

        /// Number of games to run
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Override the scenario's tick budget
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish_1v1")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Parse and check the engine config and optionally a scenario
    Validate {
        /// Scenario RON file to check against the config
        #[arg(short, long)]
        scenario: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for messages)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let engine_config = match load_engine_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            ticks,
            quiet,
        } => cmd_run(&engine_config, &scenario, seed, ticks, quiet),
        Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            ticks,
        } => cmd_batch(&engine_config, scenario, count, parallel, output, seed, ticks),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(&engine_config, &scenario, seed, runs),
        Commands::Validate { scenario } => cmd_validate(&engine_config, scenario.as_deref()),
    }
}

fn load_scenario(name: &str) -> Scenario {
    match Scenario::resolve(name) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load scenario: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a single game
fn cmd_run(
    engine_config: &EngineConfig,
    scenario: &str,
    seed: Option<u64>,
    ticks: Option<u64>,
    quiet: bool,
) {
    let mut scenario = load_scenario(scenario);
    if let Some(ticks) = ticks {
        scenario.max_ticks = ticks;
    }
    let config = EngineConfig {
        seed: seed.unwrap_or(engine_config.seed),
        ..engine_config.clone()
    };
    tracing::info!(scenario = %scenario.name, seed = config.seed, "Starting game");

    let runner = match GameRunner::new(scenario, config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to build scenario: {e}");
            std::process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut lock = stdout.lock();
    let sink: Option<&mut dyn Write> = if quiet { None } else { Some(&mut lock) };
    let metrics = match runner.run(sink) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to write output: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("GAME COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Ticks: {}", metrics.duration_ticks);
    eprintln!(
        "Winner: {}",
        metrics.winner.as_deref().unwrap_or("none (tick limit)")
    );
    for colony in &metrics.colonies {
        eprintln!(
            "  {:<16} owner {:>3}  {:<12} residents {:>8.1}  fleets {:>2}  structures {:>2}",
            colony.name,
            colony.owner,
            colony.level,
            colony.residents,
            colony.fleets,
            colony.structures
        );
    }
    eprintln!("State hash: {:016x}", metrics.final_state_hash);
}

/// Run batch of games for balance testing
fn cmd_batch(
    engine_config: &EngineConfig,
    scenario_name: String,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
    ticks: Option<u64>,
) {
    let scenario = load_scenario(&scenario_name);

    if let Err(e) = std::fs::create_dir_all(&output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to create output directory");
        eprintln!(
            "FATAL: Cannot create output directory '{}': {}",
            output.display(),
            e
        );
        std::process::exit(1);
    }

    let config = BatchConfig {
        scenario: scenario_name,
        game_count: count,
        parallel_games: parallel,
        output_dir: output.clone(),
        seed_start: seed,
        max_ticks: ticks,
    };

    let results = run_batch(config, &scenario, engine_config);

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {e}");
        std::process::exit(1);
    }

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Games FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Throughput: {:.1} games/sec",
        results.games.len() as f64 / results.duration_seconds.max(0.001)
    );
    eprintln!("Undecided: {}", results.summary.undecided);
    eprintln!(
        "Average ticks to decide: {:.1}",
        results.summary.avg_decided_ticks
    );
    eprintln!("\nWin Rates:");
    for (colony, rate) in &results.summary.win_rates {
        eprintln!("  {}: {:.1}%", colony, rate * 100.0);
    }

    if !results.errors.is_empty() {
        eprintln!("\nGAME FAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!(
                "  Game {} (seed {}): {}",
                error.game_index, error.seed, error.message
            );
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Verify determinism
fn cmd_verify(engine_config: &EngineConfig, scenario: &str, seed: u64, runs: u32) {
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario,
        seed,
        runs
    );

    let scenario = load_scenario(scenario);
    if verify_determinism(&scenario, engine_config, seed, runs) {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}

/// Validate the config and optionally a scenario against it
fn cmd_validate(engine_config: &EngineConfig, scenario: Option<&str>) {
    eprintln!(
        "Config OK: {} fleet types, {} structure types, {} levels",
        engine_config.fleet_types.len(),
        engine_config.structure_types.len(),
        engine_config.levels.len()
    );

    if let Some(name) = scenario {
        let scenario = load_scenario(name);
        match scenario.build_engine(engine_config.clone()) {
            Ok(engine) => eprintln!(
                "Scenario OK: '{}' with {} colonies",
                scenario.name,
                engine.colonies().len()
            ),
            Err(e) => {
                eprintln!("Scenario INVALID: {e}");
                std::process::exit(1);
            }
        }
    }
}
