//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! An engine is reproducible when it is built with the same seed, runs on a
//! [`SimulationClock`](exo_core::clock::SimulationClock) and is ticked with
//! the same step sequence. Sources of divergence include:
//!
//! - **Wall-clock cooldowns**: an engine on a `MonotonicClock` builds and
//!   attacks at real-time instants. Tests always inject a simulated clock.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Colonies and fleets live in vectors processed in creation order.
//!
//! - **System randomness**: every random draw comes from the engine's
//!   seeded ChaCha RNG.
//!
//! Floating-point results are only expected to match on the same platform
//! and build.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use exo_core::simulation::Engine;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the engine was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Engine is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !is_deterministic {
        tracing::warn!(runs, ticks, ?hashes, "Runs diverged");
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run an engine twice from the same setup and compare final hashes.
///
/// # Example
///
/// ```
/// use exo_test_utils::determinism::verify_engine_determinism;
/// use exo_test_utils::fixtures;
///
/// let deterministic = verify_engine_determinism(
///     || {
///         let mut engine = fixtures::engine();
///         engine.initialise(3).unwrap();
///         engine
///     },
///     50,
///     0.2,
/// );
/// assert!(deterministic);
/// ```
pub fn verify_engine_determinism<F>(setup_fn: F, num_ticks: u64, dt: f64) -> bool
where
    F: Fn() -> Engine,
{
    verify_determinism(2, num_ticks, &setup_fn, |engine: &mut Engine| engine.tick(dt), Engine::state_hash)
        .is_deterministic
}

/// Run `num_runs` engines on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_engines<F>(setup_fn: F, num_runs: usize, num_ticks: u64, dt: f64) -> DeterminismResult
where
    F: Fn() -> Engine + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| {
                s.spawn(|| {
                    let mut engine = setup_fn();
                    for _ in 0..num_ticks {
                        engine.tick(dt);
                    }
                    engine.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("engine thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two engine runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(tick)` if they diverge at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, dt: f64) -> Option<u64>
where
    F: Fn() -> Engine,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.tick(dt);
        second.tick(dt);

        if first.state_hash() != second.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for engine inputs.
pub mod strategies {
    use exo_core::components::{ColonyLevel, ColonyTrait, FleetType};
    use exo_core::factory::ColonySpec;
    use glam::{Vec2, Vec3};
    use proptest::prelude::*;

    /// A point in the cube `[-extent, extent]³`.
    pub fn arb_vec3(extent: f32) -> impl Strategy<Value = Vec3> {
        (-extent..extent, -extent..extent, -extent..extent).prop_map(|(x, y, z)| Vec3::new(x, y, z))
    }

    /// A direction that may be zero or tiny.
    pub fn arb_direction() -> impl Strategy<Value = Vec3> {
        prop_oneof![
            1 => Just(Vec3::ZERO),
            1 => arb_vec3(1e-6),
            8 => arb_vec3(10.0),
        ]
    }

    /// A base surface coordinate.
    pub fn arb_base_coordinate() -> impl Strategy<Value = Vec2> {
        (-1.0f32..1.0, -90.0f32..90.0).prop_map(|(x, y)| Vec2::new(x, y))
    }

    /// Any colony trait.
    pub fn arb_trait() -> impl Strategy<Value = ColonyTrait> {
        prop::sample::select(ColonyTrait::ALL.to_vec())
    }

    /// Any colony level.
    pub fn arb_level() -> impl Strategy<Value = ColonyLevel> {
        prop::sample::select(ColonyLevel::ALL.to_vec())
    }

    /// Any fleet type.
    pub fn arb_fleet_type() -> impl Strategy<Value = FleetType> {
        prop::sample::select(vec![
            FleetType::Fighter,
            FleetType::Attacker,
            FleetType::Flanker,
            FleetType::Bomber,
        ])
    }

    /// A valid partial colony payload without a planet.
    pub fn arb_colony_spec() -> impl Strategy<Value = ColonySpec> {
        (
            "[A-Z][a-z]{2,8}",
            0.0f64..1000.0,
            proptest::option::of(arb_trait()),
            proptest::option::of(arb_level()),
        )
            .prop_map(|(name, residents, colony_trait, colony_level)| ColonySpec {
                residents: Some(residents),
                colony_trait,
                colony_level,
                ..ColonySpec::named(name)
            })
    }
}
