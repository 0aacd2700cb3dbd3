//! Scenario loading and configuration.
//!
//! A scenario lists the starting colonies of a headless game plus how long
//! to run it. Colonies use the same payload shape the engine accepts from
//! clients, so any colony a client could create can be scripted here.

use std::path::Path;

use exo_core::clock::SimulationClock;
use exo_core::colony::{NaturalResources, Planet};
use exo_core::components::{ColonyLevel, ColonyTrait, FleetType};
use exo_core::config::EngineConfig;
use exo_core::error::EngineError;
use exo_core::factory::{ColonySpec, FleetSpec};
use exo_core::simulation::Engine;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The engine rejected the config or a colony.
    #[error("Engine rejected scenario: {0}")]
    Engine(#[from] EngineError),
}

fn default_max_ticks() -> u64 {
    2000
}

fn default_delta_time() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Scripted starting colonies.
    #[serde(default)]
    pub colonies: Vec<ColonySpec>,
    /// Extra randomly generated colonies added after the scripted ones.
    #[serde(default)]
    pub random_colonies: usize,
    /// Tick budget.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Simulated seconds per tick.
    #[serde(default = "default_delta_time")]
    pub delta_time: f64,
    /// End the game as soon as one owner holds every colony.
    #[serde(default = "default_true")]
    pub stop_on_winner: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            description: "Three randomly generated colonies".to_string(),
            colonies: Vec::new(),
            random_colonies: 3,
            max_ticks: default_max_ticks(),
            delta_time: default_delta_time(),
            stop_on_winner: true,
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Resolve a scenario by built-in name or file path.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match name_or_path {
            "skirmish_1v1" => Ok(Self::skirmish_1v1()),
            "random" => Ok(Self::default()),
            path => Self::load(path),
        }
    }

    /// The reference 1v1: a heavily armed Starport Hub against a young
    /// defensive colony 150 units away.
    #[must_use]
    pub fn skirmish_1v1() -> Self {
        let fleets = [
            (FleetType::Flanker, 5),
            (FleetType::Bomber, 3),
            (FleetType::Fighter, 3),
        ]
        .into_iter()
        .flat_map(|(kind, groups)| {
            (0..groups).map(move |_| FleetSpec {
                kind,
                count: Some(5),
                position: None,
                label: None,
                hp_pool: None,
            })
        })
        .collect();

        Self {
            name: "Standard 1v1 Skirmish".to_string(),
            description: "Aggressive Starport Hub against a fresh defensive colony".to_string(),
            colonies: vec![
                ColonySpec {
                    color: Some("#e04040".into()),
                    residents: Some(5_000.0),
                    colony_trait: Some(ColonyTrait::Aggressive),
                    colony_level: Some(ColonyLevel::StarportHub),
                    planet: Some(flat_planet(Vec3::new(-75.0, 0.0, 0.0), 90_000.0)),
                    colony_fleet: Some(fleets),
                    ..ColonySpec::named("Colony A")
                },
                ColonySpec {
                    color: Some("#4040e0".into()),
                    residents: Some(100.0),
                    colony_trait: Some(ColonyTrait::Defensive),
                    colony_level: Some(ColonyLevel::Colony),
                    planet: Some(flat_planet(Vec3::new(75.0, 0.0, 0.0), 280.0)),
                    ..ColonySpec::named("Colony B")
                },
            ],
            random_colonies: 0,
            max_ticks: default_max_ticks(),
            delta_time: default_delta_time(),
            stop_on_winner: true,
        }
    }

    /// Build an engine on a simulated clock and populate it.
    pub fn build_engine(&self, config: EngineConfig) -> Result<Engine, ScenarioError> {
        config.validate()?;
        let mut engine = Engine::with_clock(config, Box::new(SimulationClock::new()));
        for spec in &self.colonies {
            engine.create_colony(spec.clone())?;
        }
        if self.random_colonies > 0 {
            engine.initialise(self.random_colonies)?;
        }
        tracing::debug!(
            scenario = %self.name,
            colonies = engine.colonies().len(),
            "Scenario engine ready"
        );
        Ok(engine)
    }
}

fn flat_planet(position: Vec3, storage: f64) -> Planet {
    Planet {
        position,
        scale: 1.0,
        rot: Vec3::ZERO,
        planet_main_base: Vec2::ZERO,
        planet_natural_resources: NaturalResources {
            oil: 1.0,
            steel: 1.0,
            water: 1.0,
            temperature: 20.0,
            oil_storage: storage,
            steel_storage: storage,
            water_storage: storage,
        },
        ..Planet::default()
    }
}
