//! Game metrics collection for balance analysis.
//!
//! [`MetricsCollector`] watches the transport messages of one game and
//! folds them into a [`GameMetrics`] record. [`BatchSummary`] aggregates
//! many records into win rates.

use std::collections::BTreeMap;

use exo_core::components::ColonyId;
use exo_core::events::EventCategory;
use exo_core::protocol::ServerMessage;
use exo_core::simulation::Engine;
use serde::{Deserialize, Serialize};

/// Final state of one colony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColonyMetrics {
    /// Colony id.
    pub id: ColonyId,
    /// Colony name.
    pub name: String,
    /// Owner at the end of the game.
    pub owner: ColonyId,
    /// Level name at the end of the game.
    pub level: String,
    /// Final population.
    pub residents: f64,
    /// Fleet groups alive at the end.
    pub fleets: usize,
    /// Structures on the planet at the end.
    pub structures: usize,
    /// Tick at which the colony changed hands, if it did.
    pub conquered_at: Option<u64>,
}

/// Complete metrics for a single game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Scenario name.
    pub scenario: String,
    /// Random seed used.
    pub seed: u64,
    /// Ticks run.
    pub duration_ticks: u64,
    /// Name of the winning colony (None = undecided).
    pub winner: Option<String>,
    /// Update messages emitted.
    pub updates: u64,
    /// Action events by category.
    pub events: BTreeMap<String, u64>,
    /// Per-colony end state.
    pub colonies: Vec<ColonyMetrics>,
    /// Final engine state hash.
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Number of action events of `category`.
    #[must_use]
    pub fn event_count(&self, category: EventCategory) -> u64 {
        self.events.get(category_key(category)).copied().unwrap_or(0)
    }
}

fn category_key(category: EventCategory) -> &'static str {
    match category {
        EventCategory::Build => "build",
        EventCategory::Fleet => "fleet",
        EventCategory::Level => "level",
        EventCategory::Combat => "combat",
        EventCategory::Attack => "attack",
        EventCategory::Conquest => "conquest",
    }
}

/// Accumulates metrics while a game runs.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: GameMetrics,
    conquests: BTreeMap<ColonyId, u64>,
}

impl MetricsCollector {
    /// Start collecting for `scenario` run with `seed`.
    #[must_use]
    pub fn new(scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            metrics: GameMetrics {
                scenario: scenario.into(),
                seed,
                ..GameMetrics::default()
            },
            conquests: BTreeMap::new(),
        }
    }

    /// Observe one message emitted at `tick`.
    pub fn observe(&mut self, tick: u64, message: &ServerMessage) {
        match message {
            ServerMessage::Update { .. } => self.metrics.updates += 1,
            ServerMessage::Action { event } => {
                *self
                    .metrics
                    .events
                    .entry(category_key(event.category).to_string())
                    .or_insert(0) += 1;
                // The victim's event names the victor; the victor's names the victim.
                if event.category == EventCategory::Conquest
                    && event.message.starts_with("Conquered by")
                {
                    self.conquests.entry(event.colony_id).or_insert(tick);
                }
            }
            ServerMessage::GameOver { .. } | ServerMessage::Snapshot { .. } => {}
        }
    }

    /// Close the record against the engine's final state.
    #[must_use]
    pub fn finish(mut self, engine: &Engine) -> GameMetrics {
        self.metrics.duration_ticks = engine.get_tick();
        self.metrics.final_state_hash = engine.state_hash();
        self.metrics.winner = engine
            .winner()
            .and_then(|owner| engine.colony(owner))
            .map(|c| c.name.clone());
        self.metrics.colonies = engine
            .colonies()
            .iter()
            .map(|c| ColonyMetrics {
                id: c.id,
                name: c.name.clone(),
                owner: c.owner,
                level: c.colony_level.name().to_string(),
                residents: c.residents,
                fleets: c.colony_fleet.len(),
                structures: c.planet.structures.len(),
                conquered_at: self.conquests.get(&c.id).copied(),
            })
            .collect();
        self.metrics
    }
}

/// Aggregate over many games.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Games included.
    pub total_games: u32,
    /// Games that hit the tick limit without a winner.
    pub undecided: u32,
    /// Win rate per winning colony name.
    pub win_rates: BTreeMap<String, f64>,
    /// Average ticks to resolution over decided games.
    pub avg_decided_ticks: f64,
    /// Average conquests per game.
    pub avg_conquests: f64,
}

impl BatchSummary {
    /// Summarize `games`.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        let total = games.len() as u32;
        if total == 0 {
            return Self::default();
        }

        let mut wins: BTreeMap<String, u32> = BTreeMap::new();
        let mut decided_ticks = 0u64;
        let mut decided = 0u32;
        let mut conquests = 0u64;
        for game in games {
            conquests += game
                .colonies
                .iter()
                .filter(|c| c.conquered_at.is_some())
                .count() as u64;
            if let Some(winner) = &game.winner {
                *wins.entry(winner.clone()).or_insert(0) += 1;
                decided_ticks += game.duration_ticks;
                decided += 1;
            }
        }

        Self {
            total_games: total,
            undecided: total - decided,
            win_rates: wins
                .into_iter()
                .map(|(name, n)| (name, n as f64 / total as f64))
                .collect(),
            avg_decided_ticks: if decided > 0 {
                decided_ticks as f64 / decided as f64
            } else {
                0.0
            },
            avg_conquests: conquests as f64 / total as f64,
        }
    }
}
