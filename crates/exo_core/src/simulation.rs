//! Tick orchestration.
//!
//! [`Engine`] owns every colony, the configuration, the seeded RNG and the
//! clock. One call to [`Engine::tick`] advances the whole colony set:
//! colonies are processed sequentially in creation order, and each colony
//! runs the same phases in a fixed order.
//!
//! # Phase order (per colony)
//!
//! 1. **Economy** - resource accumulation, resident growth, level-up
//! 2. **Auto-build** - one structure or fleet group
//! 3. **Coordination** - launch, reinforce or abandon a colony-wide attack
//! 4. **Behavior** - per-fleet decisions and one movement step
//! 5. **Combat** - engaged fleets fire, first contact pulls targets in
//! 6. **Base defense** - the base fires at the nearest attacker
//!
//! Combat writes into other colonies immediately, so a defender pulled into
//! a fight by an earlier colony already fights back in its own turn of the
//! same tick. A colony whose phases fail is logged and skipped; the rest of
//! the tick continues.
//!
//! # Example
//!
//! ```
//! use exo_core::clock::SimulationClock;
//! use exo_core::config::EngineConfig;
//! use exo_core::factory::ColonySpec;
//! use exo_core::simulation::Engine;
//!
//! let mut engine = Engine::with_clock(EngineConfig::default(), Box::new(SimulationClock::new()));
//! let id = engine.create_colony(ColonySpec::named("Alpha")).unwrap().id;
//! engine.tick(0.2);
//! assert_eq!(engine.get_tick(), 1);
//! assert!(engine.get_changes(id).unwrap().is_some());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{Map, Value};

use crate::clock::{Clock, MonotonicClock};
use crate::colony::Colony;
use crate::components::{ColonyId, FleetId, StructureId};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::events::{self, ActionEvent, EventRecorder};
use crate::factory::{self, ColonySpec};
use crate::orbit::{self, Obstacle};
use crate::protocol::ServerMessage;
use crate::{behavior, combat, coordination, diff, economy};

/// Hands out colony, fleet and structure ids.
///
/// Ids are never reused within one engine.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last_colony: ColonyId,
    last_fleet: FleetId,
    last_structure: StructureId,
}

impl IdAllocator {
    /// Next colony id.
    pub fn next_colony(&mut self) -> ColonyId {
        self.last_colony += 1;
        self.last_colony
    }

    /// Keep generated colony ids clear of an explicitly chosen one.
    pub fn observe_colony(&mut self, id: ColonyId) {
        self.last_colony = self.last_colony.max(id);
    }

    /// Next fleet id.
    pub fn next_fleet(&mut self) -> FleetId {
        self.last_fleet += 1;
        self.last_fleet
    }

    /// Next structure id.
    pub fn next_structure(&mut self) -> StructureId {
        self.last_structure += 1;
        self.last_structure
    }
}

/// Everything a phase needs besides the colonies.
#[derive(Debug)]
pub struct TickContext<'a> {
    /// Engine configuration.
    pub config: &'a EngineConfig,
    /// Clock reading for this tick, in seconds.
    pub now: f64,
    /// Step length in seconds.
    pub dt: f64,
    /// Every planet, in colony order.
    pub obstacles: &'a [Obstacle],
    /// Engine RNG.
    pub rng: &'a mut ChaCha8Rng,
    /// Event sink for this tick.
    pub recorder: &'a mut EventRecorder,
    /// Id source for new fleets and structures.
    pub ids: &'a mut IdAllocator,
}

/// The colony simulation.
#[derive(Debug)]
pub struct Engine {
    /// Current tick.
    tick: u64,
    config: EngineConfig,
    colonies: Vec<Colony>,
    rng: ChaCha8Rng,
    clock: Box<dyn Clock>,
    ids: IdAllocator,
    last_event_id: u64,
}

impl Engine {
    /// Engine on the wall clock, RNG seeded from `config.seed`.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Box::new(MonotonicClock::new()))
    }

    /// Engine reading cooldowns from `clock`.
    #[must_use]
    pub fn with_clock(config: EngineConfig, clock: Box<dyn Clock>) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            tick: 0,
            config,
            colonies: Vec::new(),
            rng,
            clock,
            ids: IdAllocator::default(),
            last_event_id: 0,
        }
    }

    /// Number of ticks run so far.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// The configuration the engine was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current clock reading in seconds.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Every colony in processing order.
    #[must_use]
    pub fn colonies(&self) -> &[Colony] {
        &self.colonies
    }

    /// Colony by id.
    #[must_use]
    pub fn colony(&self, id: ColonyId) -> Option<&Colony> {
        self.colonies.iter().find(|c| c.id == id)
    }

    /// Mutable colony by id, for scenario setup.
    pub fn colony_mut(&mut self, id: ColonyId) -> Option<&mut Colony> {
        self.colonies.iter_mut().find(|c| c.id == id)
    }

    /// Advance every colony by `delta_time` seconds.
    pub fn tick(&mut self, delta_time: f64) {
        self.clock.advance(delta_time);
        let now = self.clock.now();
        let obstacles = orbit::world_obstacles(&self.colonies, &self.config.orbit);
        let mut recorder = EventRecorder::new(self.last_event_id, self.clock.timestamp_millis());
        let mut ctx = TickContext {
            config: &self.config,
            now,
            dt: delta_time,
            obstacles: &obstacles,
            rng: &mut self.rng,
            recorder: &mut recorder,
            ids: &mut self.ids,
        };

        for idx in 0..self.colonies.len() {
            if let Err(err) = run_colony(&mut self.colonies, idx, &mut ctx) {
                tracing::warn!(colony = self.colonies[idx].id, error = %err, "Colony skipped this tick");
            }
        }

        self.last_event_id = recorder.last_id();
        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Engine state hash");
        }
    }

    /// Create a colony from a partial spec and add it to the simulation.
    ///
    /// # Errors
    ///
    /// See [`factory::create_colony`]. A rejected spec adds nothing to the
    /// colony set.
    pub fn create_colony(&mut self, spec: ColonySpec) -> Result<&Colony> {
        let colony = factory::create_colony(spec, &self.colonies, &self.config, &mut self.rng, &mut self.ids)?;
        tracing::info!(colony = colony.id, name = %colony.name, "Colony joined");
        self.colonies.push(colony);
        let idx = self.colonies.len() - 1;
        Ok(&self.colonies[idx])
    }

    /// Seed `count` random colonies named `Colony N`.
    pub fn initialise(&mut self, count: usize) -> Result<Vec<ColonyId>> {
        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            let spec = ColonySpec {
                residents: Some(self.rng.gen_range(10..=500) as f64),
                ..ColonySpec::named(format!("Colony {}", self.colonies.len() + 1))
            };
            created.push(self.create_colony(spec)?.id);
        }
        Ok(created)
    }

    /// Changed top-level fields of a colony since the last call.
    ///
    /// # Errors
    ///
    /// `UnknownColony` when no colony has `id`.
    pub fn get_changes(&mut self, id: ColonyId) -> Result<Option<Map<String, Value>>> {
        let colony = self.colony_mut(id).ok_or(EngineError::UnknownColony(id))?;
        Ok(diff::get_changes(colony))
    }

    /// Drain a colony's pending action events.
    ///
    /// # Errors
    ///
    /// `UnknownColony` when no colony has `id`.
    pub fn get_action_events(&mut self, id: ColonyId) -> Result<Vec<ActionEvent>> {
        let colony = self.colony_mut(id).ok_or(EngineError::UnknownColony(id))?;
        Ok(events::drain(colony))
    }

    /// Drain every colony's changes and events as transport messages.
    pub fn messages(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        for colony in &mut self.colonies {
            if let Some(changes) = diff::get_changes(colony) {
                out.push(ServerMessage::Update {
                    colony_id: colony.id,
                    changes,
                });
            }
            out.extend(
                events::drain(colony)
                    .into_iter()
                    .map(|event| ServerMessage::Action { event }),
            );
        }
        out
    }

    /// Full state message for a newly connected client.
    #[must_use]
    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::snapshot(&self.colonies)
    }

    /// The owner holding every colony, if there are at least two colonies.
    #[must_use]
    pub fn winner(&self) -> Option<ColonyId> {
        let (first, rest) = self.colonies.split_first()?;
        if rest.is_empty() || rest.iter().any(|c| c.owner != first.owner) {
            return None;
        }
        Some(first.owner)
    }

    /// Remove every colony.
    pub fn reset(&mut self) {
        tracing::info!(colonies = self.colonies.len(), "Engine reset");
        self.colonies.clear();
    }

    /// Hash of the gameplay state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.colonies.len().hash(&mut hasher);

        for colony in &self.colonies {
            colony.id.hash(&mut hasher);
            colony.owner.hash(&mut hasher);
            colony.hp.to_bits().hash(&mut hasher);
            colony.residents.to_bits().hash(&mut hasher);
            colony.colony_level.hash(&mut hasher);

            let resources = &colony.planet.planet_natural_resources;
            resources.oil_storage.to_bits().hash(&mut hasher);
            resources.steel_storage.to_bits().hash(&mut hasher);
            resources.water_storage.to_bits().hash(&mut hasher);
            colony.planet.structures.len().hash(&mut hasher);

            colony.colony_fleet.len().hash(&mut hasher);
            for fleet in &colony.colony_fleet {
                fleet.id.hash(&mut hasher);
                fleet.hp_pool.to_bits().hash(&mut hasher);
                fleet.position.x.to_bits().hash(&mut hasher);
                fleet.position.y.to_bits().hash(&mut hasher);
                fleet.position.z.to_bits().hash(&mut hasher);
            }
        }

        hasher.finish()
    }
}

fn run_colony(colonies: &mut [Colony], idx: usize, ctx: &mut TickContext<'_>) -> Result<()> {
    economy::update(&mut colonies[idx], ctx);
    economy::auto_build(&mut colonies[idx], ctx)?;
    coordination::update(colonies, idx, ctx)?;
    behavior::update(colonies, idx, ctx)?;
    combat::resolve_fleets(colonies, idx, ctx)?;
    combat::defend_base(colonies, idx, ctx)
}

/// Owned pieces of a [`TickContext`] for unit tests.
#[cfg(test)]
pub(crate) struct TestParts {
    pub config: EngineConfig,
    pub now: f64,
    pub dt: f64,
    pub obstacles: Vec<Obstacle>,
    pub rng: ChaCha8Rng,
    pub recorder: EventRecorder,
    pub ids: IdAllocator,
}

#[cfg(test)]
impl TestParts {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            now: 0.0,
            dt: 0.2,
            obstacles: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(1),
            recorder: EventRecorder::default(),
            ids: IdAllocator::default(),
        }
    }

    pub fn ctx(&mut self) -> TickContext<'_> {
        TickContext {
            config: &self.config,
            now: self.now,
            dt: self.dt,
            obstacles: &self.obstacles,
            rng: &mut self.rng,
            recorder: &mut self.recorder,
            ids: &mut self.ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulationClock;
    use crate::components::{ColonyLevel, FleetState};

    fn engine() -> Engine {
        Engine::with_clock(EngineConfig::default(), Box::new(SimulationClock::new()))
    }

    #[test]
    fn test_tick_increments() {
        let mut engine = engine();
        engine.tick(0.2);
        engine.tick(0.2);
        assert_eq!(engine.get_tick(), 2);
        assert!((engine.now() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_initialise_names_colonies() {
        let mut engine = engine();
        let ids = engine.initialise(3).unwrap();
        assert_eq!(ids.len(), 3);
        let names: Vec<_> = engine.colonies().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Colony 1", "Colony 2", "Colony 3"]);
        for colony in engine.colonies() {
            assert!((10.0..=500.0).contains(&colony.residents));
            assert_eq!(colony.colony_level, ColonyLevel::Colony);
        }
    }

    #[test]
    fn test_unknown_colony_errors() {
        let mut engine = engine();
        assert!(matches!(engine.get_changes(9), Err(EngineError::UnknownColony(9))));
        assert!(matches!(engine.get_action_events(9), Err(EngineError::UnknownColony(9))));
    }

    #[test]
    fn test_changes_read_once() {
        let mut engine = engine();
        let id = engine.create_colony(ColonySpec::named("Alpha")).unwrap().id;
        let first = engine.get_changes(id).unwrap().unwrap();
        assert!(first.contains_key("planet"));
        assert!(engine.get_changes(id).unwrap().is_none());
    }

    #[test]
    fn test_winner_requires_single_owner() {
        let mut engine = engine();
        assert_eq!(engine.winner(), None);
        engine.initialise(2).unwrap();
        assert_eq!(engine.winner(), None);
        let owner = engine.colonies()[0].owner;
        let second = engine.colonies()[1].id;
        engine.colony_mut(second).unwrap().owner = owner;
        assert_eq!(engine.winner(), Some(owner));
        engine.reset();
        assert!(engine.colonies().is_empty());
        assert_eq!(engine.winner(), None);
    }

    #[test]
    fn test_same_seed_same_hash() {
        let run = || {
            let mut engine = engine();
            engine.initialise(4).unwrap();
            for _ in 0..200 {
                engine.tick(0.2);
            }
            engine.state_hash()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_messages_drain_updates_and_events() {
        let mut engine = engine();
        engine.initialise(2).unwrap();
        let first = engine.messages();
        assert_eq!(
            first
                .iter()
                .filter(|m| matches!(m, ServerMessage::Update { .. }))
                .count(),
            2
        );
        assert!(engine.messages().is_empty());
    }

    #[test]
    fn test_spawned_fleets_start_on_home_shell() {
        let mut engine = engine();
        let spec = ColonySpec {
            colony_fleet: Some(vec![factory::FleetSpec {
                kind: crate::components::FleetType::Fighter,
                count: Some(3),
                position: None,
                label: None,
                hp_pool: None,
            }]),
            ..ColonySpec::named("Alpha")
        };
        let id = engine.create_colony(spec).unwrap().id;
        for _ in 0..20 {
            engine.tick(0.2);
        }
        let colony = engine.colony(id).unwrap();
        let shell = orbit::shell_radius(&colony.planet, &engine.config().orbit);
        for fleet in &colony.colony_fleet {
            assert!(matches!(fleet.state, FleetState::Idle | FleetState::Patrolling));
            let d = fleet.position.distance(colony.planet.position);
            assert!((d - shell).abs() < 1e-2, "distance {d} vs shell {shell}");
        }
    }
}
