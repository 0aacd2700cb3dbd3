//! Test fixtures and helpers.
//!
//! Pre-built engines and colony payloads for consistent testing.

use exo_core::clock::SimulationClock;
use exo_core::colony::{NaturalResources, Planet};
use exo_core::components::{ColonyId, ColonyLevel, ColonyTrait, FleetType};
use exo_core::config::EngineConfig;
use exo_core::factory::{ColonySpec, FleetSpec};
use exo_core::simulation::Engine;
use glam::{Vec2, Vec3};

/// Step length of the skirmish scenario, in seconds.
pub const SKIRMISH_STEP: f64 = 0.5;

/// Tick budget within which the skirmish must be decided.
pub const SKIRMISH_TICKS: u64 = 2000;

/// Engine with default config on a simulated clock.
#[must_use]
pub fn engine() -> Engine {
    engine_with(EngineConfig::default())
}

/// Engine with `config` on a simulated clock.
#[must_use]
pub fn engine_with(config: EngineConfig) -> Engine {
    Engine::with_clock(config, Box::new(SimulationClock::new()))
}

/// Planet at `position` with scale 1, no rotation, base on the equator and
/// every storage at `storage`.
#[must_use]
pub fn planet_at(position: Vec3, storage: f64) -> Planet {
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

/// Fleet groups of `count` ships each.
#[must_use]
pub fn fleet_groups(groups: &[(FleetType, usize)], count: u32) -> Vec<FleetSpec> {
    groups
        .iter()
        .flat_map(|&(kind, n)| {
            (0..n).map(move |_| FleetSpec {
                kind,
                count: Some(count),
                position: None,
                label: None,
                hp_pool: None,
            })
        })
        .collect()
}

/// Builder for colony payloads with explicit planets.
#[derive(Debug, Clone)]
pub struct ColonyBuilder {
    spec: ColonySpec,
}

impl ColonyBuilder {
    /// A colony named `name` on a default planet at `position`.
    #[must_use]
    pub fn new(name: &str, position: Vec3) -> Self {
        Self {
            spec: ColonySpec {
                color: Some("#ffffff".into()),
                colony_trait: Some(ColonyTrait::Defensive),
                colony_level: Some(ColonyLevel::Colony),
                residents: Some(100.0),
                planet: Some(planet_at(position, 0.0)),
                ..ColonySpec::named(name)
            },
        }
    }

    /// Set the AI trait.
    #[must_use]
    pub fn with_trait(mut self, colony_trait: ColonyTrait) -> Self {
        self.spec.colony_trait = Some(colony_trait);
        self
    }

    /// Set the level.
    #[must_use]
    pub fn with_level(mut self, level: ColonyLevel) -> Self {
        self.spec.colony_level = Some(level);
        self
    }

    /// Set every storage.
    #[must_use]
    pub fn with_storage(mut self, storage: f64) -> Self {
        if let Some(planet) = self.spec.planet.as_mut() {
            let res = &mut planet.planet_natural_resources;
            res.oil_storage = storage;
            res.steel_storage = storage;
            res.water_storage = storage;
        }
        self
    }

    /// Set the color.
    #[must_use]
    pub fn with_color(mut self, color: &str) -> Self {
        self.spec.color = Some(color.into());
        self
    }

    /// Set the residents.
    #[must_use]
    pub fn with_residents(mut self, residents: f64) -> Self {
        self.spec.residents = Some(residents);
        self
    }

    /// Add fleet groups of the default group size.
    #[must_use]
    pub fn with_fleets(mut self, groups: &[(FleetType, usize)]) -> Self {
        let size = EngineConfig::default().build.fleet_group_size;
        self.spec
            .colony_fleet
            .get_or_insert_with(Vec::new)
            .extend(fleet_groups(groups, size));
        self
    }

    /// The finished payload.
    #[must_use]
    pub fn build(self) -> ColonySpec {
        self.spec
    }
}

/// The reference skirmish.
///
/// Colony A (Aggressive, Starport Hub, 90 000 of every resource, 5 flanker,
/// 3 bomber and 3 fighter groups) faces colony B (Defensive, Colony level,
/// about 280 of every resource, no fleets) 150 units away.
///
/// # Panics
///
/// Panics if the fixture payloads are rejected.
#[must_use]
pub fn skirmish() -> (Engine, ColonyId, ColonyId) {
    let mut engine = engine();
    let a = ColonyBuilder::new("Colony A", Vec3::new(-75.0, 0.0, 0.0))
        .with_trait(ColonyTrait::Aggressive)
        .with_level(ColonyLevel::StarportHub)
        .with_storage(90_000.0)
        .with_color("#e04040")
        .with_residents(5_000.0)
        .with_fleets(&[
            (FleetType::Flanker, 5),
            (FleetType::Bomber, 3),
            (FleetType::Fighter, 3),
        ])
        .build();
    let b = ColonyBuilder::new("Colony B", Vec3::new(75.0, 0.0, 0.0))
        .with_trait(ColonyTrait::Defensive)
        .with_storage(280.0)
        .with_color("#4040e0")
        .build();
    let a = engine.create_colony(a).expect("skirmish colony A").id;
    let b = engine.create_colony(b).expect("skirmish colony B").id;
    (engine, a, b)
}

/// Run the engine for `ticks` steps of `dt` seconds.
pub fn run_ticks(engine: &mut Engine, ticks: u64, dt: f64) {
    for _ in 0..ticks {
        engine.tick(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skirmish_fixture_layout() {
        let (engine, a, b) = skirmish();
        let a = engine.colony(a).unwrap();
        let b = engine.colony(b).unwrap();
        assert_eq!(a.colony_fleet.len(), 11);
        assert!(b.colony_fleet.is_empty());
        let d = a.planet.position.distance(b.planet.position);
        assert!((d - 150.0).abs() < 1e-4);
    }

    #[test]
    fn test_fleet_groups_expand() {
        let groups = fleet_groups(&[(FleetType::Bomber, 2), (FleetType::Fighter, 1)], 4);
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.count == Some(4)));
    }
}
