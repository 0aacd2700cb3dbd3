//! Engine configuration.
//!
//! Every tunable the engine reads lives in [`EngineConfig`], an immutable
//! value handed to [`crate::simulation::Engine::new`]. The defaults carry the
//! built-in balance; RON documents can override any subset of it.
//!
//! **Note:** This module contains no IO. File loading is handled by the
//! binaries.

mod fleet_data;
mod level_data;
mod structure_data;
mod trait_data;

use serde::{Deserialize, Serialize};

use crate::components::{ColonyLevel, ColonyTrait, FleetType, StructureType};
use crate::error::{EngineError, Result};

pub use fleet_data::FleetTypeData;
pub use level_data::LevelData;
pub use structure_data::StructureTypeData;
pub use trait_data::TraitProfile;

/// Complete engine configuration.
///
/// # Example RON
///
/// ```ron
/// EngineConfig(
///     tick_interval: 0.2,
///     seed: 7,
///     combat: (engagement_range: 40.0),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nominal tick interval in seconds. Economy rates are per interval.
    pub tick_interval: f64,
    /// Seed for the engine's random number generator.
    pub seed: u64,
    /// Planet placement for generated colonies.
    pub world: WorldConfig,
    /// Orbit shells and path planning.
    pub orbit: OrbitConfig,
    /// Growth and structure placement.
    pub economy: EconomyConfig,
    /// Construction gating.
    pub build: BuildConfig,
    /// Engagement rules.
    pub combat: CombatConfig,
    /// Individual fleet threat scanning.
    pub awareness: AwarenessConfig,
    /// Patrol loop geometry.
    pub patrol: PatrolConfig,
    /// Coordinated attack planning.
    pub attack: AttackConfig,
    /// Fleet type table.
    pub fleet_types: Vec<FleetTypeData>,
    /// Structure type table.
    pub structure_types: Vec<StructureTypeData>,
    /// Level table in progression order.
    pub levels: Vec<LevelData>,
    /// Trait lookup table.
    pub traits: Vec<TraitProfile>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: 0.2,
            seed: 42,
            world: WorldConfig::default(),
            orbit: OrbitConfig::default(),
            economy: EconomyConfig::default(),
            build: BuildConfig::default(),
            combat: CombatConfig::default(),
            awareness: AwarenessConfig::default(),
            patrol: PatrolConfig::default(),
            attack: AttackConfig::default(),
            fleet_types: FleetTypeData::defaults(),
            structure_types: StructureTypeData::defaults(),
            levels: LevelData::defaults(),
            traits: TraitProfile::defaults(),
        }
    }
}

impl EngineConfig {
    /// Parse a RON document. Missing fields keep their defaults.
    pub fn from_ron_str(ron_str: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(ron_str).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check structural consistency of the tables.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval <= 0.0 {
            return Err(EngineError::Config("tick_interval must be positive".into()));
        }
        if self.levels.is_empty() {
            return Err(EngineError::Config("level table is empty".into()));
        }
        for pair in self.levels.windows(2) {
            if pair[1].level <= pair[0].level {
                return Err(EngineError::Config(format!(
                    "levels out of order: {} listed after {}",
                    pair[1].level, pair[0].level
                )));
            }
        }
        for level in &self.levels {
            for kind in &level.unlocked_fleets {
                self.fleet_type(*kind)?;
            }
        }
        for colony_trait in ColonyTrait::ALL {
            self.trait_profile(colony_trait)?;
        }
        if self.orbit.safety_margin < 1.0 {
            return Err(EngineError::Config(
                "orbit.safety_margin must be at least 1.0".into(),
            ));
        }
        // Sampled ranges must be finite and non-empty.
        non_negative("world.bounds", self.world.bounds)?;
        non_negative("economy.structure_range_x", self.economy.structure_range_x)?;
        non_negative("economy.structure_range_y", self.economy.structure_range_y)?;
        non_negative("attack.parking_cone_degrees", self.attack.parking_cone_degrees)?;
        let (min_scale, max_scale) = self.world.scale_range;
        non_negative("world.scale_range", min_scale)?;
        if !max_scale.is_finite() || max_scale < min_scale {
            return Err(EngineError::Config(format!(
                "world.scale_range is reversed: ({min_scale}, {max_scale})"
            )));
        }
        Ok(())
    }

    /// Stats for a fleet type.
    pub fn fleet_type(&self, kind: FleetType) -> Result<&FleetTypeData> {
        self.fleet_types
            .iter()
            .find(|f| f.kind == kind)
            .ok_or(EngineError::UnknownFleetType(kind))
    }

    /// Data for a structure type.
    pub fn structure_type(&self, kind: StructureType) -> Result<&StructureTypeData> {
        self.structure_types
            .iter()
            .find(|s| s.kind == kind)
            .ok_or(EngineError::UnknownStructureType(kind))
    }

    /// Data for a level.
    pub fn level(&self, level: ColonyLevel) -> Result<&LevelData> {
        self.levels
            .iter()
            .find(|l| l.level == level)
            .ok_or(EngineError::UnknownLevel(level))
    }

    /// The configured level following `level`, if any.
    #[must_use]
    pub fn next_level(&self, level: ColonyLevel) -> Option<&LevelData> {
        self.levels.iter().find(|l| l.level > level)
    }

    /// Behavior profile for a trait.
    pub fn trait_profile(&self, colony_trait: ColonyTrait) -> Result<&TraitProfile> {
        self.traits
            .iter()
            .find(|t| t.colony_trait == colony_trait)
            .ok_or_else(|| EngineError::Config(format!("no profile for trait {colony_trait:?}")))
    }
}

/// Random planet placement for generated colonies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Planets are placed uniformly in `[-bounds, bounds]` on each axis.
    pub bounds: f32,
    /// Minimum center-to-center distance between planets.
    pub min_planet_distance: f32,
    /// Attempts before planet placement fails.
    pub placement_attempts: u32,
    /// Planet scale range.
    pub scale_range: (f32, f32),
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            bounds: 100.0,
            min_planet_distance: 20.0,
            placement_attempts: 1000,
            scale_range: (0.7, 1.3),
        }
    }
}

/// Orbit shell and path planning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    /// Planet radius at scale 1.0.
    pub base_radius: f32,
    /// Multiplier applied to the planet radius for the safety sphere.
    pub safety_margin: f32,
    /// Altitude above the safety sphere that fleets fly at.
    pub fly_altitude: f32,
    /// Distance under which a waypoint counts as reached.
    pub arrival_threshold: f32,
    /// Extra clearance added to detour points.
    pub detour_buffer: f32,
    /// Recursion limit of the global path planner.
    pub path_depth: u32,
    /// Slack beyond shell + patrol radius before a fleet counts as away from home.
    pub home_margin: f32,
    /// Apply planet rotation when mapping base coordinates to world space.
    pub apply_planet_rotation: bool,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            base_radius: 10.0,
            safety_margin: 1.2,
            fly_altitude: 3.0,
            arrival_threshold: 1.0,
            detour_buffer: 2.0,
            path_depth: 2,
            home_margin: 10.0,
            apply_planet_rotation: false,
        }
    }
}

/// Economy and growth parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Temperature with full growth.
    pub ideal_temperature: f64,
    /// Deviation at which the temperature factor bottoms out.
    pub temperature_tolerance: f64,
    /// Lowest growth factor for temperature and water.
    pub min_growth_factor: f64,
    /// Water generation rate giving the maximum water factor.
    pub max_water_rate: f64,
    /// Water factor at or above `max_water_rate`.
    pub max_water_factor: f64,
    /// Residents gained per tick interval at factor 1.0.
    pub base_growth_rate: f64,
    /// Capacity contributed per unit of stored steel.
    pub steel_capacity_factor: f64,
    /// Capacity contributed per unit of stored oil.
    pub oil_capacity_factor: f64,
    /// Fraction of capacity over which growth ramps down to zero.
    pub growth_ramp: f64,
    /// Half-width of the longitude sampling box around the base.
    pub structure_range_x: f32,
    /// Half-width of the latitude sampling box around the base (degrees).
    pub structure_range_y: f32,
    /// Minimum surface distance between structures and the base.
    pub structure_min_distance: f32,
    /// Placement attempts before a build is refunded.
    pub structure_attempts: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            ideal_temperature: 20.0,
            temperature_tolerance: 15.0,
            min_growth_factor: 0.1,
            max_water_rate: 2.0,
            max_water_factor: 2.5,
            base_growth_rate: 0.5,
            steel_capacity_factor: 2.0,
            oil_capacity_factor: 2.0,
            growth_ramp: 0.1,
            structure_range_x: 0.25,
            structure_range_y: 20.0,
            structure_min_distance: 1.5,
            structure_attempts: 30,
        }
    }
}

/// Construction gating shared by structures and fleets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Seconds between any two builds of one colony.
    pub global_cooldown: f64,
    /// Chance that the auto-builder skips a tick.
    pub skip_chance: f64,
    /// Units in a newly built fleet group.
    pub fleet_group_size: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            global_cooldown: 2.0,
            skip_chance: 0.3,
            fleet_group_size: 5,
        }
    }
}

/// Engagement rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Maximum fleet firing distance.
    pub engagement_range: f32,
    /// Seconds after entering Attacking before damage starts.
    pub warmup: f32,
    /// Height of the aim point above a base.
    pub aim_height: f32,
    /// Maximum base defense distance.
    pub defense_range: f32,
    /// Fraction of the engagement range at which attack-moves stop.
    pub firing_distance_ratio: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            engagement_range: 30.0,
            warmup: 2.0,
            aim_height: 4.0,
            defense_range: 35.0,
            firing_distance_ratio: 0.8,
        }
    }
}

/// Individual threat scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwarenessConfig {
    /// Range at which enemy fleets are noticed.
    pub radius: f32,
    /// Range at which patrolling and moving fleets always react.
    pub priority_distance: f32,
    /// Fraction of `radius` at which uncommitted moving fleets react.
    pub moving_ratio: f32,
}

impl Default for AwarenessConfig {
    fn default() -> Self {
        Self {
            radius: 60.0,
            priority_distance: 25.0,
            moving_ratio: 0.7,
        }
    }
}

/// Patrol loop parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolConfig {
    /// Points on the patrol circle.
    pub points: usize,
    /// Seconds between patrol generations for one fleet.
    pub cooldown: f64,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            points: 8,
            cooldown: 3.0,
        }
    }
}

/// Coordinated attack parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    /// Seconds between attack decisions.
    pub decision_cooldown: f64,
    /// Nearest colonies considered by weakest-target traits.
    pub candidate_count: usize,
    /// Parking shell radius around the target base.
    pub parking_radius: f32,
    /// Relative radial jitter of parking spots.
    pub parking_jitter: f32,
    /// Maximum angle of parking spots from the base's surface normal (degrees).
    pub parking_cone_degrees: f32,
    /// Minimum distance between two parking spots.
    pub min_spot_separation: f32,
    /// Attempts to find a free spot for a late-joining fleet.
    pub spot_attempts: u32,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            decision_cooldown: 10.0,
            candidate_count: 3,
            parking_radius: 12.0,
            parking_jitter: 0.15,
            parking_cone_degrees: 60.0,
            min_spot_separation: 1.0,
            spot_attempts: 16,
        }
    }
}

fn non_negative(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::Config(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}
