//! Colony creation from partial payloads.
//!
//! A payload names at least the colony; everything else is filled in. A
//! missing planet is generated at a random position that keeps the minimum
//! distance to every existing planet. A supplied planet is taken as is.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::colony::{Colony, ColonyRuntime, Fleet, NaturalResources, Planet, DEFAULT_PLANET_MODEL};
use crate::components::{ColonyId, ColonyLevel, ColonyTrait, FleetType};
use crate::config::EngineConfig;
use crate::diff::ChangeTracker;
use crate::error::{EngineError, Result};
use crate::orbit;
use crate::simulation::IdAllocator;

/// A fleet group requested in a creation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSpec {
    /// Hull type.
    #[serde(rename = "type")]
    pub kind: FleetType,
    /// Ships in the group. Defaults to 1.
    #[serde(default)]
    pub count: Option<u32>,
    /// Start position. Defaults to the colony's home anchor.
    #[serde(default)]
    pub position: Option<Vec3>,
    /// Display label.
    #[serde(default)]
    pub label: Option<String>,
    /// Explicit hp pool, e.g. for a damaged group.
    #[serde(default)]
    pub hp_pool: Option<f32>,
}

/// Partial colony description accepted by [`create_colony`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColonySpec {
    /// Explicit id. Generated when missing.
    #[serde(default)]
    pub id: Option<ColonyId>,
    /// Display name. Required.
    #[serde(default)]
    pub name: Option<String>,
    /// Owner. Defaults to the colony itself.
    #[serde(default)]
    pub owner: Option<ColonyId>,
    /// `#rrggbb`. Random when missing.
    #[serde(default)]
    pub color: Option<String>,
    /// Population, at least 0.
    #[serde(default)]
    pub residents: Option<f64>,
    /// AI profile. Random when missing.
    #[serde(default, rename = "trait")]
    pub colony_trait: Option<ColonyTrait>,
    /// Starting level.
    #[serde(default)]
    pub colony_level: Option<ColonyLevel>,
    /// Base hp. Defaults to the level's base hp.
    #[serde(default)]
    pub hp: Option<f32>,
    /// Explicit planet, kept unchanged.
    #[serde(default)]
    pub planet: Option<Planet>,
    /// Starting fleet groups.
    #[serde(default)]
    pub colony_fleet: Option<Vec<FleetSpec>>,
}

impl ColonySpec {
    /// A spec carrying only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Parse a JSON payload.
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| EngineError::InvalidPayload(e.to_string()))
    }
}

/// Random `#rrggbb` color.
pub fn random_color(rng: &mut impl Rng) -> String {
    format!("#{:06x}", rng.gen_range(0..=0x00FF_FFFFu32))
}

/// Random planet that keeps `min_planet_distance` to every planet in `existing`.
pub fn random_planet(existing: &[Colony], config: &EngineConfig, rng: &mut impl Rng) -> Result<Planet> {
    let world = &config.world;
    let bounds = world.bounds;
    let mut position = None;
    for _ in 0..world.placement_attempts {
        let candidate = Vec3::new(
            rng.gen_range(-bounds..=bounds),
            rng.gen_range(-bounds..=bounds),
            rng.gen_range(-bounds..=bounds),
        );
        let clear = existing
            .iter()
            .all(|c| c.planet.position.distance(candidate) >= world.min_planet_distance);
        if clear {
            position = Some(candidate);
            break;
        }
    }
    let Some(position) = position else {
        return Err(EngineError::Placement {
            attempts: world.placement_attempts,
        });
    };

    let (min_scale, max_scale) = world.scale_range;
    Ok(Planet {
        position,
        scale: rng.gen_range(min_scale..=max_scale),
        rot: Vec3::new(rng.gen_range(0.0..TAU), rng.gen_range(0.0..TAU), rng.gen_range(0.0..TAU)),
        planet_model_name: DEFAULT_PLANET_MODEL.to_string(),
        planet_main_base: Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-50.0..=50.0)),
        planet_natural_resources: NaturalResources {
            oil: rng.gen_range(0.0..=2.0),
            steel: rng.gen_range(0.0..=2.0),
            water: rng.gen_range(0.0..=2.0),
            temperature: rng.gen_range(0.0..=30.0),
            ..NaturalResources::default()
        },
        structures: Vec::new(),
    })
}

/// Build a colony from `spec`, filling every missing field.
///
/// # Errors
///
/// `InvalidPayload` for a missing name, negative residents or an id already
/// in use; `Placement` when no random planet position satisfies the minimum
/// distance within the attempt budget.
pub fn create_colony(
    spec: ColonySpec,
    existing: &[Colony],
    config: &EngineConfig,
    rng: &mut impl Rng,
    ids: &mut IdAllocator,
) -> Result<Colony> {
    let name = spec
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| EngineError::InvalidPayload("colony name is required".into()))?;
    let residents = spec.residents.unwrap_or(0.0);
    if !residents.is_finite() || residents < 0.0 {
        return Err(EngineError::InvalidPayload(format!(
            "residents must be a non-negative number, got {residents}"
        )));
    }
    let id = match spec.id {
        Some(id) if existing.iter().any(|c| c.id == id) => {
            return Err(EngineError::InvalidPayload(format!("colony id {id} already exists")));
        }
        Some(id) => {
            ids.observe_colony(id);
            id
        }
        None => ids.next_colony(),
    };

    let colony_level = spec.colony_level.unwrap_or(ColonyLevel::Colony);
    let level = config.level(colony_level)?;
    let colony_trait = match spec.colony_trait {
        Some(t) => t,
        None => *ColonyTrait::ALL.choose(rng).unwrap_or(&ColonyTrait::Defensive),
    };
    let planet = match spec.planet {
        Some(planet) => planet,
        None => random_planet(existing, config, rng)?,
    };
    let max_hp = level.base_hp.max(spec.hp.unwrap_or(0.0));
    let color = spec.color.unwrap_or_else(|| random_color(rng));

    let anchor = orbit::home_anchor(&planet, &config.orbit);
    let mut colony_fleet = Vec::new();
    for fleet in spec.colony_fleet.unwrap_or_default() {
        let stats = config.fleet_type(fleet.kind)?;
        let mut group = Fleet::from_type(
            ids.next_fleet(),
            stats,
            fleet.count.unwrap_or(1),
            fleet.position.unwrap_or(anchor),
        );
        if let Some(label) = fleet.label {
            group.label = Some(label);
        }
        if let Some(hp_pool) = fleet.hp_pool.filter(|hp| *hp > 0.0) {
            group.hp_pool = hp_pool;
            group.refresh_count();
        }
        colony_fleet.push(group);
    }

    tracing::debug!(id, name = %name, trait_ = ?colony_trait, "Colony created");
    Ok(Colony {
        id,
        owner: spec.owner.unwrap_or(id),
        name,
        color,
        residents,
        hp: spec.hp.unwrap_or(level.base_hp),
        max_hp,
        colony_trait,
        colony_level,
        planet,
        colony_fleet,
        runtime: ColonyRuntime::default(),
        tracker: ChangeTracker::new(),
        pending_events: Vec::new(),
    })
}
