//! Colony, planet and fleet data model.
//!
//! Public fields serialize to the camelCase JSON shape the clients read.
//! Engine-only bookkeeping (cooldowns, attack coordination, change tracking,
//! pending events) is skipped by serde and lives on the entity it belongs to,
//! so it disappears together with that entity.

use std::collections::{BTreeMap, VecDeque};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::components::{
    BuildKind, ColonyId, ColonyLevel, ColonyTrait, FleetId, FleetState, FleetType, ResourceCost,
    ResourceKind, StructureId, StructureType,
};
use crate::config::FleetTypeData;
use crate::diff::ChangeTracker;
use crate::events::ActionEvent;

/// Planet model used when none is given.
pub const DEFAULT_PLANET_MODEL: &str = "Planet_A";

fn default_planet_model() -> String {
    DEFAULT_PLANET_MODEL.to_string()
}

// ============================================================================
// Planet
// ============================================================================

/// Generation rates and accumulated storages of a planet.
///
/// Rates are per tick interval. Temperature is not stored; it only scales
/// resident growth.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NaturalResources {
    /// Natural oil rate.
    pub oil: f64,
    /// Natural steel rate.
    pub steel: f64,
    /// Natural water rate.
    pub water: f64,
    /// Surface temperature.
    pub temperature: f64,
    /// Stored oil.
    #[serde(default)]
    pub oil_storage: f64,
    /// Stored steel.
    #[serde(default)]
    pub steel_storage: f64,
    /// Stored water.
    #[serde(default)]
    pub water_storage: f64,
}

impl NaturalResources {
    /// Natural generation rate of a resource.
    #[must_use]
    pub fn rate(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Oil => self.oil,
            ResourceKind::Steel => self.steel,
            ResourceKind::Water => self.water,
        }
    }

    /// Stored amount of a resource.
    #[must_use]
    pub fn storage(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Oil => self.oil_storage,
            ResourceKind::Steel => self.steel_storage,
            ResourceKind::Water => self.water_storage,
        }
    }

    /// Mutable stored amount of a resource.
    pub fn storage_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Oil => &mut self.oil_storage,
            ResourceKind::Steel => &mut self.steel_storage,
            ResourceKind::Water => &mut self.water_storage,
        }
    }

    /// Stored amounts as a cost value.
    #[must_use]
    pub fn storages(&self) -> ResourceCost {
        ResourceCost::new(self.oil_storage, self.steel_storage, self.water_storage)
    }

    /// Whether every storage covers `cost`.
    #[must_use]
    pub fn can_afford(&self, cost: &ResourceCost) -> bool {
        self.oil_storage >= cost.oil
            && self.steel_storage >= cost.steel
            && self.water_storage >= cost.water
    }

    /// Subtract `cost`, flooring every storage at zero.
    pub fn deduct(&mut self, cost: &ResourceCost) {
        self.oil_storage = (self.oil_storage - cost.oil).max(0.0);
        self.steel_storage = (self.steel_storage - cost.steel).max(0.0);
        self.water_storage = (self.water_storage - cost.water).max(0.0);
    }

    /// Give back a previously deducted cost.
    pub fn refund(&mut self, cost: &ResourceCost) {
        self.oil_storage += cost.oil.max(0.0);
        self.steel_storage += cost.steel.max(0.0);
        self.water_storage += cost.water.max(0.0);
    }
}

/// A production structure on a planet's surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    /// Unique id.
    pub id: StructureId,
    /// Structure type.
    #[serde(rename = "type")]
    pub kind: StructureType,
    /// Surface coordinate, same convention as the main base.
    pub position: Vec2,
    /// Resource produced per tick interval.
    pub production: f64,
}

/// The planet a colony is anchored to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Planet {
    /// World position of the center.
    pub position: Vec3,
    /// Size multiplier on the base planet radius.
    pub scale: f32,
    /// XYZ Euler rotation in radians.
    pub rot: Vec3,
    /// Client model name.
    #[serde(default = "default_planet_model")]
    pub planet_model_name: String,
    /// Main base surface coordinate: longitude as a fraction of π, latitude in degrees.
    pub planet_main_base: Vec2,
    /// Rates and storages.
    pub planet_natural_resources: NaturalResources,
    /// Built structures.
    #[serde(default)]
    pub structures: Vec<Structure>,
}

impl Default for Planet {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: 1.0,
            rot: Vec3::ZERO,
            planet_model_name: default_planet_model(),
            planet_main_base: Vec2::ZERO,
            planet_natural_resources: NaturalResources::default(),
            structures: Vec::new(),
        }
    }
}

impl Planet {
    /// Number of structures of one type.
    #[must_use]
    pub fn structure_count(&self, kind: StructureType) -> usize {
        self.structures.iter().filter(|s| s.kind == kind).count()
    }

    /// Natural rate plus structure production for a resource.
    ///
    /// `producer` maps a structure type to the resource it yields.
    #[must_use]
    pub fn total_rate(
        &self,
        kind: ResourceKind,
        producer: impl Fn(StructureType) -> Option<ResourceKind>,
    ) -> f64 {
        let built: f64 = self
            .structures
            .iter()
            .filter(|s| producer(s.kind) == Some(kind))
            .map(|s| s.production)
            .sum();
        self.planet_natural_resources.rate(kind) + built
    }
}

// ============================================================================
// Fleets
// ============================================================================

/// What a fleet is shooting at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TargetRef {
    /// An enemy fleet, named together with its owning colony.
    Fleet {
        /// Colony owning the fleet.
        colony: ColonyId,
        /// Fleet id.
        fleet: FleetId,
    },
    /// An enemy colony's main base.
    Base {
        /// Colony whose base is targeted.
        colony: ColonyId,
    },
}

impl TargetRef {
    /// Colony the target belongs to.
    #[must_use]
    pub const fn colony(&self) -> ColonyId {
        match *self {
            Self::Fleet { colony, .. } | Self::Base { colony } => colony,
        }
    }
}

/// A fleet's target plus the point it aims at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatTarget {
    /// Target entity.
    #[serde(flatten)]
    pub target: TargetRef,
    /// Aim point in world space.
    pub position: Vec3,
}

/// A group of identical ships moving and fighting as one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fleet {
    /// Unique id.
    pub id: FleetId,
    /// Hull type.
    #[serde(rename = "type")]
    pub kind: FleetType,
    /// Display label.
    #[serde(default)]
    pub label: Option<String>,
    /// Surviving ships, `ceil(hp_pool / unit_max_hp)`.
    pub count: u32,
    /// World position.
    pub position: Vec3,
    /// Velocity of the last movement step.
    pub velocity: Vec3,
    /// Combined hp of all ships.
    pub hp_pool: f32,
    /// Hp of one ship.
    pub unit_max_hp: f32,
    /// Damage per second of one ship.
    pub unit_damage: f32,
    /// Speed in world units per second.
    pub unit_speed: f32,
    /// Behavior state.
    pub state: FleetState,
    /// Pending route in world space.
    #[serde(default)]
    pub waypoints: VecDeque<Vec3>,
    /// Current target.
    #[serde(default)]
    pub target: Option<CombatTarget>,
    /// Point on the home shell that patrols circle.
    #[serde(default)]
    pub home: Option<Vec3>,
    /// Seconds left before an engaged fleet starts dealing damage.
    #[serde(default)]
    pub warmup: f32,
    /// Earliest time a new patrol may be generated.
    #[serde(skip)]
    pub next_patrol_at: f64,
}

impl Fleet {
    /// A fresh idle fleet of `count` ships with stats from the type table.
    #[must_use]
    pub fn from_type(id: FleetId, stats: &FleetTypeData, count: u32, position: Vec3) -> Self {
        let count = count.max(1);
        Self {
            id,
            kind: stats.kind,
            label: Some(format!("{} {}", stats.kind, id)),
            count,
            position,
            velocity: Vec3::ZERO,
            hp_pool: stats.max_hp * count as f32,
            unit_max_hp: stats.max_hp,
            unit_damage: stats.damage,
            unit_speed: stats.speed,
            state: FleetState::Idle,
            waypoints: VecDeque::new(),
            target: None,
            home: Some(position),
            warmup: 0.0,
            next_patrol_at: 0.0,
        }
    }

    /// Whether the fleet still has hp.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp_pool > 0.0
    }

    /// Damage per second of the whole group.
    #[must_use]
    pub fn dps(&self) -> f32 {
        self.count as f32 * self.unit_damage
    }

    /// Recompute `count` from the hp pool.
    pub fn refresh_count(&mut self) {
        self.count = if self.hp_pool <= 0.0 || self.unit_max_hp <= 0.0 {
            0
        } else {
            (self.hp_pool / self.unit_max_hp).ceil() as u32
        };
    }

    /// Drop route, target and velocity and go idle.
    pub fn go_idle(&mut self) {
        self.state = FleetState::Idle;
        self.target = None;
        self.waypoints.clear();
        self.velocity = Vec3::ZERO;
        self.warmup = 0.0;
    }

    /// Stop and engage `target` after a warmup.
    pub fn engage(&mut self, target: CombatTarget, warmup: f32) {
        self.state = FleetState::Attacking;
        self.target = Some(target);
        self.waypoints.clear();
        self.velocity = Vec3::ZERO;
        self.warmup = warmup;
    }

    /// Follow `route`, engaging `target` on arrival if given.
    pub fn move_along(&mut self, route: Vec<Vec3>, target: Option<CombatTarget>) {
        self.state = FleetState::Moving;
        self.waypoints = route.into();
        self.target = target;
        self.warmup = 0.0;
    }

    /// Whether the fleet is heading for or shooting at `colony`'s base.
    #[must_use]
    pub fn targets_base_of(&self, colony: ColonyId) -> bool {
        matches!(
            self.target,
            Some(CombatTarget { target: TargetRef::Base { colony: c }, .. }) if c == colony
        )
    }
}

// ============================================================================
// Colony
// ============================================================================

/// A colony-wide attack in progress.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttackPlan {
    /// Colony under attack.
    pub target_colony: ColonyId,
    /// Parking spot per participating fleet.
    pub assignments: BTreeMap<FleetId, Vec3>,
}

impl AttackPlan {
    /// Whether `fleet` has a parking spot in this plan.
    #[must_use]
    pub fn includes(&self, fleet: FleetId) -> bool {
        self.assignments.contains_key(&fleet)
    }
}

/// Engine-only colony state.
#[derive(Debug, Clone, Default)]
pub struct ColonyRuntime {
    /// Time of the last successful build.
    pub last_build_at: Option<f64>,
    /// Earliest time each build kind may be built again.
    pub build_ready_at: BTreeMap<BuildKind, f64>,
    /// Earliest time of the next attack decision.
    pub next_attack_decision_at: f64,
    /// Coordinated attack in progress.
    pub attack: Option<AttackPlan>,
}

/// A colony anchored to one planet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Colony {
    /// Unique id.
    pub id: ColonyId,
    /// Owning colony id. Equal to `id` until conquered.
    pub owner: ColonyId,
    /// Display name.
    pub name: String,
    /// Owner color, `#rrggbb`.
    pub color: String,
    /// Population.
    pub residents: f64,
    /// Base hp.
    pub hp: f32,
    /// Base max hp.
    pub max_hp: f32,
    /// AI profile.
    #[serde(rename = "trait")]
    pub colony_trait: ColonyTrait,
    /// Progression level.
    pub colony_level: ColonyLevel,
    /// Home planet.
    pub planet: Planet,
    /// Fleets owned by this colony.
    #[serde(default)]
    pub colony_fleet: Vec<Fleet>,

    /// Engine-only state.
    #[serde(skip)]
    pub runtime: ColonyRuntime,
    /// Transport change tracking.
    #[serde(skip, default = "ChangeTracker::new")]
    pub tracker: ChangeTracker,
    /// Events waiting to be drained.
    #[serde(skip)]
    pub pending_events: Vec<ActionEvent>,
}

impl Colony {
    /// A self-owned colony with a default planet at the origin.
    #[must_use]
    pub fn named(id: ColonyId, name: &str) -> Self {
        Self {
            id,
            owner: id,
            name: name.to_string(),
            color: "#ffffff".to_string(),
            residents: 0.0,
            hp: 1000.0,
            max_hp: 1000.0,
            colony_trait: ColonyTrait::Defensive,
            colony_level: ColonyLevel::Colony,
            planet: Planet::default(),
            colony_fleet: Vec::new(),
            runtime: ColonyRuntime::default(),
            tracker: ChangeTracker::new(),
            pending_events: Vec::new(),
        }
    }

    /// Flag the colony for the next change read.
    pub fn mark_dirty(&mut self) {
        self.tracker.mark();
    }

    /// Whether `other` belongs to a different owner.
    #[must_use]
    pub fn is_enemy_of(&self, other: &Self) -> bool {
        self.owner != other.owner
    }

    /// Snapshot of fleet ids in list order.
    #[must_use]
    pub fn fleet_ids(&self) -> Vec<FleetId> {
        self.colony_fleet.iter().map(|f| f.id).collect()
    }

    /// Fleet by id.
    #[must_use]
    pub fn fleet(&self, id: FleetId) -> Option<&Fleet> {
        self.colony_fleet.iter().find(|f| f.id == id)
    }

    /// Mutable fleet by id.
    pub fn fleet_mut(&mut self, id: FleetId) -> Option<&mut Fleet> {
        self.colony_fleet.iter_mut().find(|f| f.id == id)
    }

    /// Remove and return a fleet.
    pub fn remove_fleet(&mut self, id: FleetId) -> Option<Fleet> {
        let idx = self.colony_fleet.iter().position(|f| f.id == id)?;
        if let Some(plan) = self.runtime.attack.as_mut() {
            plan.assignments.remove(&id);
        }
        self.mark_dirty();
        Some(self.colony_fleet.remove(idx))
    }

    /// Total fleet hp.
    #[must_use]
    pub fn fleet_strength(&self) -> f32 {
        self.colony_fleet.iter().map(|f| f.hp_pool.max(0.0)).sum()
    }

    /// Base hp plus fleet hp, used to rank attack targets.
    #[must_use]
    pub fn strength(&self) -> f32 {
        self.hp.max(0.0) + self.fleet_strength()
    }
}

/// Index of the colony with `id` in `colonies`.
#[must_use]
pub fn index_of(colonies: &[Colony], id: ColonyId) -> Option<usize> {
    colonies.iter().position(|c| c.id == id)
}

/// Two distinct colonies borrowed mutably at once.
///
/// Returns `None` when `a == b` or either index is out of range.
pub fn pair_mut(colonies: &mut [Colony], a: usize, b: usize) -> Option<(&mut Colony, &mut Colony)> {
    if a == b || a >= colonies.len() || b >= colonies.len() {
        return None;
    }
    if a < b {
        let (left, right) = colonies.split_at_mut(b);
        Some((&mut left[a], &mut right[0]))
    } else {
        let (left, right) = colonies.split_at_mut(a);
        Some((&mut right[0], &mut left[b]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn fighter(id: FleetId, count: u32) -> Fleet {
        let config = EngineConfig::default();
        Fleet::from_type(id, config.fleet_type(FleetType::Fighter).unwrap(), count, Vec3::ZERO)
    }

    #[test]
    fn test_count_tracks_hp_pool() {
        let mut fleet = fighter(1, 5);
        assert_eq!(fleet.hp_pool, 300.0);
        fleet.hp_pool = 121.0;
        fleet.refresh_count();
        assert_eq!(fleet.count, 3);
        fleet.hp_pool = -1.0;
        fleet.refresh_count();
        assert_eq!(fleet.count, 0);
        assert!(!fleet.is_alive());
    }

    #[test]
    fn test_deduct_floors_at_zero_and_refund_restores() {
        let mut res = NaturalResources {
            oil_storage: 50.0,
            steel_storage: 10.0,
            ..Default::default()
        };
        let cost = ResourceCost::new(20.0, 30.0, 0.0);
        assert!(!res.can_afford(&cost));
        res.deduct(&cost);
        assert_eq!(res.oil_storage, 30.0);
        assert_eq!(res.steel_storage, 0.0);
        res.refund(&ResourceCost::new(20.0, 0.0, 0.0));
        assert_eq!(res.oil_storage, 50.0);
    }

    #[test]
    fn test_remove_fleet_releases_attack_slot() {
        let mut colony = Colony::named(1, "Colony 1");
        colony.colony_fleet.push(fighter(10, 5));
        let mut plan = AttackPlan {
            target_colony: 2,
            ..Default::default()
        };
        plan.assignments.insert(10, Vec3::X);
        colony.runtime.attack = Some(plan);

        assert!(colony.remove_fleet(10).is_some());
        assert!(colony.remove_fleet(10).is_none());
        assert!(colony.runtime.attack.as_ref().unwrap().assignments.is_empty());
    }

    #[test]
    fn test_colony_json_uses_client_field_names() {
        let mut colony = Colony::named(3, "Colony 3");
        colony.colony_fleet.push(fighter(1, 2));
        let json = serde_json::to_value(&colony).unwrap();
        assert_eq!(json["colonyLevel"], "Colony");
        assert_eq!(json["trait"], "Defensive");
        assert_eq!(json["planet"]["planetModelName"], DEFAULT_PLANET_MODEL);
        assert_eq!(json["colonyFleet"][0]["type"], "Fighter");
        assert_eq!(json["colonyFleet"][0]["hpPool"], 120.0);
        assert!(json.get("runtime").is_none());
    }

    #[test]
    fn test_pair_mut_borrows_both_orders() {
        let mut colonies = vec![Colony::named(1, "A"), Colony::named(2, "B")];
        let (b, a) = pair_mut(&mut colonies, 1, 0).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert!(pair_mut(&mut colonies, 1, 1).is_none());
        assert!(pair_mut(&mut colonies, 0, 5).is_none());
        assert_eq!(index_of(&colonies, 2), Some(1));
    }

    #[test]
    fn test_target_json_is_tagged() {
        let target = CombatTarget {
            target: TargetRef::Base { colony: 4 },
            position: Vec3::new(1.0, 2.0, 3.0),
        };
        let json = serde_json::to_value(target).unwrap();
        assert_eq!(json["kind"], "base");
        assert_eq!(json["colony"], 4);
        let back: CombatTarget = serde_json::from_value(json).unwrap();
        assert_eq!(back, target);
    }
}
