//! Resource accumulation, population growth, construction and levels.
//!
//! Rates are expressed per tick interval, so every quantity that changes
//! continuously is scaled by `dt / tick_interval`.

use glam::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::colony::{Colony, Fleet, NaturalResources, Planet, Structure};
use crate::components::{BuildKind, FleetId, FleetType, ResourceKind, StructureId, StructureType};
use crate::config::{EconomyConfig, EngineConfig, OrbitConfig};
use crate::error::Result;
use crate::events::EventCategory;
use crate::geometry::surface_point;
use crate::orbit;
use crate::simulation::TickContext;

const RESOURCES: [ResourceKind; 3] = [ResourceKind::Oil, ResourceKind::Steel, ResourceKind::Water];

// ============================================================================
// Growth model
// ============================================================================

/// Growth factor from surface temperature.
///
/// 1.0 at the ideal temperature, falling linearly to the floor at the edge of
/// the tolerance band and flat beyond it.
#[must_use]
pub fn temperature_factor(temperature: f64, economy: &EconomyConfig) -> f64 {
    let deviation = (temperature - economy.ideal_temperature).abs();
    if economy.temperature_tolerance <= 0.0 || deviation >= economy.temperature_tolerance {
        return economy.min_growth_factor;
    }
    let t = deviation / economy.temperature_tolerance;
    1.0 - (1.0 - economy.min_growth_factor) * t
}

/// Growth factor from water generation.
#[must_use]
pub fn water_factor(water_rate: f64, economy: &EconomyConfig) -> f64 {
    if water_rate <= 0.0 {
        return economy.min_growth_factor;
    }
    if water_rate >= economy.max_water_rate {
        return economy.max_water_factor;
    }
    let t = water_rate / economy.max_water_rate;
    economy.min_growth_factor + (economy.max_water_factor - economy.min_growth_factor) * t
}

/// Residents the stored building materials can house.
#[must_use]
pub fn building_capacity(resources: &NaturalResources, economy: &EconomyConfig) -> f64 {
    (resources.steel_storage * economy.steel_capacity_factor)
        .min(resources.oil_storage * economy.oil_capacity_factor)
        .max(0.0)
}

/// Residents gained over one tick interval.
///
/// Zero at or above capacity, ramped down linearly over the top
/// `growth_ramp` fraction of capacity.
#[must_use]
pub fn resident_growth(
    residents: f64,
    capacity: f64,
    temperature: f64,
    water_factor: f64,
    economy: &EconomyConfig,
) -> f64 {
    if residents >= capacity {
        return 0.0;
    }
    let base = economy.base_growth_rate * temperature * water_factor;
    let ramp_band = capacity * economy.growth_ramp;
    if ramp_band > 0.0 && residents > capacity - ramp_band {
        base * ((capacity - residents) / ramp_band)
    } else {
        base
    }
}

/// Rate of `kind` including built structures.
fn total_rate(planet: &Planet, kind: ResourceKind, config: &EngineConfig) -> f64 {
    planet.total_rate(kind, |s| config.structure_type(s).ok().map(|d| d.resource))
}

/// Accumulate resources and grow the population for one step.
pub fn accumulate(colony: &mut Colony, config: &EngineConfig, dt: f64) {
    let scale = dt / config.tick_interval;
    let rates = RESOURCES.map(|kind| (kind, total_rate(&colony.planet, kind, config)));

    let resources = &mut colony.planet.planet_natural_resources;
    for (kind, rate) in rates {
        let storage = resources.storage_mut(kind);
        *storage = (*storage + rate * scale).max(0.0);
    }

    let economy = &config.economy;
    let capacity = building_capacity(resources, economy);
    let tf = temperature_factor(resources.temperature, economy);
    let water_rate = rates.iter().find(|(k, _)| *k == ResourceKind::Water).map_or(0.0, |r| r.1);
    let wf = water_factor(water_rate, economy);
    let growth = resident_growth(colony.residents, capacity, tf, wf, economy) * scale;
    if growth > 0.0 {
        colony.residents = (colony.residents + growth).min(capacity);
    }
    colony.residents = colony.residents.max(0.0);
}

/// Advance one level if residents and every storage meet its thresholds.
///
/// Consumes half of the threshold resources and resets hp to the new
/// level's base hp. Returns whether the colony advanced.
pub fn try_level_up(colony: &mut Colony, ctx: &mut TickContext<'_>) -> bool {
    let Some(next) = ctx.config.next_level(colony.colony_level) else {
        return false;
    };
    let resources = &colony.planet.planet_natural_resources;
    if colony.residents < next.residents || !resources.can_afford(&next.resources) {
        return false;
    }

    colony
        .planet
        .planet_natural_resources
        .deduct(&next.resources.half());
    colony.colony_level = next.level;
    colony.max_hp = next.base_hp;
    colony.hp = next.base_hp;

    tracing::info!(colony = colony.id, level = %next.level, "Colony advanced");
    let message = format!("Advanced to {}", next.level);
    ctx.recorder.record(colony, EventCategory::Level, message);
    true
}

/// Economy phase of a colony's tick.
pub fn update(colony: &mut Colony, ctx: &mut TickContext<'_>) {
    accumulate(colony, ctx.config, ctx.dt);
    try_level_up(colony, ctx);
    colony.mark_dirty();
}

// ============================================================================
// Construction
// ============================================================================

/// Whether `kind` is off its per-kind cooldown.
fn off_cooldown(colony: &Colony, kind: BuildKind, now: f64) -> bool {
    colony
        .runtime
        .build_ready_at
        .get(&kind)
        .map_or(true, |ready| now >= *ready)
}

/// Whether the colony-wide build cooldown has passed.
#[must_use]
pub fn global_cooldown_passed(colony: &Colony, config: &EngineConfig, now: f64) -> bool {
    colony
        .runtime
        .last_build_at
        .map_or(true, |last| now - last >= config.build.global_cooldown)
}

/// Structure types the colony can build right now.
pub fn buildable_structures(colony: &Colony, config: &EngineConfig, now: f64) -> Vec<StructureType> {
    config
        .structure_types
        .iter()
        .filter(|s| colony.colony_level >= s.min_level)
        .filter(|s| colony.planet.structure_count(s.kind) < s.max_per_planet)
        .filter(|s| colony.planet.planet_natural_resources.can_afford(&s.cost))
        .filter(|s| off_cooldown(colony, BuildKind::Structure(s.kind), now))
        .map(|s| s.kind)
        .collect()
}

/// Fleet types the colony can launch right now.
pub fn buildable_fleets(colony: &Colony, config: &EngineConfig, now: f64) -> Result<Vec<FleetType>> {
    let level = config.level(colony.colony_level)?;
    let mut kinds = Vec::new();
    for kind in &level.unlocked_fleets {
        let data = config.fleet_type(*kind)?;
        if colony.planet.planet_natural_resources.can_afford(&data.cost)
            && off_cooldown(colony, BuildKind::Fleet(*kind), now)
        {
            kinds.push(*kind);
        }
    }
    Ok(kinds)
}

/// Pick a surface coordinate for a new structure by rejection sampling.
///
/// Candidates within `structure_min_distance` (measured on the planet in
/// world units) of the main base or any existing structure are rejected.
pub fn find_structure_site(
    planet: &Planet,
    orbit: &OrbitConfig,
    economy: &EconomyConfig,
    rng: &mut impl Rng,
) -> Option<Vec2> {
    let radius = orbit::body_radius(planet, orbit);
    let rotation = orbit.apply_planet_rotation.then_some(planet.rot);
    let on_surface = |coord: Vec2| surface_point(planet.position, radius, coord, rotation);

    let base = planet.planet_main_base;
    let mut taken = vec![on_surface(base)];
    taken.extend(planet.structures.iter().map(|s| on_surface(s.position)));

    for _ in 0..economy.structure_attempts {
        let mut x = base.x + rng.gen_range(-economy.structure_range_x..=economy.structure_range_x);
        if x > 1.0 {
            x -= 2.0;
        } else if x < -1.0 {
            x += 2.0;
        }
        let y = (base.y + rng.gen_range(-economy.structure_range_y..=economy.structure_range_y))
            .clamp(-90.0, 90.0);
        let candidate = Vec2::new(x, y);
        let point = on_surface(candidate);
        if taken
            .iter()
            .all(|t| t.distance(point) >= economy.structure_min_distance)
        {
            return Some(candidate);
        }
    }
    None
}

/// Build a structure, paying its cost.
///
/// Returns `Ok(None)` without side effects when no site is found; the cost
/// is refunded and no event is recorded.
pub fn build_structure(
    colony: &mut Colony,
    kind: StructureType,
    ctx: &mut TickContext<'_>,
) -> Result<Option<StructureId>> {
    let data = ctx.config.structure_type(kind)?;
    if !colony.planet.planet_natural_resources.can_afford(&data.cost) {
        return Ok(None);
    }
    colony.planet.planet_natural_resources.deduct(&data.cost);

    let site = find_structure_site(
        &colony.planet,
        &ctx.config.orbit,
        &ctx.config.economy,
        &mut *ctx.rng,
    );
    let Some(position) = site else {
        colony.planet.planet_natural_resources.refund(&data.cost);
        tracing::warn!(colony = colony.id, structure = %kind, "No free site for structure");
        return Ok(None);
    };

    let id = ctx.ids.next_structure();
    colony.planet.structures.push(Structure {
        id,
        kind,
        position,
        production: data.production,
    });
    colony
        .runtime
        .build_ready_at
        .insert(BuildKind::Structure(kind), ctx.now + data.cooldown);
    ctx.recorder
        .record(colony, EventCategory::Build, format!("Built {kind}"));
    Ok(Some(id))
}

/// Launch a new fleet group at the home shell, paying its cost.
pub fn spawn_fleet(
    colony: &mut Colony,
    kind: FleetType,
    ctx: &mut TickContext<'_>,
) -> Result<Option<FleetId>> {
    let data = ctx.config.fleet_type(kind)?;
    if !colony.planet.planet_natural_resources.can_afford(&data.cost) {
        return Ok(None);
    }
    colony.planet.planet_natural_resources.deduct(&data.cost);

    let id = ctx.ids.next_fleet();
    let anchor = orbit::home_anchor(&colony.planet, &ctx.config.orbit);
    let fleet = Fleet::from_type(id, data, ctx.config.build.fleet_group_size, anchor);
    let count = fleet.count;
    colony.colony_fleet.push(fleet);
    colony
        .runtime
        .build_ready_at
        .insert(BuildKind::Fleet(kind), ctx.now + data.cooldown);

    tracing::debug!(colony = colony.id, fleet = id, %kind, "Fleet launched");
    let message = format!("Launched {kind} fleet ({count} ships)");
    ctx.recorder.record(colony, EventCategory::Fleet, message);
    Ok(Some(id))
}

/// Let the colony's AI spend resources on one structure or fleet.
///
/// Skipped with `build.skip_chance` and during the global cooldown. The
/// trait profile weighs the two categories; when the preferred category has
/// nothing available the other one is used.
pub fn auto_build(colony: &mut Colony, ctx: &mut TickContext<'_>) -> Result<Option<BuildKind>> {
    if ctx.rng.gen_bool(ctx.config.build.skip_chance.clamp(0.0, 1.0)) {
        return Ok(None);
    }
    if !global_cooldown_passed(colony, ctx.config, ctx.now) {
        return Ok(None);
    }

    let profile = ctx.config.trait_profile(colony.colony_trait)?;
    let structures: Vec<BuildKind> = buildable_structures(colony, ctx.config, ctx.now)
        .into_iter()
        .map(BuildKind::Structure)
        .collect();
    let fleets: Vec<BuildKind> = if profile.builds_fleets() {
        buildable_fleets(colony, ctx.config, ctx.now)?
            .into_iter()
            .map(BuildKind::Fleet)
            .collect()
    } else {
        Vec::new()
    };

    let prefer_fleet = ctx
        .rng
        .gen_bool(profile.fleet_probability().clamp(0.0, 1.0));
    let (preferred, fallback) = if prefer_fleet {
        (&fleets, &structures)
    } else {
        (&structures, &fleets)
    };
    let pool = if preferred.is_empty() { fallback } else { preferred };
    let Some(choice) = pool.choose(&mut *ctx.rng).copied() else {
        return Ok(None);
    };

    let built = match choice {
        BuildKind::Structure(kind) => build_structure(colony, kind, ctx)?.is_some(),
        BuildKind::Fleet(kind) => spawn_fleet(colony, kind, ctx)?.is_some(),
    };
    if built {
        colony.runtime.last_build_at = Some(ctx.now);
        Ok(Some(choice))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ColonyLevel, ColonyTrait};
    use crate::events;
    use crate::simulation::TestParts;

    fn stocked_colony() -> Colony {
        let mut colony = Colony::named(1, "Colony 1");
        let res = &mut colony.planet.planet_natural_resources;
        res.oil_storage = 1000.0;
        res.steel_storage = 1000.0;
        res.water_storage = 1000.0;
        colony
    }

    #[test]
    fn test_temperature_factor() {
        let economy = EconomyConfig::default();
        assert_eq!(temperature_factor(20.0, &economy), 1.0);
        assert!((temperature_factor(27.5, &economy) - 0.55).abs() < 1e-9);
        assert_eq!(temperature_factor(35.0, &economy), 0.1);
        assert_eq!(temperature_factor(-40.0, &economy), 0.1);
    }

    #[test]
    fn test_water_factor() {
        let economy = EconomyConfig::default();
        assert_eq!(water_factor(0.0, &economy), 0.1);
        assert!((water_factor(1.0, &economy) - 1.3).abs() < 1e-9);
        assert_eq!(water_factor(2.0, &economy), 2.5);
        assert_eq!(water_factor(9.0, &economy), 2.5);
    }

    #[test]
    fn test_growth_zero_at_capacity() {
        let economy = EconomyConfig::default();
        assert_eq!(resident_growth(100.0, 100.0, 1.0, 1.0, &economy), 0.0);
        assert_eq!(resident_growth(150.0, 100.0, 1.0, 1.0, &economy), 0.0);
        let ramped = resident_growth(95.0, 100.0, 1.0, 1.0, &economy);
        let full = resident_growth(10.0, 100.0, 1.0, 1.0, &economy);
        assert!(ramped > 0.0 && ramped < full);
        assert!((ramped - full * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_accumulate_scales_with_step() {
        let config = EngineConfig::default();
        let mut colony = Colony::named(1, "Colony 1");
        colony.planet.planet_natural_resources.oil = 1.0;
        colony.planet.planet_natural_resources.steel = -3.0;
        accumulate(&mut colony, &config, 0.4);
        let res = &colony.planet.planet_natural_resources;
        assert!((res.oil_storage - 2.0).abs() < 1e-9);
        assert_eq!(res.steel_storage, 0.0);
    }

    #[test]
    fn test_structures_add_to_rate() {
        let config = EngineConfig::default();
        let mut colony = Colony::named(1, "Colony 1");
        colony.planet.structures.push(Structure {
            id: 1,
            kind: StructureType::OilPump,
            position: Vec2::ZERO,
            production: 0.5,
        });
        accumulate(&mut colony, &config, config.tick_interval);
        assert!((colony.planet.planet_natural_resources.oil_storage - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_residents_never_exceed_capacity() {
        let config = EngineConfig::default();
        let mut colony = Colony::named(1, "Colony 1");
        let res = &mut colony.planet.planet_natural_resources;
        res.oil_storage = 10.0;
        res.steel_storage = 10.0;
        res.temperature = 20.0;
        res.water = 2.0;
        colony.residents = 19.99;
        for _ in 0..100 {
            accumulate(&mut colony, &config, 0.2);
        }
        assert!(colony.residents <= 20.0 + 1e-9);
    }

    #[test]
    fn test_level_up_consumes_half_and_resets_hp() {
        let mut parts = TestParts::new();
        let mut colony = stocked_colony();
        colony.residents = 250.0;
        colony.hp = 10.0;
        let leveled = try_level_up(&mut colony, &mut parts.ctx());
        assert!(leveled);
        assert_eq!(colony.colony_level, ColonyLevel::Settlement);
        assert_eq!(colony.hp, 2000.0);
        assert_eq!(colony.max_hp, 2000.0);
        let res = &colony.planet.planet_natural_resources;
        assert_eq!(res.oil_storage, 800.0);
        assert_eq!(res.water_storage, 900.0);
        let events = events::drain(&mut colony);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, EventCategory::Level);
    }

    #[test]
    fn test_level_up_requires_residents() {
        let mut parts = TestParts::new();
        let mut colony = stocked_colony();
        colony.residents = 10.0;
        assert!(!try_level_up(&mut colony, &mut parts.ctx()));
        assert_eq!(colony.colony_level, ColonyLevel::Colony);
    }

    #[test]
    fn test_structure_level_gate_and_max() {
        let config = EngineConfig::default();
        let mut colony = stocked_colony();
        let kinds = buildable_structures(&colony, &config, 0.0);
        assert!(!kinds.contains(&StructureType::WaterPump));
        for i in 0..4 {
            colony.planet.structures.push(Structure {
                id: i,
                kind: StructureType::OilPump,
                position: Vec2::ZERO,
                production: 0.5,
            });
        }
        let kinds = buildable_structures(&colony, &config, 0.0);
        assert!(!kinds.contains(&StructureType::OilPump));
        assert!(kinds.contains(&StructureType::SteelMill));
    }

    #[test]
    fn test_build_structure_places_apart() {
        let mut parts = TestParts::new();
        let mut colony = stocked_colony();
        for _ in 0..3 {
            build_structure(&mut colony, StructureType::SteelMill, &mut parts.ctx())
                .unwrap()
                .unwrap();
        }
        assert_eq!(colony.planet.structures.len(), 3);
        let orbit = OrbitConfig::default();
        let r = orbit::body_radius(&colony.planet, &orbit);
        let points: Vec<_> = colony
            .planet
            .structures
            .iter()
            .map(|s| surface_point(colony.planet.position, r, s.position, None))
            .collect();
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!(a.distance(*b) >= 1.5);
            }
        }
        assert_eq!(colony.planet.planet_natural_resources.oil_storage, 760.0);
    }

    #[test]
    fn test_failed_placement_refunds() {
        let mut parts = TestParts::new();
        parts.config.economy.structure_min_distance = 1.0e6;
        let mut colony = stocked_colony();
        let built = build_structure(&mut colony, StructureType::OilPump, &mut parts.ctx()).unwrap();
        assert!(built.is_none());
        assert_eq!(colony.planet.planet_natural_resources.steel_storage, 1000.0);
        assert!(events::drain(&mut colony).is_empty());
    }

    #[test]
    fn test_pacifist_never_builds_fleets() {
        let mut parts = TestParts::new();
        parts.config.build.skip_chance = 0.0;
        parts.config.build.global_cooldown = 0.0;
        let mut colony = stocked_colony();
        colony.colony_trait = ColonyTrait::Pacifist;
        for step in 0..200 {
            parts.now = f64::from(step) * 10.0;
            auto_build(&mut colony, &mut parts.ctx()).unwrap();
            let res = &mut colony.planet.planet_natural_resources;
            res.oil_storage = 1000.0;
            res.steel_storage = 1000.0;
            res.water_storage = 1000.0;
        }
        assert!(colony.colony_fleet.is_empty());
        assert!(!colony.planet.structures.is_empty());
    }

    #[test]
    fn test_auto_build_respects_global_cooldown() {
        let mut parts = TestParts::new();
        parts.config.build.skip_chance = 0.0;
        let mut colony = stocked_colony();
        colony.colony_trait = ColonyTrait::Aggressive;
        colony.colony_level = ColonyLevel::Settlement;
        let built = auto_build(&mut colony, &mut parts.ctx()).unwrap();
        assert!(built.is_some());
        assert_eq!(colony.runtime.last_build_at, Some(0.0));

        // Inside the global cooldown nothing happens.
        parts.now = 1.0;
        assert!(auto_build(&mut colony, &mut parts.ctx()).unwrap().is_none());
    }

    #[test]
    fn test_spawn_fleet_at_home_shell() {
        let mut parts = TestParts::new();
        let mut colony = stocked_colony();
        let id = spawn_fleet(&mut colony, FleetType::Fighter, &mut parts.ctx())
            .unwrap()
            .unwrap();
        let fleet = colony.fleet(id).unwrap();
        assert_eq!(fleet.count, 5);
        let shell = orbit::shell_radius(&colony.planet, &OrbitConfig::default());
        assert!((fleet.position.distance(colony.planet.position) - shell).abs() < 1e-3);
        assert!(!off_cooldown(&colony, BuildKind::Fleet(FleetType::Fighter), 1.0));
    }
}
