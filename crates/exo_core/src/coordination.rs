//! Colony-wide coordinated attacks.
//!
//! Every `attack.decision_cooldown` seconds a colony without an active plan
//! rolls its trait's attack chance. A launched plan picks a target colony,
//! spreads parking spots over a cone above the target's main base and sends
//! each participating fleet along a planned route to its own spot, locked
//! onto an aim point above the base. While the plan is active, idle fleets
//! (new builds, or survivors of a side engagement) are folded back in.

use std::f32::consts::PI;

use glam::Vec3;
use rand::Rng;

use crate::colony::{index_of, AttackPlan, Colony, CombatTarget, Fleet, TargetRef};
use crate::components::{ColonyId, FleetId, FleetState};
use crate::config::{AttackConfig, EngineConfig};
use crate::error::Result;
use crate::events::EventCategory;
use crate::geometry::TangentFrame;
use crate::orbit::{self, Obstacle};
use crate::pathfinding::plan_path;
use crate::simulation::TickContext;

/// Golden angle in radians.
const GOLDEN_ANGLE: f32 = PI * (3.0 - 2.236_068);

/// Geometry of the region parking spots are drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParkingArea {
    /// Target main base.
    pub base: Vec3,
    /// Frame whose `up` is the base's surface normal.
    pub frame: TangentFrame,
    /// Target planet center.
    pub center: Vec3,
    /// Target orbit shell radius.
    pub shell_radius: f32,
}

impl ParkingArea {
    /// Area above `target`'s main base.
    #[must_use]
    pub fn around(target: &Colony, config: &EngineConfig) -> Self {
        let orbit = &config.orbit;
        Self {
            base: orbit::base_point(&target.planet, orbit),
            frame: TangentFrame::from_up(orbit::base_normal(&target.planet, orbit)),
            center: target.planet.position,
            shell_radius: orbit::shell_radius(&target.planet, orbit),
        }
    }

    /// Point at `polar` / `azimuth` in the base frame, `radius` from the base,
    /// lifted outside the orbit shell and every other safety sphere.
    fn spot(&self, polar: f32, azimuth: f32, radius: f32, obstacles: &[Obstacle]) -> Vec3 {
        let mut spot = self.base + self.frame.spherical_direction(polar, azimuth) * radius;
        if spot.distance(self.center) < self.shell_radius {
            spot = orbit::project_to_shell(spot, self.center, self.shell_radius);
        }
        orbit::push_outside(spot, obstacles)
    }
}

fn jittered_radius(attack: &AttackConfig, rng: &mut impl Rng) -> f32 {
    let jitter = attack.parking_jitter.abs();
    let factor = if jitter > 0.0 {
        1.0 + rng.gen_range(-jitter..=jitter)
    } else {
        1.0
    };
    attack.parking_radius * factor
}

fn is_free(spot: Vec3, taken: &[Vec3], separation: f32) -> bool {
    taken.iter().all(|t| t.distance(spot) >= separation)
}

/// `count` distinct parking spots on a jittered cone shell above the base.
///
/// Spots follow a golden-angle spiral over the cone so they spread evenly.
/// Every returned spot is at least `min_spot_separation` away from the
/// others and from `taken`.
pub fn parking_spots(
    area: &ParkingArea,
    count: usize,
    taken: &[Vec3],
    obstacles: &[Obstacle],
    attack: &AttackConfig,
    rng: &mut impl Rng,
) -> Vec<Vec3> {
    let cone = attack.parking_cone_degrees.to_radians().clamp(0.0, PI);
    let offset = rng.gen_range(0.0..std::f32::consts::TAU);
    let mut occupied: Vec<Vec3> = taken.to_vec();
    let mut spots = Vec::with_capacity(count);

    for i in 0..count {
        // Equal-area spacing over the spherical cap.
        let t = (i as f32 + 0.5) / count as f32;
        let polar = (1.0 - t * (1.0 - cone.cos())).clamp(-1.0, 1.0).acos();
        let azimuth = offset + i as f32 * GOLDEN_ANGLE;
        let radius = jittered_radius(attack, rng);
        let mut spot = area.spot(polar, azimuth, radius, obstacles);
        if !is_free(spot, &occupied, attack.min_spot_separation) {
            spot = free_spot(area, &occupied, obstacles, attack, rng);
        }
        occupied.push(spot);
        spots.push(spot);
    }
    spots
}

/// One more parking spot clear of `taken`.
pub fn free_spot(
    area: &ParkingArea,
    taken: &[Vec3],
    obstacles: &[Obstacle],
    attack: &AttackConfig,
    rng: &mut impl Rng,
) -> Vec3 {
    let cone = attack.parking_cone_degrees.to_radians().clamp(0.0, PI);
    let mut last = area.base;
    for _ in 0..attack.spot_attempts.max(1) {
        let polar = rng.gen_range(0.0..=cone);
        let azimuth = rng.gen_range(0.0..std::f32::consts::TAU);
        let radius = jittered_radius(attack, rng);
        last = area.spot(polar, azimuth, radius, obstacles);
        if is_free(last, taken, attack.min_spot_separation) {
            return last;
        }
    }
    // Crowded cone: step outward until clear.
    let dir = orbit::outward(area.base, last);
    let mut spot = last;
    while !is_free(spot, taken, attack.min_spot_separation) {
        spot += dir * attack.min_spot_separation.max(0.1);
    }
    spot
}

/// Match fleets to spots by repeatedly taking the closest free pair.
///
/// Returns `(fleet, spot)` pairs; extra fleets or spots stay unmatched.
#[must_use]
pub fn assign_spots(fleets: &[(FleetId, Vec3)], spots: &[Vec3]) -> Vec<(FleetId, Vec3)> {
    let mut pairs: Vec<(f32, usize, usize)> = fleets
        .iter()
        .enumerate()
        .flat_map(|(fi, (_, pos))| {
            spots
                .iter()
                .enumerate()
                .map(move |(si, spot)| (pos.distance(*spot), fi, si))
        })
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut fleet_used = vec![false; fleets.len()];
    let mut spot_used = vec![false; spots.len()];
    let mut result = Vec::with_capacity(fleets.len().min(spots.len()));
    for (_, fi, si) in pairs {
        if fleet_used[fi] || spot_used[si] {
            continue;
        }
        fleet_used[fi] = true;
        spot_used[si] = true;
        result.push((fleets[fi].0, spots[si]));
    }
    result
}

/// Pick the colony to attack.
///
/// Enemies are ranked by planet distance. Traits that target the weakest
/// pick the lowest strength among the nearest few.
pub fn select_target(colonies: &[Colony], attacker: &Colony, config: &EngineConfig) -> Result<Option<ColonyId>> {
    let profile = config.trait_profile(attacker.colony_trait)?;
    let mut enemies: Vec<(f32, &Colony)> = colonies
        .iter()
        .filter(|c| c.id != attacker.id && attacker.is_enemy_of(c))
        .map(|c| (c.planet.position.distance(attacker.planet.position), c))
        .collect();
    enemies.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));

    let target = if profile.targets_weakest {
        enemies
            .iter()
            .take(config.attack.candidate_count.max(1))
            .min_by(|a, b| a.1.strength().total_cmp(&b.1.strength()))
    } else {
        enemies.first()
    };
    Ok(target.map(|(_, c)| c.id))
}

/// Whether a fleet can be handed a parking spot right now.
fn available(fleet: &Fleet) -> bool {
    let chasing = matches!(
        fleet.target,
        Some(CombatTarget {
            target: TargetRef::Fleet { .. },
            ..
        })
    );
    match fleet.state {
        FleetState::Idle | FleetState::Patrolling => true,
        FleetState::Moving => !chasing,
        FleetState::Attacking => false,
    }
}

fn send_to_spot(fleet: &mut Fleet, spot: Vec3, aim: CombatTarget, obstacles: &[Obstacle], config: &EngineConfig) {
    let route = plan_path(fleet.position, spot, obstacles, None, &config.orbit);
    fleet.move_along(route, Some(aim));
}

/// Whether `fleet` is already at `spot` or routed to end there.
fn holds_spot(fleet: &Fleet, spot: Vec3, threshold: f32) -> bool {
    fleet.position.distance(spot) <= threshold || fleet.waypoints.back() == Some(&spot)
}

/// Coordination phase of a colony's tick.
pub fn update(colonies: &mut [Colony], colony_idx: usize, ctx: &mut TickContext<'_>) -> Result<()> {
    if colonies[colony_idx].runtime.attack.is_some() {
        continue_attack(colonies, colony_idx, ctx)
    } else {
        maybe_launch(colonies, colony_idx, ctx)
    }
}

fn maybe_launch(colonies: &mut [Colony], colony_idx: usize, ctx: &mut TickContext<'_>) -> Result<()> {
    let config = ctx.config;
    let colony = &colonies[colony_idx];
    if ctx.now < colony.runtime.next_attack_decision_at {
        return Ok(());
    }
    let profile = config.trait_profile(colony.colony_trait)?;
    let has_fleets = colony.colony_fleet.iter().any(available);
    let has_enemies = colonies.iter().any(|c| colony.is_enemy_of(c));

    colonies[colony_idx].runtime.next_attack_decision_at = ctx.now + config.attack.decision_cooldown;
    if profile.attack_chance <= 0.0 || !has_fleets || !has_enemies {
        return Ok(());
    }
    if !ctx.rng.gen_bool(profile.attack_chance.clamp(0.0, 1.0)) {
        return Ok(());
    }

    let Some(target_id) = select_target(colonies, &colonies[colony_idx], config)? else {
        return Ok(());
    };
    let Some(target_idx) = index_of(colonies, target_id) else {
        return Ok(());
    };

    let area = ParkingArea::around(&colonies[target_idx], config);
    let aim = CombatTarget {
        target: TargetRef::Base { colony: target_id },
        position: orbit::aim_point(&colonies[target_idx].planet, &config.orbit, &config.combat),
    };
    let target_name = colonies[target_idx].name.clone();

    let colony = &mut colonies[colony_idx];
    let participants: Vec<(FleetId, Vec3)> = colony
        .colony_fleet
        .iter()
        .filter(|f| available(f))
        .map(|f| (f.id, f.position))
        .collect();
    let spots = parking_spots(
        &area,
        participants.len(),
        &[],
        ctx.obstacles,
        &config.attack,
        &mut *ctx.rng,
    );

    let mut plan = AttackPlan {
        target_colony: target_id,
        ..Default::default()
    };
    for (fleet_id, spot) in assign_spots(&participants, &spots) {
        if let Some(fleet) = colony.fleet_mut(fleet_id) {
            send_to_spot(fleet, spot, aim, ctx.obstacles, config);
            plan.assignments.insert(fleet_id, spot);
        }
    }

    tracing::info!(
        colony = colony.id,
        target = target_id,
        fleets = plan.assignments.len(),
        "Coordinated attack launched"
    );
    colony.runtime.attack = Some(plan);
    let message = format!("Launching attack on {target_name}");
    ctx.recorder.record(colony, EventCategory::Attack, message);
    Ok(())
}

fn abandon(colony: &mut Colony, reason: &str, ctx: &mut TickContext<'_>) {
    let Some(plan) = colony.runtime.attack.take() else {
        return;
    };
    for fleet in &mut colony.colony_fleet {
        if fleet.targets_base_of(plan.target_colony) {
            fleet.go_idle();
        }
    }
    tracing::info!(colony = colony.id, target = plan.target_colony, reason, "Attack ended");
    ctx.recorder
        .record(colony, EventCategory::Attack, format!("Attack ended: {reason}"));
}

fn continue_attack(colonies: &mut [Colony], colony_idx: usize, ctx: &mut TickContext<'_>) -> Result<()> {
    let config = ctx.config;
    let Some(target_id) = colonies[colony_idx]
        .runtime
        .attack
        .as_ref()
        .map(|p| p.target_colony)
    else {
        return Ok(());
    };

    let target_idx = index_of(colonies, target_id);
    let still_enemy = target_idx.is_some_and(|t| colonies[colony_idx].is_enemy_of(&colonies[t]));
    let Some(target_idx) = target_idx.filter(|_| still_enemy) else {
        abandon(&mut colonies[colony_idx], "target secured", ctx);
        return Ok(());
    };

    let area = ParkingArea::around(&colonies[target_idx], config);
    let aim = CombatTarget {
        target: TargetRef::Base { colony: target_id },
        position: orbit::aim_point(&colonies[target_idx].planet, &config.orbit, &config.combat),
    };

    let colony = &mut colonies[colony_idx];
    let alive = colony.fleet_ids();
    if let Some(plan) = colony.runtime.attack.as_mut() {
        plan.assignments.retain(|id, _| alive.contains(id));
    }

    let plan = colony.runtime.attack.as_ref();
    let idle: Vec<FleetId> = colony
        .colony_fleet
        .iter()
        .filter(|f| f.state.is_orbiting())
        .filter(|f| {
            let spot = plan.and_then(|p| p.assignments.get(&f.id));
            !spot.is_some_and(|s| holds_spot(f, *s, config.orbit.arrival_threshold))
        })
        .map(|f| f.id)
        .collect();
    for fleet_id in idle {
        let assigned = colony
            .runtime
            .attack
            .as_ref()
            .and_then(|p| p.assignments.get(&fleet_id).copied());
        let spot = match assigned {
            Some(spot) => spot,
            None => {
                let taken: Vec<Vec3> = colony
                    .runtime
                    .attack
                    .as_ref()
                    .map(|p| p.assignments.values().copied().collect())
                    .unwrap_or_default();
                free_spot(&area, &taken, ctx.obstacles, &config.attack, &mut *ctx.rng)
            }
        };
        if let Some(fleet) = colony.fleet_mut(fleet_id) {
            send_to_spot(fleet, spot, aim, ctx.obstacles, config);
        }
        if let Some(plan) = colony.runtime.attack.as_mut() {
            plan.assignments.insert(fleet_id, spot);
        }
        tracing::debug!(colony = colony.id, fleet = fleet_id, "Fleet joined attack");
    }

    let engaged = colony.colony_fleet.iter().any(|f| f.targets_base_of(target_id));
    let assigned = colony
        .runtime
        .attack
        .as_ref()
        .is_some_and(|p| !p.assignments.is_empty());
    if !engaged && !assigned {
        abandon(colony, "no fleets left", ctx);
    }
    Ok(())
}
