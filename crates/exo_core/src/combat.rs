//! Combat resolution: fleet engagements, base damage, conquest and base
//! defense.
//!
//! Combat mutates other colonies directly, inside the attacker's turn, so a
//! defender forced into `Attacking` is already engaged when its own colony
//! is processed later in the same tick.

use glam::Vec3;

use crate::colony::{index_of, pair_mut, Colony, CombatTarget, TargetRef};
use crate::components::{ColonyId, FleetId, FleetState};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::events::EventCategory;
use crate::orbit;
use crate::simulation::TickContext;

/// Current position of `target` if it is still a living enemy of `owner`.
///
/// Returns the index of the colony holding the target and the point to
/// shoot at: the fleet position, or the aim point above a base.
#[must_use]
pub fn locate(
    colonies: &[Colony],
    owner: ColonyId,
    target: &TargetRef,
    config: &EngineConfig,
) -> Option<(usize, Vec3)> {
    let idx = index_of(colonies, target.colony())?;
    let colony = &colonies[idx];
    if colony.owner == owner {
        return None;
    }
    match *target {
        TargetRef::Fleet { fleet, .. } => {
            let fleet = colony.fleet(fleet).filter(|f| f.is_alive())?;
            Some((idx, fleet.position))
        }
        TargetRef::Base { .. } => Some((
            idx,
            orbit::aim_point(&colony.planet, &config.orbit, &config.combat),
        )),
    }
}

/// Whether `from` can fire at `to`.
#[must_use]
pub fn can_engage(from: Vec3, to: Vec3, range: f32, obstacles: &[orbit::Obstacle]) -> bool {
    from.distance(to) <= range && orbit::has_line_of_sight(from, to, obstacles)
}

/// Hand `victim` to `victor`'s owner.
///
/// The victim keeps its level and structures; its hp is restored, its fleets
/// and any attack it was running are dropped.
pub fn conquer(victor: &mut Colony, victim: &mut Colony, ctx: &mut TickContext<'_>) {
    tracing::info!(
        victor = victor.id,
        victim = victim.id,
        owner = victor.owner,
        "Base conquered"
    );
    victim.owner = victor.owner;
    victim.color = victor.color.clone();
    victim.hp = victim.max_hp;
    victim.colony_fleet.clear();
    victim.runtime.attack = None;

    let victim_msg = format!("Conquered by {}", victor.name);
    let victor_msg = format!("Conquered {}", victim.name);
    ctx.recorder
        .record(victim, EventCategory::Conquest, victim_msg);
    ctx.recorder
        .record(victor, EventCategory::Conquest, victor_msg);
}

/// Resolve every engaged fleet of one colony.
pub fn resolve_fleets(colonies: &mut [Colony], colony_idx: usize, ctx: &mut TickContext<'_>) -> Result<()> {
    let Some(colony) = colonies.get(colony_idx) else {
        return Ok(());
    };
    for fleet_id in colony.fleet_ids() {
        resolve_fleet(colonies, colony_idx, fleet_id, ctx);
    }
    Ok(())
}

fn resolve_fleet(colonies: &mut [Colony], colony_idx: usize, fleet_id: FleetId, ctx: &mut TickContext<'_>) {
    let config = ctx.config;
    let owner = colonies[colony_idx].owner;
    let Some(fleet) = colonies[colony_idx].fleet(fleet_id) else {
        return;
    };
    if fleet.state != FleetState::Attacking {
        return;
    }
    let position = fleet.position;
    let Some(target) = fleet.target else {
        if let Some(fleet) = colonies[colony_idx].fleet_mut(fleet_id) {
            fleet.go_idle();
        }
        return;
    };

    let located = locate(colonies, owner, &target.target, config).filter(|(_, aim)| {
        can_engage(position, *aim, config.combat.engagement_range, ctx.obstacles)
    });
    let Some((target_idx, aim)) = located else {
        tracing::trace!(fleet = fleet_id, ?target, "Target lost");
        if let Some(fleet) = colonies[colony_idx].fleet_mut(fleet_id) {
            fleet.go_idle();
        }
        return;
    };
    let Some((attacker, defender)) = pair_mut(colonies, colony_idx, target_idx) else {
        return;
    };

    // First contact pulls an unengaged fleet into the fight.
    if let TargetRef::Fleet { fleet: enemy_id, .. } = target.target {
        if let Some(enemy) = defender.fleet_mut(enemy_id) {
            if enemy.state != FleetState::Attacking {
                let back = CombatTarget {
                    target: TargetRef::Fleet {
                        colony: attacker.id,
                        fleet: fleet_id,
                    },
                    position,
                };
                enemy.engage(back, config.combat.warmup);
                defender.mark_dirty();
            }
        }
    }

    let Some(fleet) = attacker.fleet_mut(fleet_id) else {
        return;
    };
    if let Some(t) = fleet.target.as_mut() {
        t.position = aim;
    }
    if fleet.warmup > 0.0 {
        fleet.warmup = (fleet.warmup - ctx.dt as f32).max(0.0);
        return;
    }
    let damage = fleet.dps() * ctx.dt as f32;
    let kind = fleet.kind;

    match target.target {
        TargetRef::Fleet { fleet: enemy_id, .. } => {
            let Some(enemy) = defender.fleet_mut(enemy_id) else {
                return;
            };
            enemy.hp_pool -= damage;
            enemy.refresh_count();
            let (alive, enemy_kind) = (enemy.is_alive(), enemy.kind);
            defender.mark_dirty();
            if alive {
                return;
            }
            defender.remove_fleet(enemy_id);
            if let Some(fleet) = attacker.fleet_mut(fleet_id) {
                fleet.go_idle();
            }
            tracing::debug!(
                attacker = attacker.id,
                defender = defender.id,
                fleet = enemy_id,
                "Fleet destroyed"
            );
            let lost = format!("Lost {enemy_kind} fleet to {}", attacker.name);
            let won = format!("{kind} fleet destroyed {enemy_kind} fleet of {}", defender.name);
            ctx.recorder.record(defender, EventCategory::Combat, lost);
            ctx.recorder.record(attacker, EventCategory::Combat, won);
        }
        TargetRef::Base { .. } => {
            defender.hp -= damage;
            defender.mark_dirty();
            if defender.hp <= 0.0 {
                conquer(attacker, defender, ctx);
                if let Some(fleet) = attacker.fleet_mut(fleet_id) {
                    fleet.go_idle();
                }
            }
        }
    }
    attacker.mark_dirty();
}

/// Fire a colony's base defenses at the nearest engaged enemy fleet.
pub fn defend_base(colonies: &mut [Colony], colony_idx: usize, ctx: &mut TickContext<'_>) -> Result<()> {
    let config = ctx.config;
    let colony = &colonies[colony_idx];
    let dps = config.level(colony.colony_level)?.defense_dps;
    let origin = orbit::aim_point(&colony.planet, &config.orbit, &config.combat);

    let nearest = colonies
        .iter()
        .enumerate()
        .filter(|(_, c)| colony.is_enemy_of(c))
        .flat_map(|(i, c)| c.colony_fleet.iter().map(move |f| (i, f)))
        .filter(|(_, f)| f.state == FleetState::Attacking && f.is_alive())
        .map(|(i, f)| (i, f.id, f.position.distance(origin), f.position))
        .filter(|(_, _, d, p)| {
            *d <= config.combat.defense_range && orbit::has_line_of_sight(origin, *p, ctx.obstacles)
        })
        .min_by(|a, b| a.2.total_cmp(&b.2));
    let Some((enemy_idx, enemy_id, _, _)) = nearest else {
        return Ok(());
    };
    let Some((defender, enemy_colony)) = pair_mut(colonies, colony_idx, enemy_idx) else {
        return Ok(());
    };
    let Some(enemy) = enemy_colony.fleet_mut(enemy_id) else {
        return Ok(());
    };

    enemy.hp_pool -= dps * ctx.dt as f32;
    enemy.refresh_count();
    let (alive, kind) = (enemy.is_alive(), enemy.kind);
    enemy_colony.mark_dirty();
    if alive {
        return Ok(());
    }
    enemy_colony.remove_fleet(enemy_id);
    tracing::debug!(defender = defender.id, fleet = enemy_id, "Base defenses destroyed fleet");
    let won = format!("Base defenses destroyed {kind} fleet of {}", enemy_colony.name);
    let lost = format!("Lost {kind} fleet to base defenses of {}", defender.name);
    ctx.recorder.record(defender, EventCategory::Combat, won);
    ctx.recorder.record(enemy_colony, EventCategory::Combat, lost);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colony::Fleet;
    use crate::components::FleetType;
    use crate::events;
    use crate::simulation::TestParts;

    fn colony_at(id: ColonyId, position: Vec3) -> Colony {
        let mut colony = Colony::named(id, &format!("Colony {id}"));
        colony.planet.position = position;
        colony
    }

    fn fleet(id: FleetId, kind: FleetType, position: Vec3, config: &EngineConfig) -> Fleet {
        Fleet::from_type(id, config.fleet_type(kind).unwrap(), 5, position)
    }

    fn engaged(mut f: Fleet, target: TargetRef, position: Vec3) -> Fleet {
        f.engage(CombatTarget { target, position }, 0.0);
        f
    }

    #[test]
    fn test_first_contact_forces_target_to_attack() {
        let mut parts = TestParts::new();
        let mut a = colony_at(1, Vec3::new(-100.0, 0.0, 0.0));
        let mut b = colony_at(2, Vec3::new(100.0, 0.0, 0.0));
        let enemy_pos = Vec3::new(10.0, 0.0, 0.0);
        a.colony_fleet.push(engaged(
            fleet(1, FleetType::Fighter, Vec3::ZERO, &parts.config),
            TargetRef::Fleet { colony: 2, fleet: 2 },
            enemy_pos,
        ));
        b.colony_fleet
            .push(fleet(2, FleetType::Fighter, enemy_pos, &parts.config));
        let mut colonies = vec![a, b];
        parts.obstacles = orbit::world_obstacles(&colonies, &parts.config.orbit);

        resolve_fleets(&mut colonies, 0, &mut parts.ctx()).unwrap();

        let enemy = colonies[1].fleet(2).unwrap();
        assert_eq!(enemy.state, FleetState::Attacking);
        assert_eq!(enemy.warmup, parts.config.combat.warmup);
        assert_eq!(
            enemy.target.unwrap().target,
            TargetRef::Fleet { colony: 1, fleet: 1 }
        );
        // Attacker had no warmup left, so damage already landed.
        assert!(enemy.hp_pool < 300.0);
    }

    #[test]
    fn test_warmup_blocks_damage() {
        let mut parts = TestParts::new();
        let mut a = colony_at(1, Vec3::new(-100.0, 0.0, 0.0));
        let mut b = colony_at(2, Vec3::new(100.0, 0.0, 0.0));
        let mut attacker = fleet(1, FleetType::Fighter, Vec3::ZERO, &parts.config);
        attacker.engage(
            CombatTarget {
                target: TargetRef::Fleet { colony: 2, fleet: 2 },
                position: Vec3::X,
            },
            1.0,
        );
        a.colony_fleet.push(attacker);
        b.colony_fleet
            .push(fleet(2, FleetType::Fighter, Vec3::new(5.0, 0.0, 0.0), &parts.config));
        let mut colonies = vec![a, b];

        resolve_fleets(&mut colonies, 0, &mut parts.ctx()).unwrap();
        assert_eq!(colonies[1].fleet(2).unwrap().hp_pool, 300.0);
        assert!((colonies[0].fleet(1).unwrap().warmup - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_out_of_range_reverts_to_idle() {
        let mut parts = TestParts::new();
        let mut a = colony_at(1, Vec3::new(-100.0, 0.0, 0.0));
        let mut b = colony_at(2, Vec3::new(100.0, 0.0, 0.0));
        a.colony_fleet.push(engaged(
            fleet(1, FleetType::Fighter, Vec3::ZERO, &parts.config),
            TargetRef::Fleet { colony: 2, fleet: 2 },
            Vec3::ZERO,
        ));
        b.colony_fleet
            .push(fleet(2, FleetType::Fighter, Vec3::new(45.0, 0.0, 0.0), &parts.config));
        let mut colonies = vec![a, b];

        resolve_fleets(&mut colonies, 0, &mut parts.ctx()).unwrap();
        let own = colonies[0].fleet(1).unwrap();
        assert_eq!(own.state, FleetState::Idle);
        assert!(own.target.is_none());
    }

    #[test]
    fn test_planet_blocks_line_of_sight() {
        let mut parts = TestParts::new();
        let mut a = colony_at(1, Vec3::ZERO);
        let b = colony_at(2, Vec3::new(300.0, 0.0, 0.0));
        a.colony_fleet.push(engaged(
            fleet(1, FleetType::Fighter, Vec3::new(-14.0, 0.0, 0.0), &parts.config),
            TargetRef::Fleet { colony: 2, fleet: 2 },
            Vec3::ZERO,
        ));
        let mut b = b;
        b.colony_fleet
            .push(fleet(2, FleetType::Fighter, Vec3::new(14.0, 0.0, 0.0), &parts.config));
        let mut colonies = vec![a, b];
        parts.obstacles = orbit::world_obstacles(&colonies, &parts.config.orbit);

        resolve_fleets(&mut colonies, 0, &mut parts.ctx()).unwrap();
        assert_eq!(colonies[0].fleet(1).unwrap().state, FleetState::Idle);
        assert_eq!(colonies[1].fleet(2).unwrap().hp_pool, 300.0);
    }

    #[test]
    fn test_destroyed_fleet_removed_and_attacker_idles() {
        let mut parts = TestParts::new();
        let mut a = colony_at(1, Vec3::new(-100.0, 0.0, 0.0));
        let mut b = colony_at(2, Vec3::new(100.0, 0.0, 0.0));
        a.colony_fleet.push(engaged(
            fleet(1, FleetType::Bomber, Vec3::ZERO, &parts.config),
            TargetRef::Fleet { colony: 2, fleet: 2 },
            Vec3::X,
        ));
        let mut weak = fleet(2, FleetType::Fighter, Vec3::new(5.0, 0.0, 0.0), &parts.config);
        weak.hp_pool = 1.0;
        weak.refresh_count();
        b.colony_fleet.push(weak);
        let mut colonies = vec![a, b];

        resolve_fleets(&mut colonies, 0, &mut parts.ctx()).unwrap();
        assert!(colonies[1].colony_fleet.is_empty());
        assert_eq!(colonies[0].fleet(1).unwrap().state, FleetState::Idle);
        assert_eq!(events::drain(&mut colonies[0]).len(), 1);
        assert_eq!(events::drain(&mut colonies[1]).len(), 1);
    }

    #[test]
    fn test_base_conquest_in_same_step() {
        let mut parts = TestParts::new();
        let mut a = colony_at(1, Vec3::new(-200.0, 0.0, 0.0));
        a.color = "#ff0000".into();
        let mut b = colony_at(2, Vec3::ZERO);
        b.hp = 1.0;
        b.max_hp = 1000.0;
        let aim = orbit::aim_point(&b.planet, &parts.config.orbit, &parts.config.combat);
        b.colony_fleet
            .push(fleet(9, FleetType::Fighter, Vec3::new(-15.0, 0.0, 0.0), &parts.config));
        a.colony_fleet.push(engaged(
            fleet(1, FleetType::Bomber, aim + Vec3::new(8.0, 4.0, 0.0), &parts.config),
            TargetRef::Base { colony: 2 },
            aim,
        ));
        let mut colonies = vec![a, b];
        parts.obstacles = orbit::world_obstacles(&colonies, &parts.config.orbit);

        resolve_fleets(&mut colonies, 0, &mut parts.ctx()).unwrap();

        let victim = &colonies[1];
        assert_eq!(victim.owner, 1);
        assert_eq!(victim.color, "#ff0000");
        assert_eq!(victim.hp, victim.max_hp);
        assert!(victim.colony_fleet.is_empty());
        assert_eq!(colonies[0].fleet(1).unwrap().state, FleetState::Idle);
        let events = events::drain(&mut colonies[1]);
        assert_eq!(events[0].category, EventCategory::Conquest);
    }

    #[test]
    fn test_friendly_base_is_not_a_target() {
        let parts = TestParts::new();
        let mut a = colony_at(1, Vec3::ZERO);
        let mut b = colony_at(2, Vec3::new(50.0, 0.0, 0.0));
        b.owner = 1;
        a.owner = 1;
        let colonies = vec![a, b];
        assert!(locate(&colonies, 1, &TargetRef::Base { colony: 2 }, &parts.config).is_none());
        assert!(locate(&colonies, 7, &TargetRef::Base { colony: 2 }, &parts.config).is_some());
        assert!(locate(&colonies, 7, &TargetRef::Base { colony: 99 }, &parts.config).is_none());
    }

    #[test]
    fn test_base_defense_hits_nearest_attacker() {
        let mut parts = TestParts::new();
        let mut defender = colony_at(1, Vec3::ZERO);
        let aim = orbit::aim_point(&defender.planet, &parts.config.orbit, &parts.config.combat);
        defender.colony_fleet.push(fleet(5, FleetType::Fighter, aim, &parts.config));
        let mut raider = colony_at(2, Vec3::new(300.0, 0.0, 0.0));
        let near = aim + Vec3::new(10.0, 0.0, 0.0);
        let far = aim + Vec3::new(20.0, 0.0, 0.0);
        let target = TargetRef::Base { colony: 1 };
        raider
            .colony_fleet
            .push(engaged(fleet(1, FleetType::Fighter, far, &parts.config), target, aim));
        raider
            .colony_fleet
            .push(engaged(fleet(2, FleetType::Fighter, near, &parts.config), target, aim));
        // Not attacking: ignored even though closest.
        raider
            .colony_fleet
            .push(fleet(3, FleetType::Fighter, aim + Vec3::X, &parts.config));
        let mut colonies = vec![defender, raider];
        parts.obstacles = orbit::world_obstacles(&colonies, &parts.config.orbit);

        defend_base(&mut colonies, 0, &mut parts.ctx()).unwrap();
        let raider = &colonies[1];
        assert_eq!(raider.fleet(1).unwrap().hp_pool, 300.0);
        assert!(raider.fleet(2).unwrap().hp_pool < 300.0);
        assert_eq!(raider.fleet(3).unwrap().hp_pool, 300.0);
    }

    #[test]
    fn test_base_defense_destroys_weak_attacker() {
        let mut parts = TestParts::new();
        let defender = colony_at(1, Vec3::ZERO);
        let aim = orbit::aim_point(&defender.planet, &parts.config.orbit, &parts.config.combat);
        let mut raider = colony_at(2, Vec3::new(300.0, 0.0, 0.0));
        let mut weak = engaged(
            fleet(1, FleetType::Fighter, aim + Vec3::new(5.0, 0.0, 0.0), &parts.config),
            TargetRef::Base { colony: 1 },
            aim,
        );
        weak.hp_pool = 0.5;
        weak.refresh_count();
        raider.colony_fleet.push(weak);
        let mut colonies = vec![defender, raider];
        parts.obstacles = orbit::world_obstacles(&colonies, &parts.config.orbit);

        defend_base(&mut colonies, 0, &mut parts.ctx()).unwrap();
        assert!(colonies[1].colony_fleet.is_empty());
        let won = events::drain(&mut colonies[0]);
        let lost = events::drain(&mut colonies[1]);
        assert_eq!(won.len(), 1);
        assert!(won[0].message.starts_with("Base defenses destroyed"));
        assert_eq!(lost[0].category, EventCategory::Combat);
    }

    #[test]
    fn test_duel_ends_with_exactly_one_survivor() {
        let mut parts = TestParts::new();
        let mut a = colony_at(1, Vec3::new(-200.0, 0.0, 0.0));
        let mut b = colony_at(2, Vec3::new(200.0, 0.0, 0.0));
        a.colony_fleet.push(engaged(
            fleet(1, FleetType::Fighter, Vec3::ZERO, &parts.config),
            TargetRef::Fleet { colony: 2, fleet: 2 },
            Vec3::X,
        ));
        b.colony_fleet
            .push(fleet(2, FleetType::Fighter, Vec3::new(20.0, 0.0, 0.0), &parts.config));
        let mut colonies = vec![a, b];
        parts.obstacles = orbit::world_obstacles(&colonies, &parts.config.orbit);

        for _ in 0..500 {
            resolve_fleets(&mut colonies, 0, &mut parts.ctx()).unwrap();
            resolve_fleets(&mut colonies, 1, &mut parts.ctx()).unwrap();
        }
        let survivors = colonies[0].colony_fleet.len() + colonies[1].colony_fleet.len();
        assert_eq!(survivors, 1);
    }
}
