//! Per-fleet state machine.
//!
//! Each tick every fleet of a colony, in list order, first decides on a new
//! order (attack-move on a nearby threat, a fresh patrol loop, or the way
//! home) and then takes one movement step. Decisions only read the rest of
//! the world, so they are computed before the owning colony is borrowed
//! mutably.

use glam::Vec3;

use crate::colony::{Colony, CombatTarget, Fleet, TargetRef};
use crate::components::{ColonyId, FleetId, FleetState};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::geometry::TangentFrame;
use crate::orbit::{self, HomeShell, MovementStep, Obstacle};
use crate::pathfinding::plan_path;
use crate::simulation::TickContext;

/// Nearest enemy fleet found by a scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threat {
    /// Colony owning the enemy fleet.
    pub colony: ColonyId,
    /// Enemy fleet id.
    pub fleet: FleetId,
    /// Enemy position.
    pub position: Vec3,
    /// Distance from the scanning fleet.
    pub distance: f32,
}

/// What a fleet should do this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum FleetOrder {
    /// Keep the current order.
    Continue,
    /// Engage a fleet already in range.
    Engage(CombatTarget),
    /// Fly a route to a firing position, then engage.
    AttackMove {
        /// Route to the firing position.
        route: Vec<Vec3>,
        /// Enemy fleet.
        target: CombatTarget,
    },
    /// Start a closed patrol loop.
    Patrol(Vec<Vec3>),
    /// Fly back into the home sphere of influence.
    ReturnHome(Vec<Vec3>),
}

/// Patrol circle radius for a fleet of `colony`.
pub fn patrol_radius(colony: &Colony, fleet: &Fleet, config: &EngineConfig) -> Result<f32> {
    let stats = config.fleet_type(fleet.kind)?;
    let profile = config.trait_profile(colony.colony_trait)?;
    Ok(stats.patrol_radius * profile.patrol_radius_factor)
}

/// Home shell of a fleet of `colony`.
pub fn home_shell(colony: &Colony, fleet: &Fleet, config: &EngineConfig) -> Result<HomeShell> {
    let radius = patrol_radius(colony, fleet, config)?;
    Ok(HomeShell::new(colony.id, &colony.planet, &config.orbit, radius))
}

/// Nearest living fleet of another owner within `radius` of `position`.
#[must_use]
pub fn scan_for_threat(
    colonies: &[Colony],
    owner: ColonyId,
    position: Vec3,
    radius: f32,
) -> Option<Threat> {
    colonies
        .iter()
        .filter(|c| c.owner != owner)
        .flat_map(|c| c.colony_fleet.iter().map(move |f| (c.id, f)))
        .filter(|(_, f)| f.is_alive())
        .map(|(colony, f)| Threat {
            colony,
            fleet: f.id,
            position: f.position,
            distance: position.distance(f.position),
        })
        .filter(|t| t.distance <= radius)
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Whether a fleet in `state` reacts to a threat at `distance`.
#[must_use]
pub fn reacts_to(
    state: FleetState,
    distance: f32,
    committed: bool,
    config: &EngineConfig,
) -> bool {
    let awareness = &config.awareness;
    match state {
        FleetState::Idle => true,
        FleetState::Patrolling => distance <= awareness.priority_distance,
        FleetState::Moving => {
            distance <= awareness.priority_distance
                || (!committed && distance <= awareness.radius * awareness.moving_ratio)
        }
        FleetState::Attacking => false,
    }
}

/// Closed patrol loop around the fleet's home anchor.
///
/// `points` positions evenly spaced on a circle in the tangent plane at the
/// anchor, each projected onto the home shell and joined by planned legs.
#[must_use]
pub fn patrol_route(
    start: Vec3,
    anchor: Vec3,
    home: &HomeShell,
    radius: f32,
    points: usize,
    obstacles: &[Obstacle],
    config: &EngineConfig,
) -> Vec<Vec3> {
    let frame = TangentFrame::from_up(orbit::outward(home.center, anchor));
    let corners: Vec<Vec3> = (0..points.max(1))
        .map(|i| {
            let angle = std::f32::consts::TAU * i as f32 / points.max(1) as f32;
            let planar = frame.planar_point(anchor, radius * angle.cos(), radius * angle.sin());
            orbit::project_to_shell(planar, home.center, home.radius)
        })
        .collect();

    let exclude = Some(home.colony);
    let mut route = Vec::new();
    let mut from = start;
    for corner in corners.iter().chain(corners.first()) {
        route.extend(plan_path(from, *corner, obstacles, exclude, &config.orbit));
        from = *corner;
    }
    route
}

/// Decide the order of one fleet.
pub fn decide(
    colonies: &[Colony],
    colony_idx: usize,
    fleet_id: FleetId,
    ctx: &TickContext<'_>,
) -> Result<FleetOrder> {
    let Some(colony) = colonies.get(colony_idx) else {
        return Ok(FleetOrder::Continue);
    };
    let Some(fleet) = colony.fleet(fleet_id) else {
        return Ok(FleetOrder::Continue);
    };
    let config = ctx.config;

    if fleet.state == FleetState::Attacking {
        return Ok(FleetOrder::Continue);
    }

    let plan = colony.runtime.attack.as_ref();
    let committed = plan.is_some_and(|p| p.includes(fleet.id));
    let bound = plan.is_some_and(|p| committed && fleet.targets_base_of(p.target_colony));

    if !bound {
        let threat = scan_for_threat(colonies, colony.owner, fleet.position, config.awareness.radius);
        if let Some(threat) = threat {
            // An ongoing chase of the same fleet keeps its route.
            if reacts_to(fleet.state, threat.distance, committed, config)
                && !is_chasing(fleet, &threat)
            {
                return Ok(attack_move(fleet, &threat, ctx));
            }
        }
    }

    let idle_or_patrolling = fleet.state.is_orbiting() && fleet.waypoints.is_empty();
    if !idle_or_patrolling || ctx.now < fleet.next_patrol_at {
        return Ok(FleetOrder::Continue);
    }

    let home = home_shell(colony, fleet, config)?;
    let anchor = orbit::home_anchor(&colony.planet, &config.orbit);
    if !home.contains(fleet.position) {
        let route = plan_path(fleet.position, anchor, ctx.obstacles, None, &config.orbit);
        return Ok(FleetOrder::ReturnHome(route));
    }

    let radius = patrol_radius(colony, fleet, config)?;
    let route = patrol_route(
        fleet.position,
        fleet.home.unwrap_or(anchor),
        &home,
        radius,
        config.patrol.points,
        ctx.obstacles,
        config,
    );
    Ok(FleetOrder::Patrol(route))
}

fn is_chasing(fleet: &Fleet, threat: &Threat) -> bool {
    matches!(
        fleet.target,
        Some(CombatTarget {
            target: TargetRef::Fleet { colony, fleet: enemy },
            ..
        }) if colony == threat.colony && enemy == threat.fleet
    )
}

fn attack_move(fleet: &Fleet, threat: &Threat, ctx: &TickContext<'_>) -> FleetOrder {
    let combat = &ctx.config.combat;
    let target = CombatTarget {
        target: TargetRef::Fleet {
            colony: threat.colony,
            fleet: threat.fleet,
        },
        position: threat.position,
    };
    if threat.distance <= combat.engagement_range
        && orbit::has_line_of_sight(fleet.position, threat.position, ctx.obstacles)
    {
        return FleetOrder::Engage(target);
    }

    let standoff = combat.engagement_range * combat.firing_distance_ratio;
    let firing = threat.position + orbit::outward(threat.position, fleet.position) * standoff;
    let firing = orbit::push_outside(firing, ctx.obstacles);
    let route = plan_path(fleet.position, firing, ctx.obstacles, None, &ctx.config.orbit);
    FleetOrder::AttackMove { route, target }
}

/// Apply an order to a fleet.
pub fn apply(fleet: &mut Fleet, order: FleetOrder, ctx: &TickContext<'_>) {
    match order {
        FleetOrder::Continue => {}
        FleetOrder::Engage(target) => fleet.engage(target, ctx.config.combat.warmup),
        FleetOrder::AttackMove { route, target } => fleet.move_along(route, Some(target)),
        FleetOrder::Patrol(route) => {
            fleet.state = FleetState::Patrolling;
            fleet.target = None;
            fleet.waypoints = route.into();
            fleet.next_patrol_at = ctx.now + ctx.config.patrol.cooldown;
        }
        FleetOrder::ReturnHome(route) => {
            fleet.move_along(route, None);
            fleet.next_patrol_at = ctx.now + ctx.config.patrol.cooldown;
        }
    }
}

/// Decide and move every fleet of one colony.
pub fn update(colonies: &mut [Colony], colony_idx: usize, ctx: &mut TickContext<'_>) -> Result<()> {
    let Some(colony) = colonies.get(colony_idx) else {
        return Ok(());
    };
    for fleet_id in colony.fleet_ids() {
        let order = decide(colonies, colony_idx, fleet_id, ctx)?;

        let colony = &mut colonies[colony_idx];
        let Some(fleet) = colony.fleet(fleet_id) else {
            continue;
        };
        let home = home_shell(colony, fleet, ctx.config)?;
        let Some(fleet) = colony.fleet_mut(fleet_id) else {
            continue;
        };

        if order != FleetOrder::Continue {
            tracing::trace!(fleet = fleet_id, ?order, "Fleet order");
        }
        apply(fleet, order, ctx);
        orbit::step_fleet(
            fleet,
            &MovementStep {
                obstacles: ctx.obstacles,
                home,
                orbit: &ctx.config.orbit,
                warmup: ctx.config.combat.warmup,
                dt: ctx.dt as f32,
            },
        );
    }
    colonies[colony_idx].mark_dirty();
    Ok(())
}
