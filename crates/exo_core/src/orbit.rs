//! Orbit shells and per-tick fleet movement.
//!
//! Every planet has three nested spheres:
//!
//! - the **body** (`scale × base_radius`), which blocks line of sight,
//! - the **safety sphere** (`body × safety_margin`), which fleets never enter,
//! - the **orbit shell** (`safety + fly_altitude`), which idle and patrolling
//!   fleets sit on.
//!
//! Movement advances a fleet along its route and then projects it back onto
//! the allowed region: strictly onto the home shell while it is orbiting near
//! home, or just out of any safety sphere it has entered while in transit.

use glam::Vec3;

use crate::colony::{Colony, Fleet, Planet};
use crate::components::{ColonyId, FleetState};
use crate::config::{CombatConfig, OrbitConfig};
use crate::geometry::{self, normalize_or_axis, safe_normalize};
use crate::pathfinding;

/// A planet as seen by movement, path planning and line of sight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    /// Colony anchored to the planet.
    pub colony: ColonyId,
    /// Planet center.
    pub center: Vec3,
    /// Radius of the solid body.
    pub body_radius: f32,
    /// Radius of the safety sphere.
    pub safety_radius: f32,
}

/// Radius of the solid planet body.
#[must_use]
pub fn body_radius(planet: &Planet, orbit: &OrbitConfig) -> f32 {
    planet.scale * orbit.base_radius
}

/// Radius of the sphere fleets must stay out of.
#[must_use]
pub fn safety_radius(planet: &Planet, orbit: &OrbitConfig) -> f32 {
    body_radius(planet, orbit) * orbit.safety_margin
}

/// Radius of the safe orbit shell.
#[must_use]
pub fn shell_radius(planet: &Planet, orbit: &OrbitConfig) -> f32 {
    safety_radius(planet, orbit) + orbit.fly_altitude
}

/// Outward unit normal at the planet's main base.
#[must_use]
pub fn base_normal(planet: &Planet, orbit: &OrbitConfig) -> Vec3 {
    let rotation = orbit.apply_planet_rotation.then_some(planet.rot);
    geometry::base_direction(planet.planet_main_base, rotation)
}

/// World position of the main base on the planet surface.
#[must_use]
pub fn base_point(planet: &Planet, orbit: &OrbitConfig) -> Vec3 {
    planet.position + base_normal(planet, orbit) * body_radius(planet, orbit)
}

/// Point above the main base that attackers aim at.
#[must_use]
pub fn aim_point(planet: &Planet, orbit: &OrbitConfig, combat: &CombatConfig) -> Vec3 {
    base_point(planet, orbit) + base_normal(planet, orbit) * combat.aim_height
}

/// Point on the orbit shell straight above the main base.
#[must_use]
pub fn home_anchor(planet: &Planet, orbit: &OrbitConfig) -> Vec3 {
    planet.position + base_normal(planet, orbit) * shell_radius(planet, orbit)
}

/// Obstacles for every colony's planet, in colony order.
#[must_use]
pub fn world_obstacles(colonies: &[Colony], orbit: &OrbitConfig) -> Vec<Obstacle> {
    colonies
        .iter()
        .map(|c| Obstacle {
            colony: c.id,
            center: c.planet.position,
            body_radius: body_radius(&c.planet, orbit),
            safety_radius: safety_radius(&c.planet, orbit),
        })
        .collect()
}

/// Place `position` exactly on the sphere of `radius` around `center`.
#[must_use]
pub fn project_to_shell(position: Vec3, center: Vec3, radius: f32) -> Vec3 {
    center + normalize_or_axis(position - center) * radius
}

/// Push `position` out of every safety sphere it has entered.
#[must_use]
pub fn push_outside(position: Vec3, obstacles: &[Obstacle]) -> Vec3 {
    let mut position = position;
    for obstacle in obstacles {
        let offset = position - obstacle.center;
        if offset.length() < obstacle.safety_radius {
            position = obstacle.center + normalize_or_axis(offset) * obstacle.safety_radius;
        }
    }
    position
}

/// Whether nothing solid lies between `from` and `to`.
#[must_use]
pub fn has_line_of_sight(from: Vec3, to: Vec3, obstacles: &[Obstacle]) -> bool {
    !obstacles.iter().any(|o| {
        // Endpoints sitting inside a body (e.g. an aim point buried by a
        // large scale) never block their own shot.
        from.distance(o.center) > o.body_radius
            && to.distance(o.center) > o.body_radius
            && geometry::segment_intersects_sphere(from, to, o.center, o.body_radius)
    })
}

/// The shell a fleet returns to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomeShell {
    /// Colony whose planet is home.
    pub colony: ColonyId,
    /// Planet center.
    pub center: Vec3,
    /// Orbit shell radius.
    pub radius: f32,
    /// Distance from `center` within which orbiting fleets stay on the shell.
    pub influence: f32,
}

impl HomeShell {
    /// Home shell of `planet` for a fleet patrolling at `patrol_radius`.
    #[must_use]
    pub fn new(colony: ColonyId, planet: &Planet, orbit: &OrbitConfig, patrol_radius: f32) -> Self {
        let radius = shell_radius(planet, orbit);
        Self {
            colony,
            center: planet.position,
            radius,
            influence: radius + patrol_radius + orbit.home_margin,
        }
    }

    /// Whether `position` is inside the sphere of influence.
    #[must_use]
    pub fn contains(&self, position: Vec3) -> bool {
        position.distance(self.center) <= self.influence
    }
}

/// Inputs of one movement step.
#[derive(Debug, Clone, Copy)]
pub struct MovementStep<'a> {
    /// Every planet.
    pub obstacles: &'a [Obstacle],
    /// The fleet's home.
    pub home: HomeShell,
    /// Orbit parameters.
    pub orbit: &'a OrbitConfig,
    /// Warmup armed when a route ends at a target.
    pub warmup: f32,
    /// Step length in seconds.
    pub dt: f32,
}

/// Advance `fleet` one step along its route and constrain it to the shell.
pub fn step_fleet(fleet: &mut Fleet, step: &MovementStep<'_>) {
    if fleet.state == FleetState::Attacking {
        fleet.velocity = Vec3::ZERO;
        return;
    }

    consume_reached(fleet, step);

    match fleet.waypoints.front().copied() {
        Some(waypoint) if step.dt > 0.0 => {
            let exclude = fleet.state.is_orbiting().then_some(step.home.colony);
            let direction =
                pathfinding::steer(fleet.position, waypoint, step.obstacles, exclude, step.orbit);
            let remaining = fleet.position.distance(waypoint);
            let speed = fleet.unit_speed.min(remaining / step.dt);
            fleet.velocity = direction * speed;
            fleet.position += fleet.velocity * step.dt;
        }
        _ => fleet.velocity = Vec3::ZERO,
    }

    fleet.position = constrain(fleet, step);
    consume_reached(fleet, step);
}

fn constrain(fleet: &Fleet, step: &MovementStep<'_>) -> Vec3 {
    if fleet.state.is_orbiting() && step.home.contains(fleet.position) {
        project_to_shell(fleet.position, step.home.center, step.home.radius)
    } else {
        push_outside(fleet.position, step.obstacles)
    }
}

/// Handle every waypoint within the arrival threshold.
///
/// Patrolling fleets rotate reached points to the back of the loop; moving
/// fleets drop them and, on the last one, engage their target or go idle.
fn consume_reached(fleet: &mut Fleet, step: &MovementStep<'_>) {
    let threshold = step.orbit.arrival_threshold;
    // A patrol loop whose points all lie within the threshold must not spin.
    let mut budget = fleet.waypoints.len();
    while budget > 0 {
        let Some(next) = fleet.waypoints.front().copied() else {
            break;
        };
        if fleet.position.distance(next) > threshold {
            break;
        }
        budget -= 1;
        match fleet.state {
            FleetState::Patrolling => fleet.waypoints.rotate_left(1),
            FleetState::Moving => {
                fleet.waypoints.pop_front();
                if fleet.waypoints.is_empty() {
                    match fleet.target {
                        Some(target) => fleet.engage(target, step.warmup),
                        None => fleet.go_idle(),
                    }
                }
            }
            FleetState::Idle | FleetState::Attacking => {
                fleet.waypoints.pop_front();
            }
        }
    }
    if fleet.state == FleetState::Patrolling && fleet.waypoints.is_empty() {
        fleet.state = FleetState::Idle;
    }
}

/// Unit vector pointing from `center` toward `position`.
#[must_use]
pub fn outward(center: Vec3, position: Vec3) -> Vec3 {
    safe_normalize(position - center, geometry::FALLBACK_AXIS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colony::{CombatTarget, TargetRef};
    use crate::components::FleetType;
    use crate::config::EngineConfig;

    fn fleet_at(position: Vec3) -> Fleet {
        let config = EngineConfig::default();
        Fleet::from_type(1, config.fleet_type(FleetType::Fighter).unwrap(), 5, position)
    }

    fn home(orbit: &OrbitConfig) -> HomeShell {
        HomeShell::new(1, &Planet::default(), orbit, 8.0)
    }

    fn obstacles(orbit: &OrbitConfig) -> Vec<Obstacle> {
        let planet = Planet::default();
        vec![Obstacle {
            colony: 1,
            center: planet.position,
            body_radius: body_radius(&planet, orbit),
            safety_radius: safety_radius(&planet, orbit),
        }]
    }

    #[test]
    fn test_radii_nest() {
        let orbit = OrbitConfig::default();
        let planet = Planet {
            scale: 1.3,
            ..Default::default()
        };
        let body = body_radius(&planet, &orbit);
        let safety = safety_radius(&planet, &orbit);
        let shell = shell_radius(&planet, &orbit);
        assert!(body < safety && safety < shell);
        assert!((shell - (1.3 * 10.0 * 1.2 + 3.0)).abs() < 1e-4);
    }

    #[test]
    fn test_base_point_on_surface() {
        let orbit = OrbitConfig::default();
        let planet = Planet {
            position: Vec3::new(5.0, 0.0, 0.0),
            planet_main_base: glam::Vec2::new(0.3, 25.0),
            ..Default::default()
        };
        let d = base_point(&planet, &orbit).distance(planet.position);
        assert!((d - body_radius(&planet, &orbit)).abs() < 1e-3);
    }

    #[test]
    fn test_rotation_flag_changes_mapping() {
        let mut orbit = OrbitConfig::default();
        let planet = Planet {
            rot: Vec3::new(0.0, 1.0, 0.0),
            planet_main_base: glam::Vec2::new(0.0, 0.0),
            ..Default::default()
        };
        let plain = base_point(&planet, &orbit);
        orbit.apply_planet_rotation = true;
        let rotated = base_point(&planet, &orbit);
        assert!(plain.distance(rotated) > 1.0);
    }

    #[test]
    fn test_idle_fleet_snaps_to_shell() {
        let orbit = OrbitConfig::default();
        let obstacles = obstacles(&orbit);
        let mut fleet = fleet_at(Vec3::new(0.0, 5.0, 0.0));
        let step = MovementStep {
            obstacles: &obstacles,
            home: home(&orbit),
            orbit: &orbit,
            warmup: 2.0,
            dt: 0.5,
        };
        step_fleet(&mut fleet, &step);
        let d = fleet.position.length();
        assert!((d - step.home.radius).abs() < 1e-3);
    }

    #[test]
    fn test_moving_fleet_only_pushed_out() {
        let orbit = OrbitConfig::default();
        let obstacles = obstacles(&orbit);
        let mut fleet = fleet_at(Vec3::new(100.0, 0.0, 0.0));
        fleet.move_along(vec![Vec3::new(200.0, 0.0, 0.0)], None);
        let step = MovementStep {
            obstacles: &obstacles,
            home: home(&orbit),
            orbit: &orbit,
            warmup: 2.0,
            dt: 0.5,
        };
        step_fleet(&mut fleet, &step);
        assert!((fleet.position.x - 107.0).abs() < 1e-3);
        assert_eq!(fleet.state, FleetState::Moving);
    }

    #[test]
    fn test_route_end_engages_target() {
        let orbit = OrbitConfig::default();
        let obstacles = obstacles(&orbit);
        let mut fleet = fleet_at(Vec3::new(100.0, 0.0, 0.0));
        let target = CombatTarget {
            target: TargetRef::Base { colony: 2 },
            position: Vec3::new(120.0, 0.0, 0.0),
        };
        fleet.move_along(vec![Vec3::new(103.0, 0.0, 0.0)], Some(target));
        let step = MovementStep {
            obstacles: &obstacles,
            home: home(&orbit),
            orbit: &orbit,
            warmup: 2.0,
            dt: 0.5,
        };
        step_fleet(&mut fleet, &step);
        assert_eq!(fleet.state, FleetState::Attacking);
        assert_eq!(fleet.warmup, 2.0);
        assert_eq!(fleet.target, Some(target));
    }

    #[test]
    fn test_route_end_without_target_goes_idle() {
        let orbit = OrbitConfig::default();
        let obstacles = obstacles(&orbit);
        let mut fleet = fleet_at(Vec3::new(100.0, 0.0, 0.0));
        fleet.move_along(vec![Vec3::new(101.0, 0.0, 0.0)], None);
        let step = MovementStep {
            obstacles: &obstacles,
            home: home(&orbit),
            orbit: &orbit,
            warmup: 2.0,
            dt: 0.5,
        };
        step_fleet(&mut fleet, &step);
        assert_eq!(fleet.state, FleetState::Idle);
        assert!(fleet.waypoints.is_empty());
    }

    #[test]
    fn test_patrol_cycles_waypoints() {
        let orbit = OrbitConfig::default();
        let obstacles = obstacles(&orbit);
        let shell = home(&orbit).radius;
        let a = Vec3::new(shell, 0.0, 0.0);
        let b = Vec3::new(0.0, 0.0, shell);
        let mut fleet = fleet_at(a);
        fleet.state = FleetState::Patrolling;
        fleet.waypoints = vec![a, b].into();
        let step = MovementStep {
            obstacles: &obstacles,
            home: home(&orbit),
            orbit: &orbit,
            warmup: 2.0,
            dt: 0.1,
        };
        step_fleet(&mut fleet, &step);
        assert_eq!(fleet.waypoints.len(), 2);
        assert_eq!(fleet.waypoints.back().copied(), Some(a));
        assert_eq!(fleet.state, FleetState::Patrolling);
    }

    #[test]
    fn test_line_of_sight_blocked_by_body() {
        let orbit = OrbitConfig::default();
        let obstacles = obstacles(&orbit);
        assert!(!has_line_of_sight(
            Vec3::new(-30.0, 0.0, 0.0),
            Vec3::new(30.0, 0.0, 0.0),
            &obstacles
        ));
        assert!(has_line_of_sight(
            Vec3::new(-30.0, 20.0, 0.0),
            Vec3::new(30.0, 20.0, 0.0),
            &obstacles
        ));
    }

    #[test]
    fn test_push_outside_leaves_free_points() {
        let orbit = OrbitConfig::default();
        let obstacles = obstacles(&orbit);
        let free = Vec3::new(50.0, 0.0, 0.0);
        assert_eq!(push_outside(free, &obstacles), free);
        let pushed = push_outside(Vec3::new(1.0, 0.0, 0.0), &obstacles);
        assert!((pushed.length() - 12.0).abs() < 1e-3);
    }
}
