//! Planet avoidance.
//!
//! Two cooperating mechanisms keep fleets out of planets:
//!
//! - [`plan_path`] builds a route for a new long-range order by splitting the
//!   segment at detour points on the horizon of each obstructing planet,
//!   recursing to a fixed depth.
//! - [`steer`] deflects the per-tick heading when the straight line to the
//!   next waypoint still clips a safety sphere.
//!
//! Obstacles that contain either endpoint are ignored; the movement step
//! pushes fleets out of safety spheres separately.

use glam::Vec3;

use crate::components::ColonyId;
use crate::config::OrbitConfig;
use crate::geometry::{horizon_point, normalize_or_axis, segment_intersects_sphere};
use crate::orbit::Obstacle;

/// Nearest-to-`start` obstacle whose safety sphere the segment passes through.
fn first_obstruction<'a>(
    start: Vec3,
    end: Vec3,
    obstacles: &'a [Obstacle],
    exclude: Option<ColonyId>,
) -> Option<&'a Obstacle> {
    obstacles
        .iter()
        .filter(|o| Some(o.colony) != exclude)
        .filter(|o| {
            start.distance(o.center) > o.safety_radius && end.distance(o.center) > o.safety_radius
        })
        .filter(|o| segment_intersects_sphere(start, end, o.center, o.safety_radius))
        .min_by(|a, b| {
            let da = start.distance(a.center) - a.safety_radius;
            let db = start.distance(b.center) - b.safety_radius;
            da.total_cmp(&db)
        })
}

/// Route from `start` to `end` around obstructing planets.
///
/// The returned waypoints exclude `start` and always end with `end`. A
/// segment that clips a planet yields at least one detour point before
/// `end`, as long as the depth limit is not zero.
#[must_use]
pub fn plan_path(
    start: Vec3,
    end: Vec3,
    obstacles: &[Obstacle],
    exclude: Option<ColonyId>,
    orbit: &OrbitConfig,
) -> Vec<Vec3> {
    let mut route = Vec::new();
    split_segment(start, end, obstacles, exclude, orbit, orbit.path_depth, &mut route);
    route
}

fn split_segment(
    start: Vec3,
    end: Vec3,
    obstacles: &[Obstacle],
    exclude: Option<ColonyId>,
    orbit: &OrbitConfig,
    depth: u32,
    route: &mut Vec<Vec3>,
) {
    let obstruction = if depth == 0 {
        None
    } else {
        first_obstruction(start, end, obstacles, exclude)
    };
    match obstruction {
        None => route.push(end),
        Some(o) => {
            let detour = horizon_point(start, end, o.center, o.safety_radius, orbit.detour_buffer);
            split_segment(start, detour, obstacles, exclude, orbit, depth - 1, route);
            split_segment(detour, end, obstacles, exclude, orbit, depth - 1, route);
        }
    }
}

/// Unit heading from `position` toward `waypoint`, deflected around planets.
#[must_use]
pub fn steer(
    position: Vec3,
    waypoint: Vec3,
    obstacles: &[Obstacle],
    exclude: Option<ColonyId>,
    orbit: &OrbitConfig,
) -> Vec3 {
    let aim = match first_obstruction(position, waypoint, obstacles, exclude) {
        Some(o) => horizon_point(
            position,
            waypoint,
            o.center,
            o.safety_radius,
            orbit.detour_buffer,
        ),
        None => waypoint,
    };
    normalize_or_axis(aim - position)
}
