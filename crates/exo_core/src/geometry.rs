//! Vector geometry shared by movement, path planning and combat.
//!
//! Everything here is a pure function over [`glam`] vectors. Degenerate
//! input (zero-length directions, coincident points) never panics; a fixed
//! fallback axis is substituted instead.
//!
//! World space is y-up, matching the client renderer.

use glam::{EulerRot, Quat, Vec2, Vec3};

/// Tolerance used for intersection tests and degenerate-vector checks.
pub const EPSILON: f32 = 1e-4;

/// Axis substituted when a direction cannot be normalized.
pub const FALLBACK_AXIS: Vec3 = Vec3::Y;

/// Euclidean distance between two 2D points.
#[must_use]
pub fn distance_2d(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

/// Euclidean distance between two 3D points.
#[must_use]
pub fn distance(a: Vec3, b: Vec3) -> f32 {
    a.distance(b)
}

/// Normalize `v`, returning `fallback` for near-zero vectors.
#[must_use]
pub fn safe_normalize(v: Vec3, fallback: Vec3) -> Vec3 {
    let len_sq = v.length_squared();
    if len_sq < EPSILON * EPSILON {
        fallback
    } else {
        v / len_sq.sqrt()
    }
}

/// Normalize `v`, falling back to [`FALLBACK_AXIS`].
#[must_use]
pub fn normalize_or_axis(v: Vec3) -> Vec3 {
    safe_normalize(v, FALLBACK_AXIS)
}

/// Closest point on segment `start..end` to `point`, with its segment parameter.
#[must_use]
pub fn closest_point_on_segment(start: Vec3, end: Vec3, point: Vec3) -> (Vec3, f32) {
    let d = end - start;
    let len_sq = d.length_squared();
    if len_sq < EPSILON * EPSILON {
        return (start, 0.0);
    }
    let t = ((point - start).dot(d) / len_sq).clamp(0.0, 1.0);
    (start + d * t, t)
}

/// Whether the segment `start..end` enters the sphere strictly between its endpoints.
///
/// Solves the ray/sphere quadratic and accepts a root only inside
/// `(EPSILON, 1 - EPSILON)`, so a segment that merely starts or ends on the
/// surface does not count as obstructed.
#[must_use]
pub fn segment_intersects_sphere(start: Vec3, end: Vec3, center: Vec3, radius: f32) -> bool {
    let d = end - start;
    let a = d.length_squared();
    if a < EPSILON * EPSILON {
        return false;
    }
    let f = start - center;
    let b = 2.0 * f.dot(d);
    let c = f.length_squared() - radius * radius;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return false;
    }
    let root = discriminant.sqrt();
    let t1 = (-b - root) / (2.0 * a);
    let t2 = (-b + root) / (2.0 * a);
    let inside = |t: f32| t > EPSILON && t < 1.0 - EPSILON;
    inside(t1) || inside(t2)
}

/// Detour point for a segment that clips a sphere.
///
/// Takes the segment's closest approach to `center` and pushes it out to the
/// sphere surface plus `buffer`. When the segment runs straight through the
/// center the push direction comes from the segment's tangent frame.
#[must_use]
pub fn horizon_point(start: Vec3, end: Vec3, center: Vec3, radius: f32, buffer: f32) -> Vec3 {
    let (closest, _) = closest_point_on_segment(start, end, center);
    let outward = closest - center;
    let dir = if outward.length_squared() < EPSILON * EPSILON {
        TangentFrame::from_up(end - start).right
    } else {
        outward.normalize()
    };
    center + dir * (radius + buffer)
}

/// Orthonormal basis perpendicular to an "up" direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentFrame {
    /// First tangent axis.
    pub right: Vec3,
    /// Second tangent axis, `up × right`.
    pub forward: Vec3,
    /// Normalized up axis.
    pub up: Vec3,
}

impl TangentFrame {
    /// Build a frame around `up`. A zero `up` yields the world y-up frame.
    #[must_use]
    pub fn from_up(up: Vec3) -> Self {
        let up = normalize_or_axis(up);
        // World Y is a poor reference when up is almost parallel to it.
        let reference = if up.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };
        let right = safe_normalize(reference.cross(up), Vec3::Z);
        let forward = up.cross(right);
        Self { right, forward, up }
    }

    /// `origin + right * x + forward * y`.
    #[must_use]
    pub fn planar_point(&self, origin: Vec3, x: f32, y: f32) -> Vec3 {
        origin + self.right * x + self.forward * y
    }

    /// Unit direction at `polar` radians from `up` and `azimuth` radians around it.
    #[must_use]
    pub fn spherical_direction(&self, polar: f32, azimuth: f32) -> Vec3 {
        let (sin_p, cos_p) = polar.sin_cos();
        let (sin_a, cos_a) = azimuth.sin_cos();
        self.right * (sin_p * cos_a) + self.forward * (sin_p * sin_a) + self.up * cos_p
    }
}

/// Unit direction from a planet's center to a 2D base coordinate.
///
/// `base.x` is longitude as a fraction of π and `base.y` latitude in degrees.
/// When `rotation` is given (XYZ Euler radians) the direction is rotated with
/// the planet; the default convention leaves it out to match the client.
#[must_use]
pub fn base_direction(base: Vec2, rotation: Option<Vec3>) -> Vec3 {
    let longitude = base.x * std::f32::consts::PI;
    let latitude = base.y.clamp(-90.0, 90.0).to_radians();
    let (sin_lat, cos_lat) = latitude.sin_cos();
    let (sin_lon, cos_lon) = longitude.sin_cos();
    let dir = Vec3::new(cos_lat * cos_lon, sin_lat, cos_lat * sin_lon);
    match rotation {
        Some(r) => Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z) * dir,
        None => dir,
    }
}

/// World position of a surface coordinate on a sphere of `radius` at `center`.
#[must_use]
pub fn surface_point(center: Vec3, radius: f32, base: Vec2, rotation: Option<Vec3>) -> Vec3 {
    center + base_direction(base, rotation) * radius
}
