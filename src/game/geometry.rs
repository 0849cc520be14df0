//! Vector math and ray intersection primitives
//!
//! Everything here is pure and allocation-free. Hit resolution and bot
//! line-of-sight are both built on these three tests: ray vs sphere,
//! ray vs capsule and segment vs axis-aligned box.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Directions shorter than this are treated as degenerate
const EPSILON: f64 = 1e-6;

/// Point or direction in world space (Y is up)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Euclidean length, without overflow or underflow for extreme
    /// components
    pub fn length(self) -> f64 {
        self.x.hypot(self.y).hypot(self.z)
    }

    /// Squared distance on the horizontal (X/Z) plane only
    pub fn horizontal_distance_squared(self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    pub fn distance_squared(self, other: Vec3) -> f64 {
        (self - other).length_squared()
    }

    /// Unit vector in the same direction. A zero-length vector is returned
    /// unchanged, so callers never see NaN components.
    pub fn normalize_or_zero(self) -> Vec3 {
        let len = self.length();
        if len > 0.0 && len.is_finite() {
            Vec3::new(self.x / len, self.y / len, self.z / len)
        } else {
            self
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Same point with the Y component replaced
    pub fn with_y(self, y: f64) -> Vec3 {
        Vec3 { y, ..self }
    }

    fn axis(self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Point on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub z: f64,
}

impl Point2 {
    pub const fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    /// Lift the point into world space at the given height
    pub fn at_height(self, y: f64) -> Vec3 {
        Vec3::new(self.x, y, self.z)
    }
}

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// True if `min <= max` on every axis
    pub fn is_well_formed(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }
}

/// Distance along `dir` (unit length) to the first entry into a sphere.
///
/// Returns `None` when the ray misses, when the entry point lies behind the
/// origin (including an origin inside the sphere), or beyond `max_range`.
pub fn ray_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f64, max_range: f64) -> Option<f64> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    if t < 0.0 || t > max_range {
        return None;
    }
    Some(t)
}

/// Distance along `dir` (unit length) to the first entry into a capsule whose
/// centre line runs from `a` to `b`.
///
/// The ray must enter the capsule's infinite cylinder in front of the origin.
/// When that entry point lies beyond the segment the two end caps are tested
/// as spheres and the nearer one wins. Rays that start inside the infinite
/// cylinder, or run parallel to its axis, report no entry.
pub fn ray_capsule(
    origin: Vec3,
    dir: Vec3,
    a: Vec3,
    b: Vec3,
    radius: f64,
    max_range: f64,
) -> Option<f64> {
    let ba = b - a;
    let oa = origin - a;
    let baba = ba.dot(ba);
    let bard = ba.dot(dir);
    let baoa = ba.dot(oa);
    let rdoa = dir.dot(oa);
    let oaoa = oa.dot(oa);

    let k2 = baba - bard * bard;
    if k2.abs() < EPSILON {
        return None;
    }

    let k1 = baba * rdoa - baoa * bard;
    let k0 = baba * oaoa - baoa * baoa - radius * radius * baba;
    let h = k1 * k1 - k2 * k0;
    if h < 0.0 {
        return None;
    }

    let t = (-k1 - h.sqrt()) / k2;
    if t <= 0.0 || t >= max_range {
        return None;
    }

    let y = baoa + t * bard;
    if y > 0.0 && y < baba {
        return Some(t);
    }
    nearest_cap(origin, dir, a, b, radius, max_range)
}

fn nearest_cap(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3, radius: f64, max_range: f64) -> Option<f64> {
    let cap_a = ray_sphere(origin, dir, a, radius, max_range);
    let cap_b = ray_sphere(origin, dir, b, radius, max_range);
    match (cap_a, cap_b) {
        (Some(ta), Some(tb)) => Some(ta.min(tb)),
        (hit, None) | (None, hit) => hit,
    }
}

/// Slab test of the segment `origin + t * dir`, `t in [0, max_t]`, against a
/// box. Returns the entry parameter when the segment overlaps the box.
///
/// `dir` must be unit length (or zero, in which case only containment of the
/// origin counts).
pub fn segment_aabb(origin: Vec3, dir: Vec3, max_t: f64, aabb: &Aabb) -> Option<f64> {
    let mut t_min = 0.0_f64;
    let mut t_max = max_t;

    for axis in 0..3 {
        let o = origin.axis(axis);
        let d = dir.axis(axis);
        let lo = aabb.min.axis(axis);
        let hi = aabb.max.axis(axis);

        if d.abs() < EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let t1 = (lo - o) / d;
        let t2 = (hi - o) / d;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
        if t_min > t_max {
            return None;
        }
    }

    Some(t_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    #[test]
    fn sphere_hit_reports_entry_distance() {
        let t = ray_sphere(Vec3::ZERO, FORWARD, Vec3::new(0.0, 0.0, 10.0), 1.0, 100.0);
        assert_eq!(t, Some(9.0));
    }

    #[test]
    fn sphere_behind_origin_or_out_of_range_is_missed() {
        assert!(ray_sphere(Vec3::ZERO, FORWARD, Vec3::new(0.0, 0.0, -10.0), 1.0, 100.0).is_none());
        assert!(ray_sphere(Vec3::ZERO, FORWARD, Vec3::new(0.0, 0.0, 10.0), 1.0, 5.0).is_none());
        assert!(ray_sphere(Vec3::ZERO, FORWARD, Vec3::new(3.0, 0.0, 10.0), 1.0, 100.0).is_none());
    }

    #[test]
    fn capsule_side_hit() {
        let a = Vec3::new(0.0, -0.9, 10.0);
        let b = Vec3::new(0.0, 0.9, 10.0);
        let t = ray_capsule(Vec3::ZERO, FORWARD, a, b, 0.7, 100.0).unwrap();
        assert!((t - 9.3).abs() < 1e-9);
    }

    #[test]
    fn capsule_cap_hit_above_segment() {
        let a = Vec3::new(0.0, -0.9, 10.0);
        let b = Vec3::new(0.0, 0.9, 10.0);
        // Passes above the top end point, inside the cap radius
        let origin = Vec3::new(0.0, 1.2, 0.0);
        let t = ray_capsule(origin, FORWARD, a, b, 0.7, 100.0).unwrap();
        let expected = 10.0 - (0.7_f64 * 0.7 - 0.3 * 0.3).sqrt();
        assert!((t - expected).abs() < 1e-9);
    }

    #[test]
    fn capsule_ignores_rays_from_inside_its_cylinder() {
        let a = Vec3::new(0.0, -0.9, 0.0);
        let b = Vec3::new(0.0, 0.9, 0.0);
        let down = Vec3::new(0.0, -1.0, 0.0);
        assert!(ray_capsule(Vec3::new(0.0, 10.0, 0.0), down, a, b, 0.7, 100.0).is_none());

        let steep = Vec3::new(0.05, -1.0, 0.0).normalize_or_zero();
        assert!(ray_capsule(Vec3::new(0.0, 10.0, 0.0), steep, a, b, 0.7, 100.0).is_none());
    }

    #[test]
    fn capsule_miss() {
        let a = Vec3::new(5.0, -0.9, 10.0);
        let b = Vec3::new(5.0, 0.9, 10.0);
        assert!(ray_capsule(Vec3::ZERO, FORWARD, a, b, 0.7, 100.0).is_none());
    }

    #[test]
    fn segment_through_box_is_detected() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 4.0), Vec3::new(1.0, 1.0, 6.0));
        assert_eq!(segment_aabb(Vec3::ZERO, FORWARD, 10.0, &aabb), Some(4.0));
        // Segment stops short of the box
        assert!(segment_aabb(Vec3::ZERO, FORWARD, 3.0, &aabb).is_none());
    }

    #[test]
    fn segment_parallel_outside_slab_misses() {
        let aabb = Aabb::new(Vec3::new(2.0, -1.0, 4.0), Vec3::new(3.0, 1.0, 6.0));
        assert!(segment_aabb(Vec3::ZERO, FORWARD, 10.0, &aabb).is_none());
    }

    #[test]
    fn normalize_zero_stays_zero() {
        assert_eq!(Vec3::ZERO.normalize_or_zero(), Vec3::ZERO);
        let n = Vec3::new(3.0, 0.0, 4.0).normalize_or_zero();
        assert!((n.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_handles_extreme_magnitudes() {
        for scale in [1e-200, 1e200, f64::MIN_POSITIVE / 4.0, f64::MAX] {
            let n = Vec3::new(0.0, 0.0, scale).normalize_or_zero();
            assert_eq!(n, FORWARD, "scale {scale:e}");
        }
        let n = Vec3::new(3e200, 0.0, 4e200).normalize_or_zero();
        assert!((n.x - 0.6).abs() < 1e-12 && (n.z - 0.8).abs() < 1e-12);
        assert_eq!(Vec3::new(0.0, 0.0, 1e200).length(), 1e200);
    }
}
