//! World bounds, obstacle collision and line-of-sight

use super::geometry::{segment_aabb, Aabb, Vec3};

/// Lowest height a combatant may be stored at
pub const MIN_HEIGHT: f64 = 0.5;
/// Highest height a combatant may be stored at
pub const MAX_HEIGHT: f64 = 8.0;
/// Horizontal padding around obstacles when testing movement
pub const COLLISION_RADIUS: f64 = 1.1;

/// Stateless queries against a map's static geometry
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Clamp X/Z into `[-half_extent, half_extent]` and Y into the fixed
    /// vertical band. Idempotent.
    pub fn clamp_position(pos: Vec3, half_extent: f64) -> Vec3 {
        Vec3::new(
            pos.x.clamp(-half_extent, half_extent),
            pos.y.clamp(MIN_HEIGHT, MAX_HEIGHT),
            pos.z.clamp(-half_extent, half_extent),
        )
    }

    /// True if a combatant standing at `pos` would overlap any obstacle
    pub fn collides(pos: Vec3, obstacles: &[Aabb]) -> bool {
        obstacles.iter().any(|b| {
            pos.x > b.min.x - COLLISION_RADIUS
                && pos.x < b.max.x + COLLISION_RADIUS
                && pos.z > b.min.z - COLLISION_RADIUS
                && pos.z < b.max.z + COLLISION_RADIUS
                && pos.y > b.min.y - 0.5
                && pos.y < b.max.y + 1.0
        })
    }

    /// True if no obstacle overlaps the segment from `origin` to `target`
    pub fn has_line_of_sight(origin: Vec3, target: Vec3, obstacles: &[Aabb]) -> bool {
        let delta = target - origin;
        let mut distance = delta.length();
        if distance == 0.0 {
            distance = 1.0;
        }
        let dir = delta * (1.0 / distance);

        !obstacles
            .iter()
            .any(|aabb| segment_aabb(origin, dir, distance, aabb).is_some())
    }
}
