//! Combat system - weapons, hurtboxes and hitscan resolution

use std::sync::Arc;

use rand::Rng;

use super::combatant::CombatantId;
use super::geometry::{ray_capsule, ray_sphere, Vec3};
use super::room::Room;
use crate::ws::protocol::ServerMsg;

/// Hard cap on how far any shot can travel
pub const MAX_SHOT_RANGE: f64 = 150.0;
/// Damage applied when a client omits it
pub const DEFAULT_DAMAGE: f64 = 15.0;
pub const HEADSHOT_MULTIPLIER: f64 = 2.5;

const HEAD_OFFSET: f64 = 0.95;
const HEAD_RADIUS: f64 = 0.45;
const BODY_HALF_HEIGHT: f64 = 0.9;
const BODY_RADIUS: f64 = 0.7;

/// Static per-weapon tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    /// Damage per body hit
    pub damage: f64,
    /// Minimum time between shots (milliseconds)
    pub fire_delay_ms: f64,
    /// Maximum ray length
    pub range: f64,
}

/// Weapon used when a key is unknown
pub const DEFAULT_WEAPON: &str = "AssaultRifle_1";
/// Secondary weapon given when a client does not pick one
pub const DEFAULT_SECONDARY: &str = "Pistol_1";

const fn stats(damage: f64, fire_delay_ms: f64, range: f64) -> WeaponStats {
    WeaponStats {
        damage,
        fire_delay_ms,
        range,
    }
}

pub const WEAPONS: [(&str, WeaponStats); 14] = [
    ("AssaultRifle_1", stats(28.0, 110.0, 120.0)),
    ("AssaultRifle_2", stats(30.0, 130.0, 125.0)),
    ("AssaultRifle_3", stats(38.0, 190.0, 135.0)),
    ("Bullpup_1", stats(30.0, 120.0, 140.0)),
    ("Bullpup_2", stats(32.0, 135.0, 145.0)),
    ("Pistol_1", stats(14.0, 200.0, 70.0)),
    ("Pistol_2", stats(16.0, 190.0, 72.0)),
    ("Pistol_3", stats(18.0, 210.0, 75.0)),
    ("Pistol_4", stats(20.0, 230.0, 78.0)),
    ("Pistol_5", stats(22.0, 240.0, 80.0)),
    ("Pistol_6", stats(24.0, 260.0, 82.0)),
    ("Revolver_1", stats(60.0, 550.0, 90.0)),
    ("Revolver_2", stats(70.0, 620.0, 95.0)),
    ("Revolver_3", stats(80.0, 700.0, 100.0)),
];

impl WeaponStats {
    /// Look up a weapon, falling back to [`DEFAULT_WEAPON`]
    pub fn for_key(key: &str) -> WeaponStats {
        WEAPONS
            .iter()
            .find(|(k, _)| *k == key)
            .or_else(|| WEAPONS.iter().find(|(k, _)| *k == DEFAULT_WEAPON))
            .map(|(_, s)| *s)
            .unwrap_or(WEAPONS[0].1)
    }

    pub fn random_key(rng: &mut impl Rng) -> &'static str {
        WEAPONS[rng.gen_range(0..WEAPONS.len())].0
    }
}

/// A fired shot, before resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotRequest {
    pub origin: Vec3,
    /// Need not be normalized
    pub direction: Vec3,
    pub damage: f64,
    pub range: f64,
}

impl ShotRequest {
    /// Build a request from a client `shot` payload. Missing or non-finite
    /// origin/direction yields `None`; damage and range get defaults.
    pub fn from_payload(
        origin: Option<Vec3>,
        direction: Option<Vec3>,
        damage: Option<f64>,
        range: Option<f64>,
    ) -> Option<Self> {
        let origin = origin.filter(|v| v.is_finite())?;
        let direction = direction.filter(|v| v.is_finite())?;
        Some(Self {
            origin,
            direction,
            damage: damage
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(DEFAULT_DAMAGE),
            range: range
                .filter(|r| r.is_finite() && *r != 0.0)
                .unwrap_or(MAX_SHOT_RANGE),
        })
    }
}

/// Which hurtbox volume a ray entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitZone {
    Head,
    Body,
}

impl HitZone {
    pub fn multiplier(self) -> f64 {
        match self {
            HitZone::Head => HEADSHOT_MULTIPLIER,
            HitZone::Body => 1.0,
        }
    }
}

/// Result of resolving a shot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub target: CombatantId,
    pub distance: f64,
    pub zone: HitZone,
}

/// Test a ray against the hurtbox of a combatant standing at `position`.
///
/// The head wins whenever it is entered no further along the ray than the
/// body.
pub fn probe_hurtbox(origin: Vec3, dir: Vec3, range: f64, position: Vec3) -> Option<(f64, HitZone)> {
    let head_center = position + Vec3::new(0.0, HEAD_OFFSET, 0.0);
    let body_low = position - Vec3::new(0.0, BODY_HALF_HEIGHT, 0.0);
    let body_high = position + Vec3::new(0.0, BODY_HALF_HEIGHT, 0.0);

    let head = ray_sphere(origin, dir, head_center, HEAD_RADIUS, range);
    let body = ray_capsule(origin, dir, body_low, body_high, BODY_RADIUS, range);

    match (head, body) {
        (Some(h), Some(b)) if h <= b => Some((h, HitZone::Head)),
        (_, Some(b)) => Some((b, HitZone::Body)),
        (Some(h), None) => Some((h, HitZone::Head)),
        (None, None) => None,
    }
}

/// Closest hurtbox hit along a unit ray. On equal distances the earlier
/// candidate is kept.
pub fn closest_hit(
    origin: Vec3,
    dir: Vec3,
    range: f64,
    candidates: impl IntoIterator<Item = (CombatantId, Vec3)>,
) -> Option<Hit> {
    let mut best: Option<Hit> = None;
    for (id, position) in candidates {
        if let Some((distance, zone)) = probe_hurtbox(origin, dir, range, position) {
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(Hit {
                    target: id,
                    distance,
                    zone,
                });
            }
        }
    }
    best
}

impl Room {
    /// Resolve a shot fired by `shooter_id`: broadcast the tracer, find the
    /// closest hurtbox along the ray and apply damage to it.
    pub fn handle_shot(&mut self, shooter_id: CombatantId, shot: ShotRequest) -> Option<Hit> {
        let is_bot = self.get(shooter_id)?.is_bot();

        let dir = shot.direction.normalize_or_zero();
        let range = shot.range.clamp(1.0, MAX_SHOT_RANGE);

        self.broadcast_except(
            &Arc::new(ServerMsg::ShotEvent {
                shooter_id,
                origin: shot.origin,
                dir,
                is_bot,
            }),
            Some(shooter_id),
        );

        let candidates = self
            .combatants()
            .filter(|c| c.id != shooter_id)
            .map(|c| (c.id, c.position));
        let hit = closest_hit(shot.origin, dir, range, candidates)?;

        self.apply_damage(hit.target, Some(shooter_id), shot.damage * hit.zone.multiplier());
        Some(hit)
    }
}
