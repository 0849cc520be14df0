//! Server-side bots
//!
//! Each bot is a small state machine advanced once per AI tick:
//! - refresh its wander target when reached or blocked
//! - turn toward the target at a bounded rate
//! - step forward, backing off and re-routing when it would hit an obstacle
//! - shoot at the nearest human when the weapon is ready, in range and in
//!   sight

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use rand::Rng;

use super::combat::{ShotRequest, WeaponStats};
use super::combatant::CombatantId;
use super::geometry::Vec3;
use super::room::Room;

/// Walking speed (units per second)
pub const BOT_SPEED: f64 = 4.2;
/// Turn rate (radians per second)
pub const BOT_TURN_RATE: f64 = 2.5;
/// A wander target closer than this (squared) counts as reached
const TARGET_REACHED_DIST_SQ: f64 = 4.0;
/// Height shots are fired from
const EYE_HEIGHT: f64 = 1.6;
/// Full width of the random aim error on X/Z
const AIM_JITTER_XZ: f64 = 0.8;
/// Full width of the random aim error on Y
const AIM_JITTER_Y: f64 = 0.3;
/// Upper bound of the random delay added after each shot (milliseconds)
const COOLDOWN_JITTER_MS: f64 = 120.0;

pub const BOT_NAMES: [&str; 15] = [
    "Alfred", "Viktor", "Lukas", "Adrian", "Simon", "David", "Martin", "Tobias", "Marek", "Samuel",
    "Oliver", "Daniel", "Jakub", "Peter", "Filip",
];

/// Per-bot AI state
#[derive(Debug, Clone, PartialEq)]
pub struct BotBrain {
    /// Facing, radians (0 = +Z)
    pub heading: f64,
    pub wander_target: Option<Vec3>,
    /// Time until the next shot may be attempted (milliseconds)
    pub shoot_cooldown_ms: f64,
}

impl BotBrain {
    pub fn new(heading: f64, shoot_cooldown_ms: f64) -> Self {
        Self {
            heading,
            wander_target: None,
            shoot_cooldown_ms,
        }
    }
}

/// Yaw that faces from `from` toward `to`
pub fn bearing(from: Vec3, to: Vec3) -> f64 {
    (to.x - from.x).atan2(to.z - from.z)
}

/// Move `current` toward `desired` along the shorter arc by `factor` of the
/// angular difference
pub fn turn_toward(current: f64, desired: f64, factor: f64) -> f64 {
    let diff = (desired - current + PI).rem_euclid(TAU) - PI;
    current + diff * factor
}

/// Position `distance` units ahead along `heading` on the ground plane
pub fn step_forward(position: Vec3, heading: f64, distance: f64) -> Vec3 {
    Vec3::new(
        position.x + heading.sin() * distance,
        position.y,
        position.z + heading.cos() * distance,
    )
}

fn jitter(rng: &mut impl Rng, width: f64) -> f64 {
    (rng.gen::<f64>() - 0.5) * width
}

impl Room {
    /// Advance every bot by one AI tick of `dt` seconds. Returns the number
    /// of shots fired.
    pub fn think(&mut self, dt: f64) -> usize {
        let ids: Vec<CombatantId> = self.bot_ids().collect();
        let mut shots = 0;
        for id in ids {
            if let Some(shot) = self.think_bot(id, dt) {
                self.handle_shot(id, shot);
                shots += 1;
            }
        }
        shots
    }

    fn think_bot(&mut self, id: CombatantId, dt: f64) -> Option<ShotRequest> {
        let bot = self.get(id)?;
        let stats = WeaponStats::for_key(&bot.weapon);
        let mut position = bot.position;
        let mut brain = bot.brain()?.clone();

        // Target refresh
        let stale = match brain.wander_target {
            None => true,
            Some(target) => {
                position.distance_squared(target) < TARGET_REACHED_DIST_SQ || self.collides(target)
            }
        };
        if stale {
            brain.wander_target = Some(self.random_spawn());
        }

        let enemy = self.nearest_human(position);

        // Heading
        if let Some(target) = brain.wander_target {
            let desired = bearing(position, target);
            brain.heading = turn_toward(brain.heading, desired, (BOT_TURN_RATE * dt).min(1.0));
        }
        // Facing shown to clients; a collision turn below only shows next tick
        let rot_y = brain.heading;

        // Movement
        let next = self.clamp_position(step_forward(position, brain.heading, BOT_SPEED * dt));
        if self.collides(next) {
            let side = if self.rng().gen_bool(0.5) { 1.0 } else { -1.0 };
            brain.heading += side * FRAC_PI_2;
            brain.wander_target = Some(self.random_spawn());
        } else {
            position = next;
        }

        // Engagement
        let mut shot = None;
        if let Some(target) = enemy {
            brain.shoot_cooldown_ms -= dt * 1000.0;
            let delta = target - position;
            if brain.shoot_cooldown_ms <= 0.0 && delta.length_squared() < stats.range * stats.range {
                let origin = position.with_y(EYE_HEIGHT);
                let rng = self.rng();
                let direction = Vec3::new(
                    delta.x + jitter(rng, AIM_JITTER_XZ),
                    delta.y + jitter(rng, AIM_JITTER_Y),
                    delta.z + jitter(rng, AIM_JITTER_XZ),
                );
                if self.has_line_of_sight(origin, target) {
                    brain.shoot_cooldown_ms =
                        stats.fire_delay_ms + self.rng().gen::<f64>() * COOLDOWN_JITTER_MS;
                    shot = Some(ShotRequest {
                        origin,
                        direction,
                        damage: stats.damage,
                        range: stats.range,
                    });
                } else {
                    // Throttle retries against an occluded target
                    brain.shoot_cooldown_ms = stats.fire_delay_ms;
                }
            }
        }

        let bot = self.get_mut(id)?;
        bot.position = position;
        bot.rot_y = rot_y;
        if let Some(slot) = bot.brain_mut() {
            *slot = brain;
        }
        shot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::Aabb;
    use crate::game::map::MapConfig;
    use crate::game::registry::IdGenerator;
    use crate::game::room::test_support::{drain, join, map, place, room};
    use crate::ws::protocol::ServerMsg;
    use std::sync::Arc;

    const DT: f64 = 0.2;

    fn brain(room: &Room, id: CombatantId) -> BotBrain {
        room.get(id).unwrap().brain().expect("bot").clone()
    }

    type Inbox = tokio::sync::mpsc::Receiver<Arc<ServerMsg>>;

    /// One bot at the origin, ready to fire, walking away from `human_at`
    fn standoff(map: Arc<MapConfig>, human_at: Vec3) -> (Room, CombatantId, CombatantId, Inbox) {
        let ids = IdGenerator::new();
        let mut room = room(map, 1, &ids);
        let bot = room.bot_ids().next().unwrap();
        let (human, mut rx) = join(&mut room, &ids, "Alice", None);
        place(&mut room, bot, Vec3::new(0.0, 1.6, 0.0));
        place(&mut room, human, human_at);
        {
            let brain = room.get_mut(bot).unwrap().brain_mut().unwrap();
            brain.shoot_cooldown_ms = 0.0;
            brain.heading = PI;
            brain.wander_target = Some(Vec3::new(0.0, 1.6, -100.0));
        }
        drain(&mut rx);
        (room, bot, human, rx)
    }

    #[test]
    fn bearing_points_along_axes() {
        let origin = Vec3::ZERO;
        assert!((bearing(origin, Vec3::new(0.0, 0.0, 5.0))).abs() < 1e-12);
        assert!((bearing(origin, Vec3::new(5.0, 0.0, 0.0)) - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn turning_takes_the_short_way_round() {
        // From just below +pi to just above -pi is a small step across the seam
        let current = PI - 0.1;
        let desired = -PI + 0.1;
        let turned = turn_toward(current, desired, 1.0);
        assert!((turned - (PI + 0.1)).abs() < 1e-9);

        let half = turn_toward(0.0, 1.0, 0.5);
        assert!((half - 0.5).abs() < 1e-12);
    }

    #[test]
    fn turning_is_bounded_by_factor() {
        let turned = turn_toward(0.0, 3.0, 0.5);
        assert!((turned - 1.5).abs() < 1e-12);
    }

    #[test]
    fn step_forward_follows_heading() {
        let p = step_forward(Vec3::new(0.0, 1.6, 0.0), 0.0, 2.0);
        assert!((p.z - 2.0).abs() < 1e-12 && p.x.abs() < 1e-12);
        assert_eq!(p.y, 1.6);
    }

    #[test]
    fn bot_shoots_a_visible_human() {
        let open = map(&[(0.0, 0.0), (0.0, -100.0)], vec![]);
        let (mut room, bot, human, mut rx) = standoff(open, Vec3::new(0.0, 1.6, 10.0));

        assert_eq!(room.think(DT), 1);

        let stats = WeaponStats::for_key(&room.get(bot).unwrap().weapon);
        let cooldown = brain(&room, bot).shoot_cooldown_ms;
        assert!(cooldown >= stats.fire_delay_ms && cooldown < stats.fire_delay_ms + COOLDOWN_JITTER_MS);

        let health = room.get(human).unwrap().health;
        assert_eq!(health, 100.0 - stats.damage);

        let msgs = drain(&mut rx);
        assert!(matches!(msgs[0], ServerMsg::ShotEvent { shooter_id, is_bot: true, .. } if shooter_id == bot));
        assert!(msgs.iter().any(|m| matches!(m, ServerMsg::HitInfo { killed: false, .. })));
    }

    #[test]
    fn bot_holds_fire_through_walls() {
        let wall = Aabb::new(Vec3::new(-5.0, 0.0, 4.0), Vec3::new(5.0, 6.0, 6.0));
        let walled = map(&[(0.0, 0.0), (0.0, -100.0)], vec![wall]);
        let (mut room, bot, human, mut rx) = standoff(walled, Vec3::new(0.0, 1.6, 10.0));

        assert_eq!(room.think(DT), 0);

        let stats = WeaponStats::for_key(&room.get(bot).unwrap().weapon);
        assert_eq!(brain(&room, bot).shoot_cooldown_ms, stats.fire_delay_ms);
        assert_eq!(room.get(human).unwrap().health, 100.0);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn bot_walks_toward_its_wander_target() {
        let open = map(&[(0.0, 0.0), (0.0, -100.0)], vec![]);
        let (mut room, bot, _, _rx) = standoff(open, Vec3::new(150.0, 1.6, 150.0));
        room.get_mut(bot).unwrap().brain_mut().unwrap().shoot_cooldown_ms = 10_000.0;

        room.think(DT);

        let moved = room.get(bot).unwrap();
        assert!((moved.position.z + BOT_SPEED * DT).abs() < 1e-9);
        assert!(moved.position.x.abs() < 1e-9);
        assert_eq!(moved.rot_y, brain(&room, bot).heading);
    }

    #[test]
    fn bot_backs_off_a_wall_and_reroutes() {
        // Padded wall covers the next step toward -Z but not the bot itself
        let wall = Aabb::new(Vec3::new(-5.0, 0.0, -4.0), Vec3::new(5.0, 6.0, -1.5));
        let walled = map(&[(0.0, 0.0), (0.0, -100.0)], vec![wall]);
        let (mut room, bot, _, _rx) = standoff(walled, Vec3::new(150.0, 1.6, 150.0));
        room.get_mut(bot).unwrap().brain_mut().unwrap().shoot_cooldown_ms = 10_000.0;

        room.think(DT);

        let after = room.get(bot).unwrap();
        assert_eq!(after.position, Vec3::new(0.0, 1.6, 0.0));
        assert_eq!(after.rot_y, PI);
        let brain = brain(&room, bot);
        assert!(((brain.heading - PI).abs() - FRAC_PI_2).abs() < 1e-9);
        assert_ne!(brain.wander_target, Some(Vec3::new(0.0, 1.6, -100.0)));
    }

    #[test]
    fn blocked_wander_target_is_replaced() {
        let old_target = Vec3::new(0.0, 1.6, -100.0);
        let crate_box = Aabb::new(Vec3::new(-3.0, 0.0, -103.0), Vec3::new(3.0, 6.0, -97.0));
        let blocked = map(&[(0.0, 0.0), (80.0, 0.0)], vec![crate_box]);
        let (mut room, bot, _, _rx) = standoff(blocked, Vec3::new(150.0, 1.6, 150.0));
        room.get_mut(bot).unwrap().brain_mut().unwrap().shoot_cooldown_ms = 10_000.0;
        assert!(room.collides(old_target));

        room.think(DT);

        let target = brain(&room, bot).wander_target.expect("has a target");
        assert_ne!(target, old_target);
        assert!(!room.collides(target));
    }

    #[test]
    fn cooldown_only_ticks_with_a_human_present() {
        let ids = IdGenerator::new();
        let mut room = room(map(&[(0.0, 0.0), (50.0, 0.0)], vec![]), 3, &ids);
        let before: Vec<f64> = room
            .bot_ids()
            .map(|id| brain(&room, id).shoot_cooldown_ms)
            .collect();

        assert_eq!(room.think(DT), 0);

        let after: Vec<f64> = room
            .bot_ids()
            .map(|id| brain(&room, id).shoot_cooldown_ms)
            .collect();
        assert_eq!(before, after);
    }
}
