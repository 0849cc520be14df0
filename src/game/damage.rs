//! Damage application, death and instant respawn

use std::sync::Arc;

use tracing::{info, warn};

use super::combatant::CombatantId;
use super::geometry::Vec3;
use super::room::Room;
use crate::ws::protocol::ServerMsg;

/// What a single damage application did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub target: CombatantId,
    /// Health after the hit (full health again if killed)
    pub health: f64,
    pub killed: bool,
    /// Where the target respawned, if killed
    pub spawn: Option<Vec3>,
}

#[derive(Debug, Clone, Copy)]
enum ProfileDelta {
    Kill,
    Death,
}

impl Room {
    /// Subtract `amount` from the target's health. At zero or below the target
    /// respawns immediately with full health, the death and kill counters move
    /// and kill events go out.
    pub fn apply_damage(
        &mut self,
        target_id: CombatantId,
        shooter_id: Option<CombatantId>,
        amount: f64,
    ) -> Option<DamageOutcome> {
        let lethal = self.get_mut(target_id)?.take_damage(amount);

        let spawn = if lethal {
            let spawn = self.random_spawn();
            self.get_mut(target_id)?.respawn_at(spawn);
            Some(spawn)
        } else {
            None
        };

        // Self-inflicted kills do not count
        let shooter_id = shooter_id.filter(|id| *id != target_id && self.get(*id).is_some());
        if lethal {
            if let Some(shooter) = shooter_id.and_then(|id| self.get_mut(id)) {
                shooter.kills += 1;
            }
        }

        let killer = shooter_id
            .and_then(|id| self.get(id))
            .map(|s| s.nickname.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        let target = self.get(target_id)?;
        let outcome = DamageOutcome {
            target: target_id,
            health: target.health,
            killed: lethal,
            spawn,
        };

        target.send(&Arc::new(ServerMsg::HitInfo {
            hp: target.health,
            killed: lethal,
            killer: killer.clone(),
            spawn,
        }));

        if let Some(shooter_id) = shooter_id {
            if lethal {
                info!(room = %self.id(), killer = %killer, killer_id = shooter_id, victim_id = target_id, "Kill");
                self.broadcast_except(
                    &Arc::new(ServerMsg::KillEvent {
                        killer_id: shooter_id,
                        victim_id: target_id,
                    }),
                    None,
                );
            }

            if let Some(shooter) = self.get(shooter_id) {
                shooter.send(&Arc::new(ServerMsg::HitConfirm {
                    target_id,
                }));
            }
        }

        if lethal {
            self.record_profile_delta(target_id, ProfileDelta::Death);
            if let Some(shooter_id) = shooter_id {
                self.record_profile_delta(shooter_id, ProfileDelta::Kill);
            }
        }

        Some(outcome)
    }

    /// Bump a human's persistent counters and push the fresh profile back.
    /// Store failures never affect gameplay.
    fn record_profile_delta(&self, id: CombatantId, delta: ProfileDelta) {
        let Some(combatant) = self.get(id) else {
            return;
        };
        let Some(profile_id) = combatant.profile_id() else {
            return;
        };

        let result = match delta {
            ProfileDelta::Kill => self.profiles().increment_kills(profile_id),
            ProfileDelta::Death => self.profiles().increment_deaths(profile_id),
        };

        match result {
            Ok(Some(profile)) => combatant.send(&Arc::new(ServerMsg::Profile { profile })),
            Ok(None) => {}
            Err(e) => {
                warn!(profile_id = %profile_id, delta = ?delta, error = %e, "Failed to update profile");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combatant::MAX_HEALTH;
    use crate::game::registry::IdGenerator;
    use crate::game::room::test_support::{drain, join, map, room};

    const SPAWNS: [(f64, f64); 4] = [(0.0, 0.0), (40.0, 0.0), (80.0, 0.0), (120.0, 0.0)];

    #[test]
    fn non_lethal_damage_only_lowers_health() {
        let ids = IdGenerator::new();
        let mut room = room(map(&SPAWNS, vec![]), 0, &ids);
        let (a, mut rx_a) = join(&mut room, &ids, "Alice", None);
        let (b, mut rx_b) = join(&mut room, &ids, "Bob", None);
        drain(&mut rx_a);
        drain(&mut rx_b);

        let outcome = room.apply_damage(b, Some(a), 40.0).unwrap();
        assert_eq!(outcome.health, 60.0);
        assert!(!outcome.killed);
        assert_eq!(room.get(b).unwrap().deaths, 0);
        assert_eq!(room.get(a).unwrap().kills, 0);

        assert_eq!(
            drain(&mut rx_b),
            vec![ServerMsg::HitInfo {
                hp: 60.0,
                killed: false,
                killer: "Alice".into(),
                spawn: None,
            }]
        );
        assert_eq!(drain(&mut rx_a), vec![ServerMsg::HitConfirm { target_id: b }]);
    }

    #[test]
    fn lethal_damage_respawns_and_counts() {
        let ids = IdGenerator::new();
        let mut room = room(map(&SPAWNS, vec![]), 0, &ids);
        let (a, mut rx_a) = join(&mut room, &ids, "Alice", None);
        let (b, mut rx_b) = join(&mut room, &ids, "Bob", None);
        drain(&mut rx_a);
        drain(&mut rx_b);
        room.get_mut(b).unwrap().health = 30.0;

        let outcome = room.apply_damage(b, Some(a), 30.0).unwrap();
        assert!(outcome.killed);
        assert_eq!(outcome.health, MAX_HEALTH);
        let spawn = outcome.spawn.unwrap();

        let victim = room.get(b).unwrap();
        assert_eq!((victim.health, victim.deaths, victim.position), (MAX_HEALTH, 1, spawn));
        assert_eq!(room.get(a).unwrap().kills, 1);

        let kill = ServerMsg::KillEvent {
            killer_id: a,
            victim_id: b,
        };
        assert_eq!(
            drain(&mut rx_b),
            vec![
                ServerMsg::HitInfo {
                    hp: MAX_HEALTH,
                    killed: true,
                    killer: "Alice".into(),
                    spawn: Some(spawn),
                },
                kill.clone(),
            ]
        );
        assert_eq!(drain(&mut rx_a), vec![kill, ServerMsg::HitConfirm { target_id: b }]);
    }

    #[test]
    fn self_inflicted_death_scores_no_kill() {
        let ids = IdGenerator::new();
        let mut room = room(map(&SPAWNS, vec![]), 0, &ids);
        let (a, mut rx_a) = join(&mut room, &ids, "Alice", None);
        drain(&mut rx_a);

        let outcome = room.apply_damage(a, Some(a), 150.0).unwrap();
        assert!(outcome.killed);
        let me = room.get(a).unwrap();
        assert_eq!((me.kills, me.deaths), (0, 1));

        let msgs = drain(&mut rx_a);
        assert_eq!(msgs.len(), 1);
        assert!(matches!(&msgs[0], ServerMsg::HitInfo { killer, killed: true, .. } if killer == "Unknown"));
    }

    #[test]
    fn kills_update_both_profiles() {
        let ids = IdGenerator::new();
        let mut room = room(map(&SPAWNS, vec![]), 0, &ids);
        let pa = room.profiles().upsert(Some("pa"), Some("Alice"), None).unwrap();
        let pb = room.profiles().upsert(Some("pb"), Some("Bob"), None).unwrap();
        let (a, mut rx_a) = join(&mut room, &ids, "Alice", Some(pa));
        let (b, mut rx_b) = join(&mut room, &ids, "Bob", Some(pb));
        drain(&mut rx_a);
        drain(&mut rx_b);

        room.apply_damage(b, Some(a), 100.0).unwrap();

        let killer = room.profiles().get("pa").unwrap().unwrap();
        let victim = room.profiles().get("pb").unwrap().unwrap();
        assert_eq!((killer.total_kills, killer.total_deaths), (1, 0));
        assert_eq!((victim.total_kills, victim.total_deaths), (0, 1));

        assert!(drain(&mut rx_a).contains(&ServerMsg::Profile { profile: killer }));
        assert!(drain(&mut rx_b).contains(&ServerMsg::Profile { profile: victim }));
    }

    #[test]
    fn bots_die_and_respawn_like_humans() {
        let ids = IdGenerator::new();
        let mut room = room(map(&SPAWNS, vec![]), 1, &ids);
        let bot = room.bot_ids().next().unwrap();
        let (a, mut rx_a) = join(&mut room, &ids, "Alice", None);
        drain(&mut rx_a);

        let outcome = room.apply_damage(bot, Some(a), 250.0).unwrap();
        assert!(outcome.killed);
        assert_eq!(room.get(bot).unwrap().deaths, 1);
        assert_eq!(room.get(a).unwrap().kills, 1);
        assert_eq!(room.bot_count(), 1);
    }

    #[test]
    fn unknown_target_is_ignored() {
        let ids = IdGenerator::new();
        let mut room = room(map(&SPAWNS, vec![]), 0, &ids);
        assert!(room.apply_damage(999, None, 10.0).is_none());
    }
}
