//! Shared entity shape for human players and bots

use std::sync::Arc;

use super::bot::BotBrain;
use super::geometry::Vec3;
use crate::ws::connection::Connection;
use crate::ws::protocol::{PlayerSnapshot, ServerMsg};

/// Process-unique, monotonically assigned id
pub type CombatantId = u64;

/// Health every combatant spawns and respawns with
pub const MAX_HEALTH: f64 = 100.0;
/// Longest nickname kept from a client
pub const MAX_NICKNAME_LEN: usize = 24;

/// What drives a combatant
#[derive(Debug)]
pub enum Controller {
    /// A connected client
    Human {
        conn: Connection,
        profile_id: Option<String>,
    },
    /// Server-side AI
    Bot(BotBrain),
}

/// A human or a bot inside a room
#[derive(Debug)]
pub struct Combatant {
    pub id: CombatantId,
    pub nickname: String,
    pub position: Vec3,
    pub rot_y: f64,
    pub health: f64,
    pub kills: u32,
    pub deaths: u32,
    pub weapon: String,
    /// Pass-through tag, not used by gameplay
    pub class: String,
    /// Pass-through tag, not used by gameplay
    pub gamemode: String,
    pub controller: Controller,
}

impl Combatant {
    pub fn is_bot(&self) -> bool {
        matches!(self.controller, Controller::Bot(_))
    }

    pub fn profile_id(&self) -> Option<&str> {
        match &self.controller {
            Controller::Human { profile_id, .. } => profile_id.as_deref(),
            Controller::Bot(_) => None,
        }
    }

    pub fn brain(&self) -> Option<&BotBrain> {
        match &self.controller {
            Controller::Bot(brain) => Some(brain),
            Controller::Human { .. } => None,
        }
    }

    pub fn brain_mut(&mut self) -> Option<&mut BotBrain> {
        match &mut self.controller {
            Controller::Bot(brain) => Some(brain),
            Controller::Human { .. } => None,
        }
    }

    /// Deliver a message to this combatant's client. Bots have no socket,
    /// so this is a no-op for them.
    pub fn send(&self, msg: &Arc<ServerMsg>) {
        if let Controller::Human { conn, .. } = &self.controller {
            conn.send(Arc::clone(msg));
        }
    }

    /// Subtract `amount` from health. Returns true if this was lethal.
    pub fn take_damage(&mut self, amount: f64) -> bool {
        self.health -= amount;
        self.health <= 0.0
    }

    /// Instant respawn: full health, new position, facing forward
    pub fn respawn_at(&mut self, spawn: Vec3) {
        self.health = MAX_HEALTH;
        self.position = spawn;
        self.rot_y = 0.0;
        self.deaths += 1;
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            nickname: if self.nickname.is_empty() {
                format!("Player{}", self.id)
            } else {
                self.nickname.clone()
            },
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            rot_y: self.rot_y,
            hp: self.health,
            is_bot: self.is_bot(),
            kills: self.kills,
            deaths: self.deaths,
            class: self.class.clone(),
            gamemode: self.gamemode.clone(),
            weapon: (!self.weapon.is_empty()).then(|| self.weapon.clone()),
        }
    }
}

/// Trim a client-supplied nickname to the allowed length
pub fn sanitize_nickname(raw: &str) -> String {
    raw.chars().take(MAX_NICKNAME_LEN).collect()
}
