//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::geometry::Vec3;
use crate::game::CombatantId;
use crate::store::Profile;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Enter (or switch to) the room for a map
    Join {
        #[serde(default)]
        nickname: Option<String>,
        #[serde(default, alias = "mapId")]
        map: Option<String>,
        #[serde(default)]
        primary: Option<String>,
        #[serde(default)]
        secondary: Option<String>,
        #[serde(default)]
        profile_id: Option<String>,
        #[serde(default)]
        class: Option<String>,
        #[serde(default)]
        gamemode: Option<String>,
    },

    /// Client-reported pose, roughly 20 times a second
    State {
        #[serde(default)]
        x: Option<f64>,
        #[serde(default)]
        y: Option<f64>,
        #[serde(default)]
        z: Option<f64>,
        #[serde(default)]
        rot_y: Option<f64>,
        #[serde(default)]
        weapon: Option<String>,
    },

    /// Hitscan shot fired by the client
    Shot {
        #[serde(default)]
        origin: Option<Vec3>,
        #[serde(default)]
        dir: Option<Vec3>,
        #[serde(default)]
        damage: Option<f64>,
        #[serde(default)]
        range: Option<f64>,
    },

    /// Zero the caller's profile counters
    ResetProfile,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Reply to `join`
    Hello {
        id: CombatantId,
        spawn: Vec3,
        hp: f64,
        map_id: String,
        weapon: String,
    },

    /// Full room snapshot, sent at the broadcast interval
    State {
        map_id: String,
        players: Vec<PlayerSnapshot>,
    },

    /// Unicast to a human that was hit
    HitInfo {
        hp: f64,
        killed: bool,
        killer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        spawn: Option<Vec3>,
    },

    /// Unicast to a human whose shot landed
    HitConfirm { target_id: CombatantId },

    /// Broadcast to the room on every kill
    KillEvent {
        killer_id: CombatantId,
        victim_id: CombatantId,
    },

    /// Tracer for a shot, broadcast to everyone but the shooter
    ShotEvent {
        shooter_id: CombatantId,
        origin: Vec3,
        dir: Vec3,
        is_bot: bool,
    },

    /// Current persistent profile of the receiving player
    Profile { profile: Profile },
}

/// One combatant in a `state` snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: CombatantId,
    pub nickname: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rot_y: f64,
    pub hp: f64,
    pub is_bot: bool,
    pub kills: u32,
    pub deaths: u32,
    pub class: String,
    pub gamemode: String,
    pub weapon: Option<String>,
}
