//! Room state: one isolated simulation per map id
//!
//! A `Room` is plain data plus synchronous methods. It is owned by exactly one
//! room actor task (see [`super::actor`]), so nothing in here locks.

use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::sync::Arc;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::bot::{BotBrain, BOT_NAMES};
use super::combat::WeaponStats;
use super::combatant::{sanitize_nickname, Combatant, CombatantId, Controller, MAX_HEALTH};
use super::geometry::{Point2, Vec3};
use super::map::MapConfig;
use super::physics::PhysicsSystem;
use super::registry::IdGenerator;
use crate::store::{Profile, ProfileStore};
use crate::ws::connection::Connection;
use crate::ws::protocol::ServerMsg;

/// Height every spawn is placed at
pub const SPAWN_HEIGHT: f64 = 1.6;
/// Candidates closer than this (squared, X/Z only) to a combatant are rejected
pub const SPAWN_EXCLUSION_DIST_SQ: f64 = 49.0;
/// Spawn candidates tried before falling back to the first spawn point
pub const SPAWN_RETRIES: usize = 20;
/// Full width of the random offset added to a spawn point on X and Z
const SPAWN_JITTER: f64 = 2.0;

const BOT_CLASS: &str = "assault";
pub const DEFAULT_GAMEMODE: &str = "ffa";

/// A human entering a room
#[derive(Debug)]
pub struct JoinRequest {
    pub id: CombatantId,
    pub conn: Connection,
    pub nickname: String,
    pub class: String,
    pub gamemode: String,
    /// Weapon held on spawn
    pub weapon: String,
    /// Pushed to the client right after `hello`
    pub profile: Option<Profile>,
}

/// Pose report from a client. Fields are optional because clients may omit
/// any of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub rot_y: Option<f64>,
    pub weapon: Option<String>,
}

impl StateUpdate {
    /// Position and rotation, only if every component is present and finite
    pub fn pose(&self) -> Option<(Vec3, f64)> {
        let (x, y, z, rot_y) = (self.x?, self.y?, self.z?, self.rot_y?);
        let position = Vec3::new(x, y, z);
        (position.is_finite() && rot_y.is_finite()).then_some((position, rot_y))
    }
}

/// Pick a spawn from `points`, avoiding anything in `occupied`.
///
/// Each try takes a random point plus jitter and rejects it if it lies within
/// the exclusion radius of an occupied position. After [`SPAWN_RETRIES`]
/// failures the first spawn point is returned as-is.
pub fn pick_spawn(points: &[Point2], occupied: &[Vec3], rng: &mut impl Rng) -> Vec3 {
    let Some(first) = points.first() else {
        return Vec3::new(0.0, SPAWN_HEIGHT, 0.0);
    };

    for _ in 0..SPAWN_RETRIES {
        let base = points[rng.gen_range(0..points.len())];
        let candidate = Vec3::new(
            base.x + (rng.gen::<f64>() - 0.5) * SPAWN_JITTER,
            SPAWN_HEIGHT,
            base.z + (rng.gen::<f64>() - 0.5) * SPAWN_JITTER,
        );
        let clear = occupied
            .iter()
            .all(|p| p.horizontal_distance_squared(candidate) >= SPAWN_EXCLUSION_DIST_SQ);
        if clear {
            return candidate;
        }
    }

    first.at_height(SPAWN_HEIGHT)
}

/// All combatants playing one map
pub struct Room {
    id: String,
    map: Arc<MapConfig>,
    players: BTreeMap<CombatantId, Combatant>,
    bots: BTreeMap<CombatantId, Combatant>,
    rng: ChaCha8Rng,
    profiles: Arc<dyn ProfileStore>,
}

impl Room {
    /// Create a room and seed it with `bot_count` bots
    pub fn new(
        map: Arc<MapConfig>,
        profiles: Arc<dyn ProfileStore>,
        rng: ChaCha8Rng,
        bot_count: usize,
        ids: &IdGenerator,
    ) -> Self {
        let mut room = Self {
            id: map.id.clone(),
            map,
            players: BTreeMap::new(),
            bots: BTreeMap::new(),
            rng,
            profiles,
        };

        for _ in 0..bot_count {
            room.seed_bot(ids.next_id());
        }

        info!(room = %room.id, bots = room.bots.len(), "Room created");
        room
    }

    fn seed_bot(&mut self, id: CombatantId) {
        let name = BOT_NAMES[self.rng.gen_range(0..BOT_NAMES.len())];
        let weapon = WeaponStats::random_key(&mut self.rng);
        let stats = WeaponStats::for_key(weapon);
        let position = self.random_spawn();
        let heading = self.rng.gen::<f64>() * TAU;

        self.bots.insert(
            id,
            Combatant {
                id,
                nickname: name.to_string(),
                position,
                rot_y: 0.0,
                health: MAX_HEALTH,
                kills: 0,
                deaths: 0,
                weapon: weapon.to_string(),
                class: BOT_CLASS.to_string(),
                gamemode: DEFAULT_GAMEMODE.to_string(),
                controller: Controller::Bot(BotBrain::new(heading, stats.fire_delay_ms)),
            },
        );
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Place a human at a fresh spawn with full health and zeroed counters,
    /// then greet them. Re-joining replaces the previous entry.
    pub fn join(&mut self, req: JoinRequest) -> Vec3 {
        self.players.remove(&req.id);
        let spawn = self.random_spawn();

        let player = Combatant {
            id: req.id,
            nickname: sanitize_nickname(&req.nickname),
            position: spawn,
            rot_y: 0.0,
            health: MAX_HEALTH,
            kills: 0,
            deaths: 0,
            weapon: req.weapon,
            class: req.class,
            gamemode: req.gamemode,
            controller: Controller::Human {
                conn: req.conn,
                profile_id: req.profile.as_ref().map(|p| p.id.clone()),
            },
        };

        player.send(&Arc::new(ServerMsg::Hello {
            id: player.id,
            spawn,
            hp: player.health,
            map_id: self.map.id.clone(),
            weapon: player.weapon.clone(),
        }));
        if let Some(profile) = req.profile {
            player.send(&Arc::new(ServerMsg::Profile { profile }));
        }

        info!(
            room = %self.id,
            player_id = player.id,
            nickname = %player.nickname,
            players = self.players.len() + 1,
            "Player joined room"
        );
        self.players.insert(player.id, player);
        spawn
    }

    /// Remove a human. Returns false if they were not in this room.
    pub fn leave(&mut self, id: CombatantId) -> bool {
        let removed = self.players.remove(&id).is_some();
        if removed {
            info!(room = %self.id, player_id = id, players = self.players.len(), "Player left room");
        }
        removed
    }

    /// Apply a client pose report. The pose is taken only if fully finite
    /// and is clamped into the world; the weapon is applied on its own.
    /// Returns whether the pose was accepted.
    pub fn update_state(&mut self, id: CombatantId, update: StateUpdate) -> bool {
        let half_extent = self.map.world_half_extent;
        let Some(player) = self.players.get_mut(&id) else {
            debug!(room = %self.id, player_id = id, "State for player not in room");
            return false;
        };

        let pose = update.pose();
        if let Some((position, rot_y)) = pose {
            player.position = PhysicsSystem::clamp_position(position, half_extent);
            player.rot_y = rot_y;
        } else {
            debug!(player_id = id, "Ignoring non-finite state update");
        }

        if let Some(weapon) = update.weapon {
            player.weapon = weapon;
        }

        pose.is_some()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn map(&self) -> &MapConfig {
        &self.map
    }

    pub fn profiles(&self) -> &dyn ProfileStore {
        self.profiles.as_ref()
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.players.get(&id).or_else(|| self.bots.get(&id))
    }

    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        match self.players.get_mut(&id) {
            Some(player) => Some(player),
            None => self.bots.get_mut(&id),
        }
    }

    /// Every combatant, humans first, each group in id order
    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.players.values().chain(self.bots.values())
    }

    pub fn humans(&self) -> impl Iterator<Item = &Combatant> {
        self.players.values()
    }

    pub fn bot_ids(&self) -> impl Iterator<Item = CombatantId> + '_ {
        self.bots.keys().copied()
    }

    pub fn has_humans(&self) -> bool {
        !self.players.is_empty()
    }

    pub fn human_count(&self) -> usize {
        self.players.len()
    }

    pub fn bot_count(&self) -> usize {
        self.bots.len()
    }

    /// Send to every human in the room, optionally skipping one
    pub fn broadcast_except(&self, msg: &Arc<ServerMsg>, except: Option<CombatantId>) {
        for player in self.players.values() {
            if Some(player.id) != except {
                player.send(msg);
            }
        }
    }

    // ------------------------------------------------------------------
    // Spatial
    // ------------------------------------------------------------------

    /// Spawn position clear of every combatant currently in the room
    pub fn random_spawn(&mut self) -> Vec3 {
        let occupied: Vec<Vec3> = self.combatants().map(|c| c.position).collect();
        pick_spawn(&self.map.spawn_points, &occupied, &mut self.rng)
    }

    pub fn clamp_position(&self, pos: Vec3) -> Vec3 {
        PhysicsSystem::clamp_position(pos, self.map.world_half_extent)
    }

    pub fn collides(&self, pos: Vec3) -> bool {
        PhysicsSystem::collides(pos, &self.map.obstacles)
    }

    pub fn has_line_of_sight(&self, origin: Vec3, target: Vec3) -> bool {
        PhysicsSystem::has_line_of_sight(origin, target, &self.map.obstacles)
    }

    /// Position of the human closest to `from` (3D distance)
    pub fn nearest_human(&self, from: Vec3) -> Option<Vec3> {
        let mut best: Option<(f64, Vec3)> = None;
        for player in self.players.values() {
            let dist_sq = player.position.distance_squared(from);
            if best.map_or(true, |(d, _)| dist_sq < d) {
                best = Some((dist_sq, player.position));
            }
        }
        best.map(|(_, p)| p)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use rand::SeedableRng;
    use tokio::sync::mpsc;

    use super::*;
    use crate::game::geometry::Aabb;
    use crate::store::MemoryProfileStore;

    /// Open map with the given spawn points and obstacles
    pub fn map(spawns: &[(f64, f64)], obstacles: Vec<Aabb>) -> Arc<MapConfig> {
        Arc::new(MapConfig {
            id: "test".into(),
            spawn_points: spawns.iter().map(|&(x, z)| Point2::new(x, z)).collect(),
            obstacles,
            world_half_extent: 200.0,
        })
    }

    pub fn room(map: Arc<MapConfig>, bots: usize, ids: &IdGenerator) -> Room {
        Room::new(
            map,
            Arc::new(MemoryProfileStore::new()),
            ChaCha8Rng::seed_from_u64(7),
            bots,
            ids,
        )
    }

    pub fn join(
        room: &mut Room,
        ids: &IdGenerator,
        nickname: &str,
        profile: Option<Profile>,
    ) -> (CombatantId, mpsc::Receiver<Arc<ServerMsg>>) {
        let id = ids.next_id();
        let (conn, rx) = Connection::channel(id);
        room.join(JoinRequest {
            id,
            conn,
            nickname: nickname.into(),
            class: "assault".into(),
            gamemode: DEFAULT_GAMEMODE.into(),
            weapon: "AssaultRifle_1".into(),
            profile,
        });
        (id, rx)
    }

    pub fn drain(rx: &mut mpsc::Receiver<Arc<ServerMsg>>) -> Vec<ServerMsg> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push((*msg).clone());
        }
        out
    }

    /// Move a combatant somewhere specific
    pub fn place(room: &mut Room, id: CombatantId, position: Vec3) {
        room.get_mut(id).expect("combatant exists").position = position;
    }
}
