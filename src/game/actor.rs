//! Room actor: the task that owns a `Room` and serializes all work on it

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::combat::ShotRequest;
use super::combatant::CombatantId;
use super::room::{JoinRequest, Room, StateUpdate};

/// Commands queued per room before senders wait
const COMMAND_CAPACITY: usize = 1024;

/// Work a session can hand to a room
#[derive(Debug)]
pub enum RoomCommand {
    Join(JoinRequest),
    /// `done` fires once the player is out of the room
    Leave {
        id: CombatantId,
        done: oneshot::Sender<()>,
    },
    State { id: CombatantId, update: StateUpdate },
    Shot { id: CombatantId, shot: ShotRequest },
}

/// Timing and population of every room
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// How often snapshots go out
    pub broadcast_interval: Duration,
    /// How often bots think
    pub think_interval: Duration,
    pub bot_count: usize,
    /// Fixed RNG seed; `None` seeds from OS entropy
    pub seed: Option<u64>,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            broadcast_interval: Duration::from_millis(50),
            think_interval: Duration::from_millis(200),
            bot_count: 14,
            seed: None,
        }
    }
}

impl RoomSettings {
    /// RNG for a new room. Seeded runs mix the room id in so rooms differ.
    pub fn rng_for(&self, room_id: &str) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => {
                let salt = room_id
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
                ChaCha8Rng::seed_from_u64(seed ^ salt)
            }
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

/// Handle to a running room
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub id: String,
    cmd_tx: mpsc::Sender<RoomCommand>,
    player_count: Arc<AtomicUsize>,
}

impl RoomHandle {
    /// Queue a command. Returns false if the room task is gone.
    pub async fn send(&self, cmd: RoomCommand) -> bool {
        self.cmd_tx.send(cmd).await.is_ok()
    }

    /// Remove a player and wait until the room has done so. Returns false
    /// if the room task is gone.
    pub async fn leave(&self, id: CombatantId) -> bool {
        let (done, removed) = oneshot::channel();
        self.send(RoomCommand::Leave { id, done }).await && removed.await.is_ok()
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// Owns one room and drives it from commands and two timers
pub struct RoomActor {
    room: Room,
    cmd_rx: mpsc::Receiver<RoomCommand>,
    settings: RoomSettings,
    player_count: Arc<AtomicUsize>,
}

impl RoomActor {
    pub fn new(room: Room, settings: RoomSettings) -> (Self, RoomHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
        let player_count = Arc::new(AtomicUsize::new(room.human_count()));

        let handle = RoomHandle {
            id: room.id().to_string(),
            cmd_tx,
            player_count: player_count.clone(),
        };

        let actor = Self {
            room,
            cmd_rx,
            settings,
            player_count,
        };

        (actor, handle)
    }

    /// Run until every handle is dropped
    pub async fn run(mut self) {
        info!(room = %self.room.id(), "Room actor started");

        let mut broadcast_tick = interval(self.settings.broadcast_interval);
        broadcast_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut think_tick = interval(self.settings.think_interval);
        think_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let dt = self.settings.think_interval.as_secs_f64();

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                _ = broadcast_tick.tick() => {
                    self.room.broadcast_snapshot();
                }
                _ = think_tick.tick() => {
                    self.think(dt);
                }
            }
        }

        info!(room = %self.room.id(), "Room actor stopped");
    }

    /// One AI tick. Bots idle while nobody is watching. Returns whether
    /// the bots ran.
    fn think(&mut self, dt: f64) -> bool {
        if !self.room.has_humans() {
            return false;
        }
        self.room.think(dt);
        true
    }

    fn handle(&mut self, cmd: RoomCommand) {
        let mut left = None;
        match cmd {
            RoomCommand::Join(req) => {
                self.room.join(req);
            }
            RoomCommand::Leave { id, done } => {
                self.room.leave(id);
                left = Some(done);
            }
            RoomCommand::State { id, update } => {
                self.room.update_state(id, update);
            }
            RoomCommand::Shot { id, shot } => {
                if self.room.get(id).map_or(true, |c| c.is_bot()) {
                    debug!(room = %self.room.id(), player_id = id, "Shot from player not in room");
                    return;
                }
                self.room.handle_shot(id, shot);
            }
        }
        self.player_count
            .store(self.room.human_count(), Ordering::Relaxed);
        if let Some(done) = left {
            // The leaver may have disconnected already
            let _ = done.send(());
        }
    }
}
