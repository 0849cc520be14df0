//! Snapshot building and broadcast

use std::sync::Arc;

use super::room::Room;
use crate::ws::protocol::{PlayerSnapshot, ServerMsg};

impl Room {
    /// Full `state` message: every human followed by every bot
    pub fn snapshot(&self) -> ServerMsg {
        let players: Vec<PlayerSnapshot> = self.combatants().map(|c| c.snapshot()).collect();
        ServerMsg::State {
            map_id: self.map().id.clone(),
            players,
        }
    }

    /// Send the current snapshot to every human. Rooms without humans are
    /// skipped entirely. Returns the number of recipients.
    pub fn broadcast_snapshot(&self) -> usize {
        if !self.has_humans() {
            return 0;
        }
        let msg = Arc::new(self.snapshot());
        self.broadcast_except(&msg, None);
        self.human_count()
    }
}
