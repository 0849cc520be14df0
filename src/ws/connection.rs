//! Outbound half of a client connection, as seen by the game core

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::game::CombatantId;
use crate::ws::protocol::ServerMsg;

/// Messages buffered per client before new ones are dropped
pub const OUTBOUND_CAPACITY: usize = 256;

/// Non-blocking handle used by room actors to reach one client.
///
/// The socket writer task owns the receiving end; when it exits the handle
/// simply stops delivering.
#[derive(Debug, Clone)]
pub struct Connection {
    player_id: CombatantId,
    tx: mpsc::Sender<Arc<ServerMsg>>,
}

impl Connection {
    pub fn new(player_id: CombatantId, tx: mpsc::Sender<Arc<ServerMsg>>) -> Self {
        Self { player_id, tx }
    }

    /// Create a handle together with its receiving end
    pub fn channel(player_id: CombatantId) -> (Self, mpsc::Receiver<Arc<ServerMsg>>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        (Self::new(player_id, tx), rx)
    }

    /// Queue a message without waiting. Returns false if it was dropped.
    pub fn send(&self, msg: Arc<ServerMsg>) -> bool {
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(player_id = self.player_id, "Outbound queue full, dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(player_id = self.player_id, "Connection closed, dropping message");
                false
            }
        }
    }
}
