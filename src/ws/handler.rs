//! WebSocket upgrade handler and per-connection session

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::game::combat::{ShotRequest, DEFAULT_WEAPON};
use crate::game::room::DEFAULT_GAMEMODE;
use crate::game::{CombatantId, JoinRequest, RoomCommand, RoomHandle, StateUpdate};
use crate::store::Profile;
use crate::ws::connection::Connection;
use crate::ws::protocol::{ClientMsg, ServerMsg};

const DEFAULT_CLASS: &str = "assault";

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let player_id = state.rooms.ids().next_id();
    info!(player_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (conn, outbound_rx) = Connection::channel(player_id);

    // Writer task: room messages -> WebSocket
    let writer_handle = tokio::spawn(write_loop(player_id, ws_sink, outbound_rx));

    let mut session = Session {
        player_id,
        conn,
        room: None,
        profile_id: None,
        state,
    };
    session.read_loop(ws_stream).await;

    // Cleanup on disconnect
    session.detach().await;
    writer_handle.abort();

    info!(player_id, "WebSocket connection closed");
}

async fn write_loop(
    player_id: CombatantId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Arc<ServerMsg>>,
) {
    while let Some(msg) = outbound_rx.recv().await {
        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(player_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// One connected client
struct Session {
    player_id: CombatantId,
    /// Outbound handle, cloned into whichever room the player joins
    conn: Connection,
    room: Option<RoomHandle>,
    profile_id: Option<String>,
    state: AppState,
}

impl Session {
    async fn read_loop(&mut self, mut ws_stream: SplitStream<WebSocket>) {
        let player_id = self.player_id;
        while let Some(result) = ws_stream.next().await {
            match result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => self.dispatch(msg).await,
                    Err(e) => {
                        debug!(player_id, error = %e, "Dropping malformed client message");
                    }
                },
                Ok(Message::Binary(_)) => {
                    debug!(player_id, "Received binary message, ignoring");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    debug!(player_id, "Client initiated close");
                    break;
                }
                Err(e) => {
                    debug!(player_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    }

    async fn dispatch(&mut self, msg: ClientMsg) {
        match msg {
            ClientMsg::Join {
                nickname,
                map,
                primary,
                secondary: _,
                profile_id,
                class,
                gamemode,
            } => {
                self.join(nickname, map, primary, profile_id, class, gamemode)
                    .await;
            }
            ClientMsg::State {
                x,
                y,
                z,
                rot_y,
                weapon,
            } => {
                let update = StateUpdate {
                    x,
                    y,
                    z,
                    rot_y,
                    weapon,
                };
                self.forward(|id| RoomCommand::State { id, update }).await;
            }
            ClientMsg::Shot {
                origin,
                dir,
                damage,
                range,
            } => match ShotRequest::from_payload(origin, dir, damage, range) {
                Some(shot) => self.forward(|id| RoomCommand::Shot { id, shot }).await,
                None => debug!(player_id = self.player_id, "Dropping shot without origin or direction"),
            },
            ClientMsg::ResetProfile => self.reset_profile(),
        }
    }

    /// Send a command to the current room, if any
    async fn forward(&self, make: impl FnOnce(CombatantId) -> RoomCommand) {
        match &self.room {
            Some(room) => {
                if !room.send(make(self.player_id)).await {
                    warn!(player_id = self.player_id, room = %room.id, "Room is gone");
                }
            }
            None => debug!(player_id = self.player_id, "Dropping message before join"),
        }
    }

    async fn join(
        &mut self,
        nickname: Option<String>,
        map: Option<String>,
        primary: Option<String>,
        profile_id: Option<String>,
        class: Option<String>,
        gamemode: Option<String>,
    ) {
        let nickname = non_empty(nickname);
        let class = non_empty(class);

        let profile = match self.state.profiles.upsert(
            non_empty(profile_id).as_deref(),
            nickname.as_deref(),
            class.as_deref(),
        ) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(player_id = self.player_id, error = %e, "Failed to load profile");
                None
            }
        };

        let nickname = profile
            .as_ref()
            .map(|p| p.nickname.clone())
            .filter(|n| !n.is_empty())
            .or(nickname)
            .unwrap_or_else(|| format!("Player{}", self.player_id));
        let class = profile
            .as_ref()
            .map(|p| p.class.clone())
            .filter(|c| !c.is_empty())
            .or(class)
            .unwrap_or_else(|| DEFAULT_CLASS.to_string());

        let room = self.state.rooms.get_or_create(map.as_deref());
        if let Some(old) = self.room.as_ref().filter(|old| old.id != room.id) {
            info!(player_id = self.player_id, from = %old.id, to = %room.id, "Player switching rooms");
            // Out of the old room before entering the new one
            old.leave(self.player_id).await;
        }

        self.profile_id = profile.as_ref().map(|p: &Profile| p.id.clone());
        let req = JoinRequest {
            id: self.player_id,
            conn: self.conn.clone(),
            nickname,
            class,
            gamemode: non_empty(gamemode).unwrap_or_else(|| DEFAULT_GAMEMODE.to_string()),
            weapon: non_empty(primary).unwrap_or_else(|| DEFAULT_WEAPON.to_string()),
            profile,
        };
        if !room.send(RoomCommand::Join(req)).await {
            warn!(player_id = self.player_id, room = %room.id, "Room is gone");
        }
        self.room = Some(room);
    }

    fn reset_profile(&self) {
        let Some(profile_id) = self.profile_id.as_deref() else {
            debug!(player_id = self.player_id, "Reset requested without a profile");
            return;
        };
        match self.state.profiles.reset(profile_id) {
            Ok(Some(profile)) => {
                self.conn.send(Arc::new(ServerMsg::Profile { profile }));
            }
            Ok(None) => debug!(profile_id, "Reset requested for unknown profile"),
            Err(e) => warn!(profile_id, error = %e, "Failed to reset profile"),
        }
    }

    /// Remove the player from their room
    async fn detach(&mut self) {
        if let Some(room) = self.room.take() {
            room.leave(self.player_id).await;
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
