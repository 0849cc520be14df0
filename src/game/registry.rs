//! Room registry and id allocation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::actor::{RoomActor, RoomHandle, RoomSettings};
use super::combatant::CombatantId;
use super::map::{MapCatalog, MapConfig};
use super::room::Room;
use crate::store::ProfileStore;

/// Monotonic combatant ids shared by humans and bots. Ids are never reused.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> CombatantId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// All rooms, keyed by canonical map id. Rooms are created on first use and
/// live for the rest of the process.
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
    catalog: Arc<MapCatalog>,
    profiles: Arc<dyn ProfileStore>,
    ids: Arc<IdGenerator>,
    settings: RoomSettings,
}

impl RoomRegistry {
    pub fn new(
        catalog: Arc<MapCatalog>,
        profiles: Arc<dyn ProfileStore>,
        settings: RoomSettings,
    ) -> Self {
        Self {
            rooms: DashMap::new(),
            catalog,
            profiles,
            ids: Arc::new(IdGenerator::new()),
            settings,
        }
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    pub fn catalog(&self) -> &MapCatalog {
        &self.catalog
    }

    /// Room for a map id, starting it if needed. Unknown ids resolve to the
    /// default map. Must be called from within a tokio runtime.
    pub fn get_or_create(&self, requested: Option<&str>) -> RoomHandle {
        let id = self.catalog.canonical_id(requested);
        self.rooms
            .entry(id.to_string())
            .or_insert_with(|| self.start_room(self.catalog.get(Some(id))))
            .value()
            .clone()
    }

    fn start_room(&self, map: Arc<MapConfig>) -> RoomHandle {
        let rng = self.settings.rng_for(&map.id);
        let room = Room::new(
            map,
            self.profiles.clone(),
            rng,
            self.settings.bot_count,
            &self.ids,
        );
        let (actor, handle) = RoomActor::new(room, self.settings.clone());
        tokio::spawn(actor.run());
        handle
    }

    pub fn get(&self, id: &str) -> Option<RoomHandle> {
        self.rooms.get(id).map(|r| r.value().clone())
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.iter().map(|r| r.value().player_count()).sum()
    }
}
