//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{MapCatalog, RoomRegistry};
use crate::store::ProfileStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub profiles: Arc<dyn ProfileStore>,
    pub rooms: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(config: Config, catalog: MapCatalog, profiles: Arc<dyn ProfileStore>) -> Self {
        let config = Arc::new(config);

        // Rooms share the profile store with the HTTP routes
        let rooms = Arc::new(RoomRegistry::new(
            Arc::new(catalog),
            profiles.clone(),
            config.room_settings(),
        ));

        Self {
            config,
            profiles,
            rooms,
        }
    }
}
