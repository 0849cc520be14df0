//! Game simulation modules

pub mod actor;
pub mod bot;
pub mod combat;
pub mod combatant;
pub mod damage;
pub mod geometry;
pub mod map;
pub mod physics;
pub mod registry;
pub mod room;
pub mod snapshot;

pub use actor::{RoomCommand, RoomHandle, RoomSettings};
pub use combatant::CombatantId;
pub use map::MapCatalog;
pub use registry::{IdGenerator, RoomRegistry};
pub use room::{JoinRequest, Room, StateUpdate};
