//! Arena Server - authoritative multiplayer arena shooter
//!
//! The server owns all gameplay truth for connected clients and for
//! server-side bots:
//! - one actor task per map room, driven by client commands and two timers
//! - hitscan resolution against head/body hurtboxes, occluded by map geometry
//! - instant respawn, kill/death bookkeeping and persistent profiles
//! - WebSocket sessions plus a small HTTP surface for health and profiles

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod store;
pub mod util;
pub mod ws;
