//! WebSocket protocol and sessions

pub mod connection;
pub mod handler;
pub mod protocol;
