//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::game::RoomSettings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Snapshot broadcast period (milliseconds)
    pub broadcast_interval_ms: u64,
    /// Bot AI period (milliseconds)
    pub bot_think_ms: u64,
    /// Bots seeded into every new room
    pub bot_count: usize,
    /// Fixed RNG seed for reproducible rooms
    pub rng_seed: Option<u64>,

    /// Where profiles are persisted
    pub profile_path: PathBuf,
    /// Map catalog JSON; built-in maps when unset
    pub map_config_path: Option<PathBuf>,
    /// Allowed client origins for CORS, comma-separated. Unset or `*` allows any.
    pub client_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: "info".to_string(),
            broadcast_interval_ms: 50,
            bot_think_ms: 200,
            bot_count: 14,
            rng_seed: None,
            profile_path: PathBuf::from("profiles.json"),
            map_config_path: None,
            client_origin: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; missing keys take defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match (lookup("PORT"), lookup("SERVER_ADDR")) {
            (Some(port), _) => format!("0.0.0.0:{}", port)
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            (None, Some(addr)) => addr.parse().map_err(|_| ConfigError::InvalidAddress)?,
            (None, None) => defaults.server_addr,
        };

        let interval = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match parse(&lookup, name)? {
                Some(0) => Err(ConfigError::Invalid(name, "0".to_string())),
                Some(ms) => Ok(ms),
                None => Ok(default),
            }
        };

        Ok(Self {
            server_addr,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            broadcast_interval_ms: interval("BROADCAST_INTERVAL_MS", defaults.broadcast_interval_ms)?,
            bot_think_ms: interval("BOT_THINK_MS", defaults.bot_think_ms)?,
            bot_count: parse(&lookup, "BOT_COUNT")?.unwrap_or(defaults.bot_count),
            rng_seed: parse(&lookup, "RNG_SEED")?,
            profile_path: lookup("PROFILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.profile_path),
            map_config_path: lookup("MAP_CONFIG_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            client_origin: lookup("CLIENT_ORIGIN")
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty() && o != "*"),
        })
    }

    /// Per-room timing and population
    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            broadcast_interval: Duration::from_millis(self.broadcast_interval_ms),
            think_interval: Duration::from_millis(self.bot_think_ms),
            bot_count: self.bot_count,
            seed: self.rng_seed,
        }
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name, raw)),
        None => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),

    #[error("Invalid server address format")]
    InvalidAddress,
}
