//! Player profile management
//!
//! The game core only talks to profiles through the [`ProfileStore`] trait.
//! Every method is synchronous and touches memory only, so room actors can
//! call it on the hot path; persistence (if any) happens elsewhere.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persistent cross-session identity of a human player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub nickname: String,
    pub class: String,
    #[serde(default)]
    pub total_kills: u64,
    #[serde(default)]
    pub total_deaths: u64,
    #[serde(default)]
    pub matches: u64,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Profile store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Profile storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Profile serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Port between the game core and whatever keeps profiles
pub trait ProfileStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    /// Fetch the profile for `id`, refreshing its nickname/class, or create
    /// a new one (with a fresh id when `id` is `None` or unknown-and-empty).
    fn upsert(
        &self,
        id: Option<&str>,
        nickname: Option<&str>,
        class: Option<&str>,
    ) -> Result<Profile, StoreError>;

    fn increment_kills(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    fn increment_deaths(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    /// Zero the counters. `Ok(None)` when the profile does not exist.
    fn reset(&self, id: &str) -> Result<Option<Profile>, StoreError>;
}

/// Plain map of profiles with the mutation rules shared by every store
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileBook {
    profiles: HashMap<String, Profile>,
}

impl ProfileBook {
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }

    pub fn upsert(&mut self, id: Option<&str>, nickname: Option<&str>, class: Option<&str>) -> Profile {
        let nickname = nickname.filter(|s| !s.is_empty());
        let class = class.filter(|s| !s.is_empty());

        if let Some(existing) = id.and_then(|id| self.profiles.get_mut(id)) {
            if let Some(name) = nickname {
                existing.nickname = name.to_string();
            }
            if let Some(class) = class {
                existing.class = class.to_string();
            }
            existing.updated_at = Utc::now();
            return existing.clone();
        }

        let id = match id.filter(|s| !s.is_empty()) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        let profile = Profile {
            nickname: nickname
                .map(str::to_string)
                .unwrap_or_else(|| format!("Player_{}", id.chars().take(5).collect::<String>())),
            class: class.unwrap_or("assault").to_string(),
            id: id.clone(),
            total_kills: 0,
            total_deaths: 0,
            matches: 0,
            updated_at: Utc::now(),
        };
        self.profiles.insert(id, profile.clone());
        profile
    }

    /// Apply `f` to an existing profile and return the result
    pub fn modify(&mut self, id: &str, f: impl FnOnce(&mut Profile)) -> Option<Profile> {
        let profile = self.profiles.get_mut(id)?;
        f(profile);
        profile.updated_at = Utc::now();
        Some(profile.clone())
    }
}

/// Volatile store, used by tests and when persistence is not wanted
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    book: RwLock<ProfileBook>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.book.read().get(id).cloned())
    }

    fn upsert(
        &self,
        id: Option<&str>,
        nickname: Option<&str>,
        class: Option<&str>,
    ) -> Result<Profile, StoreError> {
        Ok(self.book.write().upsert(id, nickname, class))
    }

    fn increment_kills(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.book.write().modify(id, |p| p.total_kills += 1))
    }

    fn increment_deaths(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.book.write().modify(id, |p| p.total_deaths += 1))
    }

    fn reset(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.book.write().modify(id, reset_counters))
    }
}

pub(crate) fn reset_counters(profile: &mut Profile) {
    profile.total_kills = 0;
    profile.total_deaths = 0;
    profile.matches = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_creates_with_defaults() {
        let store = MemoryProfileStore::new();
        let profile = store.upsert(None, None, None).unwrap();
        assert_eq!(profile.class, "assault");
        assert!(profile.nickname.starts_with("Player_"));
        assert_eq!(profile.nickname.len(), "Player_".len() + 5);
        assert_eq!(store.get(&profile.id).unwrap(), Some(profile));
    }

    #[test]
    fn upsert_updates_existing_but_keeps_counters() {
        let store = MemoryProfileStore::new();
        let created = store.upsert(Some("abc"), Some("Neo"), Some("sniper")).unwrap();
        store.increment_kills("abc").unwrap();

        let updated = store.upsert(Some("abc"), Some("Trinity"), None).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.nickname, "Trinity");
        assert_eq!(updated.class, "sniper");
        assert_eq!(updated.total_kills, 1);
    }

    #[test]
    fn counters_and_reset() {
        let store = MemoryProfileStore::new();
        store.upsert(Some("p1"), Some("Neo"), None).unwrap();
        store.increment_kills("p1").unwrap();
        store.increment_kills("p1").unwrap();
        let p = store.increment_deaths("p1").unwrap().unwrap();
        assert_eq!((p.total_kills, p.total_deaths), (2, 1));

        let p = store.reset("p1").unwrap().unwrap();
        assert_eq!((p.total_kills, p.total_deaths, p.matches), (0, 0, 0));
    }

    #[test]
    fn unknown_ids_are_not_created_by_counters() {
        let store = MemoryProfileStore::new();
        assert!(store.increment_kills("ghost").unwrap().is_none());
        assert!(store.reset("ghost").unwrap().is_none());
        assert!(store.get("ghost").unwrap().is_none());
    }
}
