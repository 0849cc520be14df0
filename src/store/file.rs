//! JSON-file backed profile store
//!
//! Profiles live in memory; every change marks the store dirty and wakes a
//! background flusher that rewrites the file. Room actors therefore never
//! wait on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::profiles::{reset_counters, Profile, ProfileBook, ProfileStore, StoreError};

pub struct FileProfileStore {
    path: PathBuf,
    book: RwLock<ProfileBook>,
    dirty: Notify,
}

impl FileProfileStore {
    /// Load profiles from `path`. A missing or unreadable file yields an
    /// empty store; it is created on the first flush.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let book = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<ProfileBook>(&raw) {
                Ok(book) => book,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt profile file, starting empty");
                    ProfileBook::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ProfileBook::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read profile file, starting empty");
                ProfileBook::default()
            }
        };

        info!(path = %path.display(), profiles = book.len(), "Profile store loaded");

        Self {
            path,
            book: RwLock::new(book),
            dirty: Notify::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Spawn the task that persists changes. Bursts of mutations coalesce
    /// into a single write.
    pub fn spawn_flusher(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                store.dirty.notified().await;
                if let Err(e) = store.flush().await {
                    warn!(path = %store.path.display(), error = %e, "Failed to save profiles");
                }
            }
        })
    }

    /// Write the current contents to disk (temp file + rename)
    pub async fn flush(&self) -> Result<(), StoreError> {
        let json = {
            let book = self.book.read();
            serde_json::to_string_pretty(&*book)?
        };

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), "Profiles saved");
        Ok(())
    }

    /// Update an existing profile. Unknown ids leave the store clean.
    fn modify(&self, id: &str, f: impl FnOnce(&mut Profile)) -> Option<Profile> {
        let updated = self.book.write().modify(id, f);
        if updated.is_some() {
            self.dirty.notify_one();
        }
        updated
    }
}

impl ProfileStore for FileProfileStore {
    fn get(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.book.read().get(id).cloned())
    }

    fn upsert(
        &self,
        id: Option<&str>,
        nickname: Option<&str>,
        class: Option<&str>,
    ) -> Result<Profile, StoreError> {
        let profile = self.book.write().upsert(id, nickname, class);
        self.dirty.notify_one();
        Ok(profile)
    }

    fn increment_kills(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.modify(id, |p| p.total_kills += 1))
    }

    fn increment_deaths(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.modify(id, |p| p.total_deaths += 1))
    }

    fn reset(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.modify(id, reset_counters))
    }
}
