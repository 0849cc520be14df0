//! Profile storage

pub mod file;
pub mod profiles;

pub use file::FileProfileStore;
pub use profiles::{MemoryProfileStore, Profile, ProfileStore, StoreError};
