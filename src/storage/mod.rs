//! Persistent key-value storage.
//!
//! The engine keeps three seen-entry indices and the filter settings in a
//! single key-value store. Values are JSON documents; the store itself has no
//! knowledge of their shape.
//!
//! - [`FilesystemStore`]: one JSON document on disk, written atomically
//! - [`MemoryStore`]: in-process map for tests and ephemeral sessions

mod filesystem;
mod memory;
mod privacy;
mod settings;
mod traits;

pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;
pub use privacy::{PrivacyModeProbe, StaticPrivacyMode};
pub use settings::SettingsSource;
pub use traits::{KeyValueStore, Record};
