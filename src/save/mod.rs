//! Save/Load system
//!
//! This module provides the save/load engine:
//! - Two files per save: a small info record (`.savinfo`) and the entity data (`.sav`)
//! - Saves grouped into game sessions, newest first
//! - Entities restored in dependency order, with cycle detection
//! - Lookups that still find files written under older naming schemes
//!
//! # Architecture
//!
//! - `types`: Save records and error types
//! - `saveable`: Saveable trait for entities
//! - `registry`: the live set of registered entities
//! - `ordering`: dependency-ordered load sequencing
//! - `version`: dotted version parsing and comparison
//! - `file_names`: logical name to physical path, with legacy fallbacks
//! - `store`: byte storage (filesystem or memory)
//! - `codec`: JSON encoding and value-type wire formats
//! - `settings`: paths, extensions and version limits
//! - `load`: queued loads, cancellation and load reports
//! - `manager`: SaveManager, which ties it all together
//!
//! # Example Usage
//!
//! ```ignore
//! let mut saves = SaveManager::open(SaveSettings::default())?;
//! saves.register_entity(player.clone())?;
//! saves.start_session("The Prancing Pony");
//! saves.save_file("Before the dragon")?;
//!
//! // Later: queue the newest playable session and replay it on scene enter
//! saves.quick_load();
//! saves.on_context_enter()?;
//! ```

pub mod codec;
pub mod file_names;
pub mod load;
pub mod manager;
pub mod ordering;
pub mod registry;
pub mod saveable;
pub mod screenshot;
pub mod settings;
pub mod store;
pub mod types;
pub mod version;

// Re-export commonly used types
pub use codec::{Codec, CodecConfig};
pub use file_names::FileNameResolver;
pub use load::{CancelToken, LoadOutcome, LoadReport};
pub use manager::SaveManager;
pub use registry::EntityRegistry;
pub use saveable::{EntityHandle, Saveable, entity_handle, type_tag};
pub use screenshot::{NoScreenshot, Screenshot, ScreenshotSource};
pub use settings::SaveSettings;
pub use store::{ByteStore, FsStore, MemoryStore};
pub use types::*;
pub use version::{GameVersion, is_version_supported, youngest_version};
