//! Saveable trait for entities that take part in save/load
//!
//! Any component with state worth keeping implements this trait and registers
//! itself with the `SaveManager`. The manager never owns entities: it keeps weak
//! handles, so dropping an entity is enough to take it out of future saves.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::types::{SaveData, SaveError};
use super::version::GameVersion;

/// Shared handle the host keeps for a registered entity
pub type EntityHandle = Rc<RefCell<dyn Saveable>>;

/// Non-owning handle stored by the registry
pub type WeakEntityHandle = Weak<RefCell<dyn Saveable>>;

/// Trait for entities that can be saved and loaded
///
/// # Example
///
/// ```ignore
/// impl Saveable for Inventory {
///     fn entity_id(&self) -> &str { "inventory" }
///
///     fn load_after(&self) -> Vec<&'static str> {
///         vec![type_tag::<Player>()]
///     }
///
///     fn save(&self) -> Result<SaveData, SaveError> {
///         SaveData::new(self.entity_id(), self.type_tag(), &self.slots)
///     }
///
///     fn load(&mut self, data: &SaveData, _version: &GameVersion) -> Result<(), SaveError> {
///         self.slots = data.parse()?;
///         Ok(())
///     }
/// }
/// ```
pub trait Saveable {
    /// Stable identifier, unique among registered entities
    fn entity_id(&self) -> &str;

    /// Persistent entities survive `on_context_exit`
    fn is_persistent(&self) -> bool {
        false
    }

    /// Kind of entity, matched against other entities' `load_after` lists
    fn type_tag(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Type tags of entities that must be loaded before this one
    fn load_after(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Snapshot the current state
    fn save(&self) -> Result<SaveData, SaveError>;

    /// Restore state written by `save`. `game_version` is the version that wrote the save.
    fn load(&mut self, data: &SaveData, game_version: &GameVersion) -> Result<(), SaveError>;
}

/// Type tag used by the default `Saveable::type_tag` for `T`
pub fn type_tag<T: ?Sized>() -> &'static str {
    std::any::type_name::<T>()
}

/// Wraps a value into a handle that can be registered
pub fn entity_handle<T: Saveable + 'static>(entity: T) -> Rc<RefCell<T>> {
    Rc::new(RefCell::new(entity))
}
