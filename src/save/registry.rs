//! Live set of saveable entities
//!
//! Registries stay small (tens of entities), so every lookup is a linear scan
//! in registration order.

use std::rc::Rc;

use super::manager::SESSION_ENTITY_ID;
use super::saveable::{EntityHandle, WeakEntityHandle};
use super::types::SaveError;

struct RegisteredEntity {
    /// Cached at registration; entity ids never change
    id: String,
    handle: WeakEntityHandle,
}

#[derive(Default)]
pub struct EntityRegistry {
    entries: Vec<RegisteredEntity>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity to the live set
    ///
    /// Returns an error if a live entity with the same id is already registered.
    /// The session record id is always taken.
    pub fn register(&mut self, entity: EntityHandle) -> Result<(), SaveError> {
        self.prune_dropped();

        let id = entity.borrow().entity_id().to_string();
        if id == SESSION_ENTITY_ID || self.entries.iter().any(|entry| entry.id == id) {
            return Err(SaveError::DuplicateEntityId(id));
        }

        log::debug!("Registered entity '{}'", id);
        self.entries.push(RegisteredEntity {
            id,
            handle: Rc::downgrade(&entity),
        });
        Ok(())
    }

    /// Removes every entity that is not persistent (and every dropped one)
    ///
    /// Returns how many entries were removed.
    pub fn purge_non_persistent(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| {
            entry
                .handle
                .upgrade()
                .is_some_and(|entity| entity.borrow().is_persistent())
        });
        before - self.entries.len()
    }

    /// Live entities in registration order
    pub fn entities(&self) -> Vec<EntityHandle> {
        self.entries
            .iter()
            .filter_map(|entry| entry.handle.upgrade())
            .collect()
    }

    pub fn find_by_id(&self, id: &str) -> Option<EntityHandle> {
        self.entries
            .iter()
            .filter(|entry| entry.id == id)
            .find_map(|entry| entry.handle.upgrade())
    }

    /// First live entity whose type tag matches
    pub fn find_by_type(&self, type_tag: &str) -> Option<EntityHandle> {
        self.entries
            .iter()
            .filter_map(|entry| entry.handle.upgrade())
            .find(|entity| entity.borrow().type_tag() == type_tag)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.handle.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune_dropped(&mut self) {
        self.entries.retain(|entry| entry.handle.strong_count() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::saveable::{Saveable, entity_handle};
    use crate::save::types::SaveData;
    use crate::save::version::GameVersion;

    struct Counter {
        id: &'static str,
        persistent: bool,
    }

    impl Saveable for Counter {
        fn entity_id(&self) -> &str {
            self.id
        }

        fn is_persistent(&self) -> bool {
            self.persistent
        }

        fn save(&self) -> Result<SaveData, SaveError> {
            SaveData::new(self.id, self.type_tag(), &0)
        }

        fn load(&mut self, _data: &SaveData, _version: &GameVersion) -> Result<(), SaveError> {
            Ok(())
        }
    }

    struct Marker;

    impl Saveable for Marker {
        fn entity_id(&self) -> &str {
            "marker"
        }

        fn save(&self) -> Result<SaveData, SaveError> {
            SaveData::new("marker", self.type_tag(), &())
        }

        fn load(&mut self, _data: &SaveData, _version: &GameVersion) -> Result<(), SaveError> {
            Ok(())
        }
    }

    fn counter(id: &'static str, persistent: bool) -> EntityHandle {
        entity_handle(Counter { id, persistent })
    }

    #[test]
    fn test_register_and_find() {
        let mut registry = EntityRegistry::new();
        let a = counter("a", false);
        let b = counter("b", true);
        registry.register(a.clone()).unwrap();
        registry.register(b.clone()).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(Rc::ptr_eq(&registry.find_by_id("b").unwrap(), &b));
        assert!(registry.find_by_id("c").is_none());

        let ids: Vec<String> = registry
            .entities()
            .iter()
            .map(|e| e.borrow().entity_id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut registry = EntityRegistry::new();
        let first = counter("player", false);
        let second = counter("player", true);
        registry.register(first.clone()).unwrap();

        let err = registry.register(second).unwrap_err();
        assert!(matches!(err, SaveError::DuplicateEntityId(id) if id == "player"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_session_record_id_is_reserved() {
        let mut registry = EntityRegistry::new();
        let impostor = counter(SESSION_ENTITY_ID, true);

        let err = registry.register(impostor.clone()).unwrap_err();
        assert!(matches!(err, SaveError::DuplicateEntityId(id) if id == SESSION_ENTITY_ID));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dropped_entity_frees_its_id() {
        let mut registry = EntityRegistry::new();
        let first = counter("player", false);
        registry.register(first.clone()).unwrap();
        drop(first);

        assert!(registry.is_empty());
        registry.register(counter("player", false)).unwrap();
    }

    #[test]
    fn test_purge_keeps_only_persistent() {
        let mut registry = EntityRegistry::new();
        let scene_object = counter("crate", false);
        let profile = counter("profile", true);
        registry.register(scene_object.clone()).unwrap();
        registry.register(profile.clone()).unwrap();

        assert_eq!(registry.purge_non_persistent(), 1);
        assert!(registry.find_by_id("crate").is_none());
        assert!(registry.find_by_id("profile").is_some());
    }

    #[test]
    fn test_find_by_type() {
        let mut registry = EntityRegistry::new();
        let a = counter("a", false);
        let marker: EntityHandle = entity_handle(Marker);
        registry.register(a.clone()).unwrap();
        registry.register(marker.clone()).unwrap();

        let found = registry.find_by_type(crate::save::saveable::type_tag::<Marker>()).unwrap();
        assert!(Rc::ptr_eq(&found, &marker));
        assert!(registry.find_by_type("does::not::Exist").is_none());
    }
}
