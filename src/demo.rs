//! Sample entities used by the command-line demo
//!
//! A player, the player's inventory and the items lying around the current
//! scene. The inventory needs the player loaded first (it is sized by the
//! player's level), and dropped items are scene objects that do not survive
//! a context exit.

use savekit::save::codec::map_entries;
use savekit::save::codec::value_types::Vec2Int;
use savekit::save::{GameVersion, SaveData, SaveError, Saveable, type_tag};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub position: Vec2Int,
    pub level: u32,
    pub health: f32,
}

impl Default for Player {
    fn default() -> Self {
        Player {
            name: "Adventurer".to_string(),
            position: Vec2Int::new(0, 0),
            level: 1,
            health: 100.0,
        }
    }
}

impl Saveable for Player {
    fn entity_id(&self) -> &str {
        "player"
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn save(&self) -> Result<SaveData, SaveError> {
        SaveData::new(self.entity_id(), self.type_tag(), self)
    }

    fn load(&mut self, data: &SaveData, _game_version: &GameVersion) -> Result<(), SaveError> {
        if data.entity_type != self.type_tag() {
            return Err(SaveError::CorruptedData(format!(
                "Expected player data, got {}",
                data.entity_type
            )));
        }
        *self = data.parse()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemStack {
    pub item_id: String,
    pub quantity: u32,
}

/// Player inventory; its size depends on the player's level
pub struct Inventory {
    pub slots: Vec<Option<ItemStack>>,
    player: Rc<RefCell<Player>>,
}

#[derive(Serialize, Deserialize)]
struct InventoryData {
    slots: Vec<Option<ItemStack>>,
}

impl Inventory {
    pub fn new(player: Rc<RefCell<Player>>) -> Self {
        let capacity = Self::capacity_for(player.borrow().level);
        Inventory {
            slots: vec![None; capacity],
            player,
        }
    }

    fn capacity_for(level: u32) -> usize {
        9 + 3 * level.saturating_sub(1) as usize
    }

    /// Adds to an existing stack or the first empty slot
    pub fn add(&mut self, item_id: &str, quantity: u32) -> bool {
        if let Some(stack) = self
            .slots
            .iter_mut()
            .flatten()
            .find(|stack| stack.item_id == item_id)
        {
            stack.quantity += quantity;
            return true;
        }
        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(ItemStack {
                    item_id: item_id.to_string(),
                    quantity,
                });
                true
            }
            None => false,
        }
    }
}

impl Saveable for Inventory {
    fn entity_id(&self) -> &str {
        "player_inventory"
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn load_after(&self) -> Vec<&'static str> {
        vec![type_tag::<Player>()]
    }

    fn save(&self) -> Result<SaveData, SaveError> {
        let data = InventoryData {
            slots: self.slots.clone(),
        };
        SaveData::new(self.entity_id(), self.type_tag(), &data)
    }

    fn load(&mut self, data: &SaveData, _game_version: &GameVersion) -> Result<(), SaveError> {
        let saved: InventoryData = data.parse()?;
        let capacity = Self::capacity_for(self.player.borrow().level);
        if saved.slots.len() > capacity {
            log::warn!(
                "Saved inventory has {} slots, player level allows {}; extra slots dropped",
                saved.slots.len(),
                capacity
            );
        }
        self.slots = saved.slots.into_iter().take(capacity).collect();
        self.slots.resize(capacity, None);
        Ok(())
    }
}

/// Items lying on the ground in the current scene
#[derive(Default)]
pub struct DroppedItems {
    pub items: BTreeMap<Vec2Int, ItemStack>,
}

#[derive(Serialize, Deserialize)]
struct DroppedItemsData {
    #[serde(with = "map_entries")]
    items: BTreeMap<Vec2Int, ItemStack>,
}

impl Saveable for DroppedItems {
    fn entity_id(&self) -> &str {
        "dropped_items"
    }

    fn save(&self) -> Result<SaveData, SaveError> {
        let data = DroppedItemsData {
            items: self.items.clone(),
        };
        SaveData::new(self.entity_id(), self.type_tag(), &data)
    }

    fn load(&mut self, data: &SaveData, _game_version: &GameVersion) -> Result<(), SaveError> {
        let saved: DroppedItemsData = data.parse()?;
        self.items = saved.items;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use savekit::save::{MemoryStore, SaveManager, SaveSettings, entity_handle};

    #[test]
    fn test_inventory_loads_after_player_level() {
        let player = entity_handle(Player::default());
        let inventory = entity_handle(Inventory::new(player.clone()));
        player.borrow_mut().level = 3;
        inventory.borrow_mut().slots.resize(Inventory::capacity_for(3), None);
        inventory.borrow_mut().add("slime_ball", 5);
        inventory.borrow_mut().add("slime_ball", 2);

        let mut manager = SaveManager::new(SaveSettings::with_root("/demo"), MemoryStore::new()).unwrap();
        // Inventory registered first on purpose: the load order must still put the player first
        manager.register_entity(inventory.clone()).unwrap();
        manager.register_entity(player.clone()).unwrap();
        manager.start_session("Demo");
        let save = manager.save_file("Slot 1").unwrap();

        player.borrow_mut().level = 1;
        inventory.borrow_mut().slots = vec![None; 9];

        let report = manager.run_load(&save).unwrap();
        assert_eq!(report.loaded, vec!["player", "player_inventory"]);
        assert_eq!(inventory.borrow().slots.len(), 15);
        assert_eq!(
            inventory.borrow().slots[0],
            Some(ItemStack {
                item_id: "slime_ball".to_string(),
                quantity: 7
            })
        );
    }

    #[test]
    fn test_dropped_items_do_not_survive_context_exit() {
        let dropped = entity_handle(DroppedItems::default());
        let player = entity_handle(Player::default());
        let mut manager = SaveManager::new(SaveSettings::with_root("/demo"), MemoryStore::new()).unwrap();
        manager.register_entity(dropped.clone()).unwrap();
        manager.register_entity(player.clone()).unwrap();

        manager.on_context_exit();
        assert!(manager.entities().find_by_id("dropped_items").is_none());
        assert!(manager.entities().find_by_id("player").is_some());
    }

    #[test]
    fn test_records_carry_type_tags() {
        let player = entity_handle(Player::default());
        let inventory = Inventory::new(player.clone());

        assert_eq!(player.borrow().save().unwrap().entity_type, type_tag::<Player>());
        assert_eq!(inventory.save().unwrap().entity_type, type_tag::<Inventory>());
        assert_eq!(inventory.load_after(), vec![type_tag::<Player>()]);
    }

    #[test]
    fn test_player_rejects_foreign_record() {
        let mut player = Player::default();
        let record = SaveData::new("player", "slime", &Player::default()).unwrap();
        let err = player.load(&record, &GameVersion::default()).unwrap_err();
        assert!(matches!(err, SaveError::CorruptedData(_)));
    }
}
