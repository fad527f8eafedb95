//! One game session and the saves it contains

use crate::save::screenshot::Screenshot;
use crate::save::types::{SaveInfo, SaveTimestamp};
use crate::save::version::youngest_version;

/// All saves sharing one session display name
///
/// Saves are kept newest first, so the latest save, last played date and
/// representative screenshot all come from the front of the list.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSessionInfo {
    display_name: String,
    saves: Vec<SaveInfo>,
    /// Newest version among the saves
    game_version: String,
    /// Set once any save passes the version check, never cleared
    is_supported: bool,
}

impl GameSessionInfo {
    /// Empty session, e.g. a new game that has not been saved yet
    pub fn new(display_name: impl Into<String>, game_version: impl Into<String>) -> Self {
        GameSessionInfo {
            display_name: display_name.into(),
            saves: Vec::new(),
            game_version: game_version.into(),
            is_supported: false,
        }
    }

    /// Session seeded with its first save
    pub fn from_save(save: SaveInfo, is_supported: bool) -> Self {
        let mut session = Self::new(save.session_name.clone(), save.game_version.clone());
        session.add_save(save, is_supported);
        session
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Saves, newest first
    pub fn saves(&self) -> &[SaveInfo] {
        &self.saves
    }

    pub fn latest_save(&self) -> Option<&SaveInfo> {
        self.saves.first()
    }

    pub fn last_played(&self) -> Option<SaveTimestamp> {
        self.latest_save().map(|save| save.date)
    }

    pub fn screenshot(&self) -> Option<&Screenshot> {
        self.latest_save().and_then(|save| save.screenshot.as_ref())
    }

    pub fn game_version(&self) -> &str {
        &self.game_version
    }

    pub fn is_supported(&self) -> bool {
        self.is_supported
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.game_version = version.into();
    }

    /// Inserts the save before the first save that is not newer than it
    pub fn add_save(&mut self, save: SaveInfo, is_supported: bool) {
        self.game_version = youngest_version(&self.game_version, &save.game_version).to_string();
        self.is_supported |= is_supported;

        let index = self
            .saves
            .iter()
            .position(|existing| existing.date <= save.date)
            .unwrap_or(self.saves.len());
        self.saves.insert(index, save);
    }

    /// Removes one save and recomputes the merged version from what is left
    ///
    /// Returns false if the save was not part of this session.
    pub fn remove_save(&mut self, save: &SaveInfo) -> bool {
        let Some(index) = self.saves.iter().position(|existing| existing == save) else {
            return false;
        };
        self.saves.remove(index);
        self.recompute_version();
        true
    }

    /// Removes every save with this logical file name; returns how many were removed
    pub fn remove_saves_named(&mut self, file_name: &str) -> usize {
        let before = self.saves.len();
        self.saves.retain(|save| save.file_name != file_name);
        let removed = before - self.saves.len();
        if removed > 0 {
            self.recompute_version();
        }
        removed
    }

    fn recompute_version(&mut self) {
        self.game_version = self
            .saves
            .iter()
            .fold(String::new(), |version, save| {
                youngest_version(&version, &save.game_version).to_string()
            });
    }
}
