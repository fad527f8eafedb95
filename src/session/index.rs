//! Index of every game session found on disk
//!
//! The index is built once from all info files and then updated in place.
//! Startup indexing goes through the same `add_save` path as live saves, so a
//! session looks the same whether it was loaded cold or built up while playing.

use crate::save::types::SaveInfo;

use super::info::GameSessionInfo;

#[derive(Debug, Clone, Default)]
pub struct GameSessionIndex {
    sessions: Vec<GameSessionInfo>,
}

impl GameSessionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups saves into sessions by display name, then sorts sessions by last played
    ///
    /// Saves are applied in the order given (file discovery order).
    pub fn build<I, F>(saves: I, is_supported: F) -> Self
    where
        I: IntoIterator<Item = SaveInfo>,
        F: Fn(&SaveInfo) -> bool,
    {
        let mut sessions: Vec<GameSessionInfo> = Vec::new();
        for save in saves {
            let supported = is_supported(&save);
            match sessions
                .iter_mut()
                .find(|session| session.display_name() == save.session_name)
            {
                Some(session) => session.add_save(save, supported),
                None => sessions.push(GameSessionInfo::from_save(save, supported)),
            }
        }

        let mut index = GameSessionIndex { sessions };
        index.sort_by_last_played();
        index
    }

    /// Sessions, most recently played first
    pub fn sessions(&self) -> &[GameSessionInfo] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn find(&self, display_name: &str) -> Option<&GameSessionInfo> {
        self.sessions.iter().find(|s| s.display_name() == display_name)
    }

    pub fn find_mut(&mut self, display_name: &str) -> Option<&mut GameSessionInfo> {
        self.sessions.iter_mut().find(|s| s.display_name() == display_name)
    }

    /// Most recently played session that can be loaded by this version
    ///
    /// Among sessions last played at the same time, the one listed last wins.
    pub fn find_latest_supported(&self) -> Option<&GameSessionInfo> {
        let mut latest: Option<&GameSessionInfo> = None;
        for session in self.sessions.iter().filter(|s| s.is_supported()) {
            match latest {
                Some(best) if best.last_played() > session.last_played() => {}
                _ => latest = Some(session),
            }
        }
        latest
    }

    /// Records a freshly written save
    ///
    /// A file name names one pair of files on disk, so a previous save with
    /// the same name is dropped from whichever session held it. Sessions left
    /// empty by that are removed. The receiving session is then placed by its
    /// last played date, ahead of sessions played at the same time.
    pub fn add_save(&mut self, save: SaveInfo, is_supported: bool) -> &GameSessionInfo {
        let position = self
            .sessions
            .iter()
            .position(|s| s.display_name() == save.session_name);

        let mut session = match position {
            Some(index) => self.sessions.remove(index),
            None => GameSessionInfo::new(save.session_name.clone(), ""),
        };
        session.remove_saves_named(&save.file_name);
        for other in &mut self.sessions {
            other.remove_saves_named(&save.file_name);
        }
        self.sessions.retain(|s| !s.saves().is_empty());
        session.add_save(save, is_supported);

        let index = self.insert_by_last_played(session);
        &self.sessions[index]
    }

    /// Forgets a deleted save; a session left without saves is dropped
    ///
    /// The session moves back to its place by last played date. Returns false
    /// if no session held the save.
    pub fn remove_save(&mut self, save: &SaveInfo) -> bool {
        let Some(index) = self
            .sessions
            .iter()
            .position(|s| s.display_name() == save.session_name)
        else {
            return false;
        };

        if !self.sessions[index].remove_save(save) {
            return false;
        }
        let session = self.sessions.remove(index);
        if !session.saves().is_empty() {
            self.insert_by_last_played(session);
        }
        true
    }

    fn insert_by_last_played(&mut self, session: GameSessionInfo) -> usize {
        let index = self
            .sessions
            .iter()
            .position(|existing| existing.last_played() <= session.last_played())
            .unwrap_or(self.sessions.len());
        self.sessions.insert(index, session);
        index
    }

    fn sort_by_last_played(&mut self) {
        self.sessions
            .sort_by(|a, b| b.last_played().cmp(&a.last_played()));
    }
}
