//! Save manager: the entry point for saving and loading
//!
//! This module provides the SaveManager struct which handles:
//! - Writing a save (info file + data file) for the current session
//! - Loading a save back into the registered entities, in dependency order
//! - Quick save / quick load
//! - Deleting saves and keeping the session index in sync
//! - The player settings file, which lives outside the session model
//!
//! The manager is single-threaded. Callers check `loading_in_progress` and
//! must not start overlapping loads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::codec::Codec;
use super::file_names::FileNameResolver;
use super::load::{CancelToken, LoadOutcome, LoadReport, PendingLoad};
use super::ordering::resolve_load_order;
use super::registry::EntityRegistry;
use super::saveable::EntityHandle;
use super::screenshot::{NoScreenshot, ScreenshotSource};
use super::settings::SaveSettings;
use super::store::{ByteStore, FsStore};
use super::types::*;
use super::version::{GameVersion, is_version_supported};
use crate::session::{GameSessionIndex, GameSessionInfo};

/// Entity id of the record that stores the session name in every data file
pub const SESSION_ENTITY_ID: &str = "GameSessionManager";

#[derive(Debug, Serialize, Deserialize)]
struct SessionSaveData {
    name: String,
}

type SavingStartedHook = Box<dyn FnMut()>;

pub struct SaveManager {
    settings: SaveSettings,
    store: Box<dyn ByteStore>,
    codec: Codec,
    files: FileNameResolver,
    screenshots: Box<dyn ScreenshotSource>,
    clock: fn() -> SaveTimestamp,
    entities: EntityRegistry,
    sessions: GameSessionIndex,
    current_session: Option<String>,
    pending_load: Option<PendingLoad>,
    loading_in_progress: bool,
    saving_started: Vec<SavingStartedHook>,
}

impl SaveManager {
    /// Opens the save system on the local filesystem
    pub fn open(settings: SaveSettings) -> Result<Self, SaveError> {
        Self::new(settings, FsStore::new())
    }

    /// Creates a manager over any store, without screenshots and with the default codec
    pub fn new(settings: SaveSettings, store: impl ByteStore + 'static) -> Result<Self, SaveError> {
        Self::with_parts(settings, Box::new(store), Box::new(NoScreenshot), Codec::default())
    }

    /// Creates the save directories and indexes every info file found in them
    pub fn with_parts(
        settings: SaveSettings,
        mut store: Box<dyn ByteStore>,
        screenshots: Box<dyn ScreenshotSource>,
        codec: Codec,
    ) -> Result<Self, SaveError> {
        settings.validate()?;

        let save_folder = settings.save_folder_path();
        store.create_dir(&settings.root_dir)?;
        store.create_dir(&save_folder)?;

        let files = FileNameResolver::new(
            save_folder,
            settings.info_extension.clone(),
            settings.data_extension.clone(),
        );

        let mut manager = SaveManager {
            settings,
            store,
            codec,
            files,
            screenshots,
            clock: SaveTimestamp::now,
            entities: EntityRegistry::new(),
            sessions: GameSessionIndex::new(),
            current_session: None,
            pending_load: None,
            loading_in_progress: false,
            saving_started: Vec::new(),
        };
        manager.index_sessions()?;

        if let Some(name) = manager.settings.default_session_name.clone() {
            manager.start_session(name);
        }
        Ok(manager)
    }

    /// Replaces the clock used to timestamp new saves
    pub fn with_clock(mut self, clock: fn() -> SaveTimestamp) -> Self {
        self.clock = clock;
        self
    }

    fn index_sessions(&mut self) -> Result<(), SaveError> {
        let raw_files = self
            .store
            .list_files(self.files.save_folder(), &self.settings.info_extension)?;

        let mut saves = Vec::with_capacity(raw_files.len());
        for bytes in raw_files {
            match self.codec.decode::<SaveInfo>(&bytes) {
                Ok(info) => saves.push(info),
                Err(e) => log::warn!("Skipping unreadable save info file: {}", e),
            }
        }

        let minimum = self.settings.earliest_supported_version.clone();
        self.sessions = GameSessionIndex::build(saves, |save| {
            is_version_supported(&save.game_version, &minimum)
        });
        log::debug!("Indexed {} game sessions", self.sessions.len());
        Ok(())
    }

    pub fn settings(&self) -> &SaveSettings {
        &self.settings
    }

    pub fn store(&self) -> &dyn ByteStore {
        self.store.as_ref()
    }

    /// True only while entities are being replayed from a save
    pub fn loading_in_progress(&self) -> bool {
        self.loading_in_progress
    }

    // ======================================================================
    // Entities
    // ======================================================================

    pub fn register_entity(&mut self, entity: EntityHandle) -> Result<(), SaveError> {
        self.entities.register(entity)
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    /// Drops every non-persistent entity; call when leaving a scene
    pub fn on_context_exit(&mut self) {
        let removed = self.entities.purge_non_persistent();
        log::debug!("Context exit removed {} entities", removed);
    }

    /// Runs the queued load, if any; call once the new scene's entities are registered
    pub fn on_context_enter(&mut self) -> Result<LoadOutcome, SaveError> {
        let Some(pending) = self.pending_load.take() else {
            return Ok(LoadOutcome::Idle);
        };
        if pending.token.is_cancelled() {
            log::info!("Load of '{}' was cancelled", pending.save.file_name);
            return Ok(LoadOutcome::Cancelled);
        }
        self.run_load(&pending.save).map(LoadOutcome::Completed)
    }

    /// Registers a callback fired at the start of every save
    pub fn on_saving_started(&mut self, hook: impl FnMut() + 'static) {
        self.saving_started.push(Box::new(hook));
    }

    // ======================================================================
    // Sessions
    // ======================================================================

    /// Sessions, most recently played first
    pub fn list_sessions(&self) -> &[GameSessionInfo] {
        self.sessions.sessions()
    }

    pub fn find_session(&self, display_name: &str) -> Option<&GameSessionInfo> {
        self.sessions.find(display_name)
    }

    /// Makes `name` the session new saves go to, creating it on first save if new
    pub fn start_session(&mut self, name: impl Into<String>) {
        let name = name.into();
        log::debug!("Current game session is now '{}'", name);
        self.current_session = Some(name);
    }

    pub fn current_session_name(&self) -> Option<&str> {
        self.current_session.as_deref()
    }

    /// The current session, once it has at least one save
    pub fn current_session(&self) -> Option<&GameSessionInfo> {
        self.current_session
            .as_deref()
            .and_then(|name| self.sessions.find(name))
    }

    pub fn is_save_supported(&self, save: &SaveInfo) -> bool {
        is_version_supported(&save.game_version, &self.settings.earliest_supported_version)
    }

    // ======================================================================
    // Saving
    // ======================================================================

    /// Saves all registered entities under `file_name` in the current session
    ///
    /// Both files are encoded before anything is written. If the data file
    /// cannot be written, the info file is put back the way it was and the
    /// session index (including the session version) is left untouched.
    pub fn save_file(&mut self, file_name: &str) -> Result<SaveInfo, SaveError> {
        for hook in &mut self.saving_started {
            hook();
        }

        let session_name = self
            .current_session
            .clone()
            .ok_or(SaveError::NoActiveSession)?;
        let app_version = self.settings.app_version.clone();

        let info = SaveInfo {
            file_name: file_name.to_string(),
            session_name: session_name.clone(),
            date: (self.clock)(),
            screenshot: self.screenshots.capture(),
            game_version: app_version,
            location: FileLocation::LocalStorage,
        };
        let data = self.snapshot(&session_name)?;

        let info_bytes = self.codec.encode(&info)?;
        let data_bytes = self.codec.encode(&data)?;
        let info_path = self.files.path_for(file_name, FileKind::Info);
        let data_path = self.files.path_for(file_name, FileKind::Data);

        let previous_info = self.store.read(&info_path)?;
        self.store.write(&info_path, &info_bytes)?;
        if let Err(e) = self.store.write(&data_path, &data_bytes) {
            log::warn!("Writing {} failed, rolling back info file", data_path.display());
            let rollback = match previous_info {
                Some(bytes) => self.store.write(&info_path, &bytes),
                None => self.store.delete(&info_path),
            };
            if let Err(rollback_err) = rollback {
                log::error!("Rolling back {} failed: {}", info_path.display(), rollback_err);
            }
            return Err(e.into());
        }

        let supported = self.is_save_supported(&info);
        if let Some(session) = self.sessions.find_mut(&session_name) {
            session.set_version(info.game_version.clone());
        }
        self.sessions.add_save(info.clone(), supported);

        log::info!(
            "Game saved to: {} ({} entities)",
            data_path.display(),
            data.entities.len()
        );
        Ok(info)
    }

    fn snapshot(&self, session_name: &str) -> Result<SaveDataFile, SaveError> {
        let mut entities = vec![SaveData::new(
            SESSION_ENTITY_ID,
            SESSION_ENTITY_ID,
            &SessionSaveData {
                name: session_name.to_string(),
            },
        )?];
        for entity in self.entities.entities() {
            entities.push(entity.borrow().save()?);
        }
        Ok(SaveDataFile { entities })
    }

    /// Saves under the first free `"<prefix>"`, `"<prefix> - 2"`, ... name
    pub fn quick_save(&mut self) -> Result<SaveInfo, SaveError> {
        let file_name = self.default_file_name(&self.settings.quick_save_prefix);
        self.save_file(&file_name)
    }

    /// First name in `prefix`, `prefix - 2`, `prefix - 3`, ... with no info file yet
    pub fn default_file_name(&self, prefix: &str) -> String {
        let mut iteration = 1;
        let mut file_name = compose_file_name(prefix, iteration);
        while self.file_exists(&file_name) {
            iteration += 1;
            file_name = compose_file_name(prefix, iteration);
        }
        file_name
    }

    /// True if an info file exists for the name (under any legacy spelling)
    pub fn file_exists(&self, file_name: &str) -> bool {
        self.files.exists(self.store.as_ref(), file_name, FileKind::Info)
    }

    // ======================================================================
    // Loading
    // ======================================================================

    /// Queues the latest save of a session; it runs on the next `on_context_enter`
    pub fn load_game_session(&mut self, display_name: &str) -> Option<CancelToken> {
        let save = self.sessions.find(display_name)?.latest_save()?.clone();
        Some(self.request_load(save))
    }

    /// Queues the latest save of the most recently played supported session
    pub fn quick_load(&mut self) -> Option<CancelToken> {
        let save = self.sessions.find_latest_supported()?.latest_save()?.clone();
        Some(self.request_load(save))
    }

    /// Queues a specific save, replacing any load already queued
    pub fn request_load(&mut self, save: SaveInfo) -> CancelToken {
        let token = CancelToken::new();
        if let Some(previous) = self.pending_load.replace(PendingLoad {
            save,
            token: token.clone(),
        }) {
            log::debug!("Replacing queued load of '{}'", previous.save.file_name);
        }
        token
    }

    /// Replays a save into the registered entities, synchronously
    ///
    /// A dependency cycle between entities fails the load before any entity is touched.
    pub fn run_load(&mut self, save: &SaveInfo) -> Result<LoadReport, SaveError> {
        self.loading_in_progress = true;
        let result = self.load_entities(save);
        self.loading_in_progress = false;
        result
    }

    fn load_entities(&mut self, save: &SaveInfo) -> Result<LoadReport, SaveError> {
        let Some(bytes) = self.read_data_file(&save.file_name)? else {
            log::warn!("No data file found for save '{}'", save.file_name);
            return Ok(LoadReport::missing_data(&save.file_name));
        };
        let data: SaveDataFile = self.codec.decode(&bytes)?;

        let order = resolve_load_order(&self.entities.entities())?;

        let game_version = GameVersion::parse(&save.game_version).unwrap_or_else(|| {
            log::warn!(
                "Save '{}' has malformed version '{}', loading as 0",
                save.file_name,
                save.game_version
            );
            GameVersion::default()
        });

        if let Some(record) = data.find(SESSION_ENTITY_ID) {
            match record.parse::<SessionSaveData>() {
                Ok(session) => self.start_session(session.name),
                Err(e) => log::warn!("Ignoring session record: {}", e),
            }
        }

        let mut report = LoadReport {
            file_name: save.file_name.clone(),
            data_found: true,
            ..LoadReport::default()
        };
        for entity in order {
            let id = entity.borrow().entity_id().to_string();
            let Some(record) = data.find(&id) else {
                report.without_record.push(id);
                continue;
            };
            match entity.borrow_mut().load(record, &game_version) {
                Ok(()) => report.loaded.push(id),
                Err(e) => {
                    log::warn!("Entity '{}' failed to load: {}", id, e);
                    report.failed.push((id, e.to_string()));
                }
            }
        }

        log::info!(
            "Loaded save '{}' ({} entities restored)",
            save.file_name,
            report.loaded.len()
        );
        Ok(report)
    }

    fn read_data_file(&self, file_name: &str) -> Result<Option<Vec<u8>>, SaveError> {
        match self.files.resolve(self.store.as_ref(), file_name, FileKind::Data) {
            Some(path) => Ok(self.store.read(&path)?),
            None => Ok(None),
        }
    }

    // ======================================================================
    // Deleting
    // ======================================================================

    /// Deletes both files of a save and removes it from its session
    pub fn delete_save(&mut self, save: &SaveInfo) -> Result<(), SaveError> {
        for kind in [FileKind::Info, FileKind::Data] {
            if let Some(path) = self.files.resolve(self.store.as_ref(), &save.file_name, kind) {
                self.store.delete(&path)?;
                log::debug!("Deleted {}", path.display());
            }
        }
        self.sessions.remove_save(save);
        log::info!("Deleted save '{}'", save.file_name);
        Ok(())
    }

    // ======================================================================
    // Player settings
    // ======================================================================

    pub fn player_settings_path(&self) -> PathBuf {
        self.settings.player_settings_path()
    }

    pub fn save_player_settings<T: Serialize>(&mut self, data: &T) -> Result<(), SaveError> {
        let bytes = self.codec.encode(data)?;
        self.store.write(&self.settings.player_settings_path(), &bytes)?;
        Ok(())
    }

    /// `None` if no settings were saved yet
    pub fn load_player_settings<T: DeserializeOwned>(&self) -> Result<Option<T>, SaveError> {
        match self.store.read(&self.settings.player_settings_path())? {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

fn compose_file_name(prefix: &str, iteration: u32) -> String {
    if iteration < 2 {
        prefix.to_string()
    } else {
        format!("{} - {}", prefix, iteration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::saveable::{Saveable, entity_handle};
    use crate::save::store::MemoryStore;
    use std::cell::{Cell, RefCell};
    use std::io;
    use std::path::Path;
    use std::rc::Rc;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Counter {
        id: &'static str,
        kind: &'static str,
        after: Vec<&'static str>,
        value: u32,
        persistent: bool,
        journal: Journal,
    }

    impl Saveable for Counter {
        fn entity_id(&self) -> &str {
            self.id
        }

        fn is_persistent(&self) -> bool {
            self.persistent
        }

        fn type_tag(&self) -> &'static str {
            self.kind
        }

        fn load_after(&self) -> Vec<&'static str> {
            self.after.clone()
        }

        fn save(&self) -> Result<SaveData, SaveError> {
            SaveData::new(self.id, self.kind, &self.value)
        }

        fn load(&mut self, data: &SaveData, _version: &GameVersion) -> Result<(), SaveError> {
            self.value = data.parse()?;
            self.journal.borrow_mut().push(self.id.to_string());
            Ok(())
        }
    }

    fn counter(
        id: &'static str,
        kind: &'static str,
        after: &[&'static str],
        value: u32,
        journal: &Journal,
    ) -> Rc<RefCell<Counter>> {
        entity_handle(Counter {
            id,
            kind,
            after: after.to_vec(),
            value,
            persistent: false,
            journal: journal.clone(),
        })
    }

    fn settings() -> SaveSettings {
        let mut settings = SaveSettings::with_root("/game");
        settings.app_version = "1.2.0".to_string();
        settings.earliest_supported_version = "1.0".to_string();
        settings
    }

    fn manager() -> SaveManager {
        SaveManager::new(settings(), MemoryStore::new()).unwrap()
    }

    fn fixed_clock() -> SaveTimestamp {
        SaveTimestamp::new(2025, 4, 1, 10, 0, 0)
    }

    thread_local! {
        static TODAY: Cell<u32> = const { Cell::new(1) };
    }

    /// Clock driven by `TODAY`, so tests can date each save
    fn calendar_clock() -> SaveTimestamp {
        SaveTimestamp::new(2025, 1, TODAY.with(Cell::get), 12, 0, 0)
    }

    fn save_on(manager: &mut SaveManager, day: u32, session: &str, file_name: &str) -> SaveInfo {
        TODAY.with(|today| today.set(day));
        manager.start_session(session);
        manager.save_file(file_name).unwrap()
    }

    fn info_for(session: &str, file_name: &str, version: &str, day: u32) -> SaveInfo {
        SaveInfo {
            file_name: file_name.to_string(),
            session_name: session.to_string(),
            date: SaveTimestamp::new(2025, 1, day, 0, 0, 0),
            screenshot: None,
            game_version: version.to_string(),
            location: FileLocation::LocalStorage,
        }
    }

    #[test]
    fn test_save_requires_session() {
        let mut manager = manager();
        assert!(matches!(manager.save_file("Slot 1"), Err(SaveError::NoActiveSession)));
        assert!(manager.list_sessions().is_empty());
    }

    #[test]
    fn test_save_writes_both_files_and_indexes() {
        let journal = Journal::default();
        let cellar = counter("cellar", "Cellar", &[], 7, &journal);
        let mut manager = manager().with_clock(fixed_clock);
        manager.register_entity(cellar.clone()).unwrap();
        manager.start_session("The Green Dragon");

        let info = manager.save_file("Slot 1").unwrap();

        assert_eq!(info.session_name, "The Green Dragon");
        assert_eq!(info.game_version, "1.2.0");
        assert_eq!(info.date, fixed_clock());
        assert!(manager.store().exists(Path::new("/game/Saves/Slot 1.savinfo")));
        assert!(manager.store().exists(Path::new("/game/Saves/Slot 1.sav")));

        let session = manager.current_session().unwrap();
        assert_eq!(session.latest_save(), Some(&info));
        assert!(session.is_supported());
    }

    #[test]
    fn test_round_trip_into_fresh_entities() {
        let journal = Journal::default();
        let mut manager = manager();
        manager.start_session("Inn");
        {
            let cellar = counter("cellar", "Cellar", &[], 11, &journal);
            let kitchen = counter("kitchen", "Kitchen", &["Cellar"], 22, &journal);
            manager.register_entity(cellar.clone()).unwrap();
            manager.register_entity(kitchen.clone()).unwrap();
            manager.save_file("Slot 1").unwrap();
            manager.on_context_exit();
        }

        let cellar = counter("cellar", "Cellar", &[], 0, &journal);
        let kitchen = counter("kitchen", "Kitchen", &["Cellar"], 0, &journal);
        manager.register_entity(kitchen.clone()).unwrap();
        manager.register_entity(cellar.clone()).unwrap();

        let save = manager.find_session("Inn").unwrap().latest_save().unwrap().clone();
        let report = manager.run_load(&save).unwrap();

        assert_eq!(cellar.borrow().value, 11);
        assert_eq!(kitchen.borrow().value, 22);
        assert_eq!(report.loaded, vec!["cellar", "kitchen"]);
        assert!(report.data_found);
        assert!(!manager.loading_in_progress());
    }

    #[test]
    fn test_load_follows_dependency_order() {
        let journal = Journal::default();
        let guests = counter("guests", "Guests", &["Kitchen"], 3, &journal);
        let kitchen = counter("kitchen", "Kitchen", &["Cellar"], 2, &journal);
        let cellar = counter("cellar", "Cellar", &[], 1, &journal);
        let mut manager = manager();
        manager.register_entity(guests.clone()).unwrap();
        manager.register_entity(kitchen.clone()).unwrap();
        manager.register_entity(cellar.clone()).unwrap();
        manager.start_session("Inn");

        let save = manager.save_file("Slot 1").unwrap();
        manager.run_load(&save).unwrap();

        assert_eq!(*journal.borrow(), vec!["cellar", "kitchen", "guests"]);
    }

    #[test]
    fn test_cycle_aborts_whole_load() {
        let journal = Journal::default();
        let free = counter("free", "Free", &[], 1, &journal);
        let egg = counter("egg", "Egg", &["Chicken"], 1, &journal);
        let chicken = counter("chicken", "Chicken", &["Egg"], 1, &journal);
        let mut manager = manager();
        manager.register_entity(free.clone()).unwrap();
        manager.register_entity(egg.clone()).unwrap();
        manager.register_entity(chicken.clone()).unwrap();
        manager.start_session("Farm");

        let save = manager.save_file("Slot 1").unwrap();
        let err = manager.run_load(&save).unwrap_err();

        assert!(matches!(err, SaveError::CyclicDependency { .. }));
        assert!(journal.borrow().is_empty(), "no entity may be loaded");
        assert!(!manager.loading_in_progress());
    }

    #[test]
    fn test_unmatched_records_and_missing_records() {
        let journal = Journal::default();
        let mut manager = manager();
        manager.start_session("Inn");
        {
            let retired = counter("retired", "Retired", &[], 5, &journal);
            manager.register_entity(retired.clone()).unwrap();
            manager.save_file("Slot 1").unwrap();
        }

        let newcomer = counter("newcomer", "Newcomer", &[], 9, &journal);
        manager.register_entity(newcomer.clone()).unwrap();
        let save = manager.find_session("Inn").unwrap().latest_save().unwrap().clone();
        let report = manager.run_load(&save).unwrap();

        assert!(report.loaded.is_empty());
        assert_eq!(report.without_record, vec!["newcomer"]);
        assert_eq!(newcomer.borrow().value, 9);
    }

    #[test]
    fn test_entity_load_failure_is_reported_not_fatal() {
        let journal = Journal::default();
        let mut manager = manager();
        manager.start_session("Inn");
        manager.save_file("Slot 1").unwrap();

        // Hand-edit the data file: the record has the wrong payload shape
        let data = SaveDataFile {
            entities: vec![
                SaveData::new("broken", "Counter", &"not a number").unwrap(),
                SaveData::new("fine", "Counter", &4u32).unwrap(),
            ],
        };
        let bytes = Codec::default().encode(&data).unwrap();
        manager
            .store
            .write(Path::new("/game/Saves/Slot 1.sav"), &bytes)
            .unwrap();

        let broken = counter("broken", "Broken", &[], 1, &journal);
        let fine = counter("fine", "Fine", &[], 1, &journal);
        manager.register_entity(broken.clone()).unwrap();
        manager.register_entity(fine.clone()).unwrap();

        let save = manager.find_session("Inn").unwrap().latest_save().unwrap().clone();
        let report = manager.run_load(&save).unwrap();
        assert_eq!(report.loaded, vec!["fine"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(fine.borrow().value, 4);
    }

    #[test]
    fn test_missing_data_file_is_empty_result() {
        let mut manager = manager();
        let report = manager.run_load(&info_for("Inn", "Nowhere", "1.0", 1)).unwrap();
        assert!(!report.data_found);
        assert!(report.loaded.is_empty());
    }

    #[test]
    fn test_load_restores_session_name() {
        let mut manager = manager();
        manager.start_session("First Inn");
        let first = manager.save_file("a").unwrap();
        manager.start_session("Second Inn");
        manager.save_file("b").unwrap();

        manager.run_load(&first).unwrap();
        assert_eq!(manager.current_session_name(), Some("First Inn"));
    }

    #[test]
    fn test_quick_save_picks_next_free_name() {
        let mut manager = manager();
        manager.start_session("Inn");

        assert_eq!(manager.quick_save().unwrap().file_name, "Quicksave");
        assert_eq!(manager.quick_save().unwrap().file_name, "Quicksave - 2");
        assert_eq!(manager.quick_save().unwrap().file_name, "Quicksave - 3");
        assert_eq!(manager.current_session().unwrap().saves().len(), 3);
    }

    #[test]
    fn test_default_name_sees_legacy_spelling() {
        let mut store = MemoryStore::new();
        store
            .write(Path::new("/game/Saves/Quick_Save.savinfo"), b"{}")
            .unwrap();
        let manager = SaveManager::new(settings(), store).unwrap();

        assert!(manager.file_exists("Quick Save"));
        assert_eq!(manager.default_file_name("Quick Save"), "Quick Save - 2");
    }

    #[test]
    fn test_saving_same_name_replaces_save() {
        let mut manager = manager();
        manager.start_session("Inn");
        manager.save_file("Slot 1").unwrap();
        manager.save_file("Slot 1").unwrap();
        assert_eq!(manager.current_session().unwrap().saves().len(), 1);
    }

    #[test]
    fn test_quick_load_and_context_enter() {
        let journal = Journal::default();
        let cellar = counter("cellar", "Cellar", &[], 5, &journal);
        let mut manager = manager();
        manager.register_entity(cellar.clone()).unwrap();
        manager.start_session("Inn");
        manager.save_file("Slot 1").unwrap();
        cellar.borrow_mut().value = 99;

        assert_eq!(manager.on_context_enter().unwrap(), LoadOutcome::Idle);
        assert!(manager.quick_load().is_some());
        match manager.on_context_enter().unwrap() {
            LoadOutcome::Completed(report) => assert_eq!(report.loaded, vec!["cellar"]),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(cellar.borrow().value, 5);
        assert_eq!(manager.on_context_enter().unwrap(), LoadOutcome::Idle);
    }

    #[test]
    fn test_cancelled_load_never_starts() {
        let journal = Journal::default();
        let cellar = counter("cellar", "Cellar", &[], 5, &journal);
        let mut manager = manager();
        manager.register_entity(cellar.clone()).unwrap();
        manager.start_session("Inn");
        manager.save_file("Slot 1").unwrap();
        cellar.borrow_mut().value = 99;

        let token = manager.load_game_session("Inn").unwrap();
        token.cancel();

        assert_eq!(manager.on_context_enter().unwrap(), LoadOutcome::Cancelled);
        assert_eq!(cellar.borrow().value, 99);
        assert!(journal.borrow().is_empty());
    }

    #[test]
    fn test_quick_load_ignores_unsupported_sessions() {
        let mut store = MemoryStore::new();
        let codec = Codec::default();
        for info in [
            info_for("Ancient", "old", "0.9", 20),
            info_for("Modern", "new", "1.1", 10),
        ] {
            let path = format!("/game/Saves/{}.savinfo", info.file_name);
            store.write(Path::new(&path), &codec.encode(&info).unwrap()).unwrap();
        }
        let mut manager = SaveManager::new(settings(), store).unwrap();

        assert_eq!(manager.list_sessions()[0].display_name(), "Ancient");
        manager.quick_load().unwrap();
        let pending = manager.pending_load.as_ref().unwrap();
        assert_eq!(pending.save.file_name, "new");
    }

    #[test]
    fn test_quick_load_without_sessions() {
        let mut manager = manager();
        assert!(manager.quick_load().is_none());
        assert!(manager.load_game_session("Nope").is_none());
    }

    #[test]
    fn test_unreadable_info_file_is_skipped() {
        let mut store = MemoryStore::new();
        store
            .write(Path::new("/game/Saves/garbage.savinfo"), b"not json")
            .unwrap();
        let manager = SaveManager::new(settings(), store).unwrap();
        assert!(manager.list_sessions().is_empty());
    }

    #[test]
    fn test_delete_save_removes_files_and_session() {
        let mut manager = manager();
        manager.start_session("Inn");
        let first = manager.save_file("Slot 1").unwrap();
        let second = manager.save_file("Slot 2").unwrap();

        manager.delete_save(&second).unwrap();
        assert!(!manager.store().exists(Path::new("/game/Saves/Slot 2.savinfo")));
        assert!(!manager.store().exists(Path::new("/game/Saves/Slot 2.sav")));
        assert_eq!(manager.find_session("Inn").unwrap().latest_save(), Some(&first));

        manager.delete_save(&first).unwrap();
        assert!(manager.find_session("Inn").is_none());
    }

    #[test]
    fn test_delete_finds_legacy_file_names() {
        let mut store = MemoryStore::new();
        store.write(Path::new("/game/Saves/Day_3_Save.savinfo"), b"{}").unwrap();
        store.write(Path::new("/game/Saves/Day_3_Save.sav"), b"{}").unwrap();
        let mut manager = SaveManager::new(settings(), store).unwrap();

        manager
            .delete_save(&info_for("Inn", "[Day 3] Save", "1.0", 1))
            .unwrap();
        assert!(!manager.store().exists(Path::new("/game/Saves/Day_3_Save.savinfo")));
        assert!(!manager.store().exists(Path::new("/game/Saves/Day_3_Save.sav")));
    }

    #[test]
    fn test_load_reads_legacy_data_file() {
        let journal = Journal::default();
        let cellar = counter("cellar", "Cellar", &[], 0, &journal);
        let data = SaveDataFile {
            entities: vec![SaveData::new("cellar", "Cellar", &12u32).unwrap()],
        };
        let mut store = MemoryStore::new();
        store
            .write(Path::new("/game/Saves/My_Save.sav"), &Codec::default().encode(&data).unwrap())
            .unwrap();
        let mut manager = SaveManager::new(settings(), store).unwrap();
        manager.register_entity(cellar.clone()).unwrap();

        let report = manager.run_load(&info_for("Inn", "My Save", "1.0", 1)).unwrap();
        assert!(report.data_found);
        assert_eq!(cellar.borrow().value, 12);
    }

    #[test]
    fn test_saving_started_hook_fires() {
        let fired = Rc::new(Cell::new(0));
        let mut manager = manager();
        let seen = fired.clone();
        manager.on_saving_started(move || seen.set(seen.get() + 1));
        manager.start_session("Inn");

        manager.save_file("a").unwrap();
        manager.quick_save().unwrap();
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_player_settings_round_trip() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Audio {
            music_volume: f32,
            muted: bool,
        }

        let mut manager = manager();
        assert_eq!(manager.load_player_settings::<Audio>().unwrap(), None);

        let audio = Audio { music_volume: 0.5, muted: true };
        manager.save_player_settings(&audio).unwrap();
        assert!(manager.store().exists(Path::new("/game/PlayerSettings.json")));
        assert_eq!(manager.load_player_settings::<Audio>().unwrap(), Some(audio));
    }

    /// Memory store whose data file writes always fail
    struct FailingDataStore {
        inner: MemoryStore,
    }

    impl ByteStore for FailingDataStore {
        fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path)
        }

        fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
            self.inner.read(path)
        }

        fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
            if path.extension().is_some_and(|ext| ext == "sav") {
                return Err(io::Error::other("disk full"));
            }
            self.inner.write(path, bytes)
        }

        fn delete(&mut self, path: &Path) -> io::Result<()> {
            self.inner.delete(path)
        }

        fn list_files(&self, dir: &Path, extension: &str) -> io::Result<Vec<Vec<u8>>> {
            self.inner.list_files(dir, extension)
        }

        fn create_dir(&mut self, path: &Path) -> io::Result<()> {
            self.inner.create_dir(path)
        }
    }

    #[test]
    fn test_failed_data_write_rolls_back() {
        let store = FailingDataStore { inner: MemoryStore::new() };
        let mut manager = SaveManager::new(settings(), store).unwrap();
        manager.start_session("Inn");

        assert!(matches!(manager.save_file("Slot 1"), Err(SaveError::Io(_))));
        assert!(!manager.store().exists(Path::new("/game/Saves/Slot 1.savinfo")));
        assert!(manager.list_sessions().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_session_version() {
        let mut inner = MemoryStore::new();
        let existing = info_for("Inn", "Old Slot", "2.0", 3);
        inner
            .write(
                Path::new("/game/Saves/Old Slot.savinfo"),
                &Codec::default().encode(&existing).unwrap(),
            )
            .unwrap();
        let mut manager = SaveManager::new(settings(), FailingDataStore { inner }).unwrap();
        assert_eq!(manager.find_session("Inn").unwrap().game_version(), "2.0");

        manager.start_session("Inn");
        assert!(manager.save_file("Slot 1").is_err());

        let session = manager.find_session("Inn").unwrap();
        assert_eq!(session.game_version(), "2.0");
        assert_eq!(session.saves(), &[existing]);
    }

    #[test]
    fn test_session_record_id_cannot_be_registered() {
        let journal = Journal::default();
        let impostor = counter(SESSION_ENTITY_ID, "Impostor", &[], 7, &journal);
        let mut manager = manager();

        let err = manager.register_entity(impostor.clone()).unwrap_err();
        assert!(matches!(err, SaveError::DuplicateEntityId(_)));
        assert!(manager.entities().is_empty());
    }

    #[test]
    fn test_deleting_newest_save_resorts_sessions() {
        let mut manager = manager().with_clock(calendar_clock);
        save_on(&mut manager, 3, "Anvil", "a_old");
        save_on(&mut manager, 5, "Barrel", "b");
        let a_new = save_on(&mut manager, 9, "Anvil", "a_new");

        let order = |manager: &SaveManager| -> Vec<String> {
            manager
                .list_sessions()
                .iter()
                .map(|s| s.display_name().to_string())
                .collect()
        };
        assert_eq!(order(&manager), vec!["Anvil", "Barrel"]);

        manager.delete_save(&a_new).unwrap();
        assert_eq!(order(&manager), vec!["Barrel", "Anvil"]);
        assert_eq!(manager.find_session("Anvil").unwrap().last_played().unwrap().day, 3);
    }

    #[test]
    fn test_live_index_matches_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings();
        settings.root_dir = dir.path().to_path_buf();

        let mut manager = SaveManager::open(settings.clone()).unwrap().with_clock(calendar_clock);
        save_on(&mut manager, 3, "Inn", "Slot 1");
        save_on(&mut manager, 5, "Tavern", "Slot 2");
        save_on(&mut manager, 7, "Cellar", "Slot 4");
        let inn_latest = save_on(&mut manager, 9, "Inn", "Slot 3");
        // Same file name, different session: the Inn copy is gone from disk
        let overwritten = save_on(&mut manager, 11, "Tavern", "Slot 1");
        assert_eq!(manager.find_session("Inn").unwrap().saves(), &[inn_latest]);

        manager.delete_save(&overwritten).unwrap();

        let rebuilt = SaveManager::open(settings).unwrap();
        assert_eq!(manager.list_sessions(), rebuilt.list_sessions());
        let names: Vec<&str> = rebuilt.list_sessions().iter().map(|s| s.display_name()).collect();
        assert_eq!(names, vec!["Inn", "Cellar", "Tavern"]);
    }

    #[test]
    fn test_index_rebuilt_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings();
        settings.root_dir = dir.path().to_path_buf();

        {
            let mut manager = SaveManager::open(settings.clone()).unwrap();
            manager.start_session("Inn");
            manager.save_file("Slot 1").unwrap();
            manager.save_file("Slot 2").unwrap();
            manager.start_session("Tavern");
            manager.save_file("Slot 3").unwrap();
        }

        let manager = SaveManager::open(settings).unwrap();
        assert_eq!(manager.list_sessions().len(), 2);
        assert_eq!(manager.find_session("Inn").unwrap().saves().len(), 2);
        assert_eq!(manager.find_session("Tavern").unwrap().game_version(), "1.2.0");
    }

    #[test]
    fn test_default_session_from_settings() {
        let mut settings = settings();
        settings.default_session_name = Some("[Develop]".to_string());
        let manager = SaveManager::new(settings, MemoryStore::new()).unwrap();
        assert_eq!(manager.current_session_name(), Some("[Develop]"));
    }
}
