//! Save data types
//!
//! This module defines the records written to disk for every save:
//! - `SaveInfo`: the small metadata record (`.savinfo`) used to build the session list
//! - `SaveDataFile`: the entity payloads (`.sav`) replayed on load
//!
//! It uses Serde for serialization; the actual byte encoding is done by `Codec`.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::screenshot::Screenshot;

/// Which half of a save pair a physical file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Info,
    Data,
}

/// Where a save lives
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileLocation {
    #[default]
    LocalStorage,
    CloudStorage,
    Virtual,
}

/// Wall-clock time of a save, without timezone
///
/// Field order matters: the derived `Ord` compares year first, then month, and so on,
/// which is chronological order.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SaveTimestamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl SaveTimestamp {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        SaveTimestamp { year, month, day, hour, minute, second }
    }

    /// Current local time
    pub fn now() -> Self {
        Self::from_naive(Local::now().naive_local())
    }

    pub fn from_naive(time: NaiveDateTime) -> Self {
        SaveTimestamp {
            year: time.year(),
            month: time.month(),
            day: time.day(),
            hour: time.hour(),
            minute: time.minute(),
            second: time.second(),
        }
    }

    /// Converts back into a chrono value. `None` if the stored fields are not a real date.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?
            .and_hms_opt(self.hour, self.minute, self.second)
    }
}

impl fmt::Display for SaveTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_naive() {
            Some(time) => write!(f, "{}", time.format("%Y-%m-%d %H:%M")),
            None => write!(
                f,
                "{:04}-{:02}-{:02} {:02}:{:02}",
                self.year, self.month, self.day, self.hour, self.minute
            ),
        }
    }
}

/// Metadata about one save (the "info" file)
///
/// One `SaveInfo` pairs with exactly one `SaveDataFile` through `file_name`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SaveInfo {
    /// Logical name, also the physical file stem
    pub file_name: String,
    /// Display name of the session this save belongs to
    pub session_name: String,
    pub date: SaveTimestamp,
    #[serde(default)]
    pub screenshot: Option<Screenshot>,
    /// Version of the application that wrote the save
    pub game_version: String,
    #[serde(default)]
    pub location: FileLocation,
}

/// Serialized state of one entity
///
/// `entity_type` makes every record self-describing so payloads of different
/// entity kinds can share one data file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SaveData {
    pub entity_id: String,
    pub entity_type: String,
    pub payload: serde_json::Value,
}

impl SaveData {
    /// Wraps an entity's state into a record
    pub fn new<T: Serialize>(
        entity_id: impl Into<String>,
        entity_type: impl Into<String>,
        state: &T,
    ) -> Result<Self, SaveError> {
        Ok(SaveData {
            entity_id: entity_id.into(),
            entity_type: entity_type.into(),
            payload: serde_json::to_value(state)?,
        })
    }

    /// Reads the payload back as the entity's state type
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, SaveError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            SaveError::CorruptedData(format!("record '{}': {}", self.entity_id, e))
        })
    }
}

/// All entity records of one save (the "data" file)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SaveDataFile {
    pub entities: Vec<SaveData>,
}

impl SaveDataFile {
    /// First record for the given entity id
    pub fn find(&self, entity_id: &str) -> Option<&SaveData> {
        self.entities.iter().find(|record| record.entity_id == entity_id)
    }
}

/// Error types for save/load operations
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupted save data: {0}")]
    CorruptedData(String),

    #[error("Circular load dependency found at entity '{entity}'")]
    CyclicDependency { entity: String },

    #[error("Entity '{0}' is already registered")]
    DuplicateEntityId(String),

    #[error("No game session is active")]
    NoActiveSession,

    #[error("Invalid settings: {0}")]
    Settings(String),
}
