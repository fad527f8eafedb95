//! Load requests and their results
//!
//! Loading happens in two phases. `SaveManager::request_load` only queues the
//! save and hands back a `CancelToken`; the entity replay runs later, when the
//! host calls `SaveManager::on_context_enter`. Up to that point the load can
//! be cancelled. Once replay starts it runs to completion.

use std::cell::Cell;
use std::rc::Rc;

use super::types::SaveInfo;

/// Cancels a queued load before it starts
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// A save waiting to be loaded
#[derive(Debug, Clone)]
pub(crate) struct PendingLoad {
    pub save: SaveInfo,
    pub token: CancelToken,
}

/// What happened to the entities during one load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub file_name: String,
    /// False if no data file was found under any name variant
    pub data_found: bool,
    /// Entities that received their record, in load order
    pub loaded: Vec<String>,
    /// Entities with no record in the save; they keep their current state
    pub without_record: Vec<String>,
    /// Entities whose own `load` failed, with the reason
    pub failed: Vec<(String, String)>,
}

impl LoadReport {
    pub(crate) fn missing_data(file_name: &str) -> Self {
        LoadReport {
            file_name: file_name.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Nothing was queued
    Idle,
    /// The queued load was cancelled before it started
    Cancelled,
    Completed(LoadReport),
}
