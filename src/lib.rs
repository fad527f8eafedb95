//! # savekit
//!
//! Local save/load engine for games with many stateful components.
//!
//! ## Key Concepts
//!
//! - **Entity**: a registered component implementing `Saveable`
//! - **Save**: an info file plus a data file, written under one logical name
//! - **Session**: every save sharing a display name, newest first

pub mod save;
pub mod session;

pub use save::{SaveError, SaveInfo, SaveManager, SaveSettings, Saveable};
pub use session::{GameSessionIndex, GameSessionInfo};
