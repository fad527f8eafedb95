//! Game sessions
//!
//! A session groups every save that shares a display name (one per inn,
//! profile or save slot). Sessions are rebuilt from the info files at startup
//! and kept current as saves are written and deleted.
//!
//! - `info`: `GameSessionInfo`, one session and its saves
//! - `index`: `GameSessionIndex`, every session sorted by recency

pub mod index;
pub mod info;

pub use index::GameSessionIndex;
pub use info::GameSessionInfo;
