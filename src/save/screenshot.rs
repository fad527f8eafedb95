//! Screenshot capture boundary
//!
//! Rendering is not part of this crate. The host hands in something that can
//! produce raw image bytes when a save is written; the bytes are stored as-is
//! inside the save's info record.

use serde::{Deserialize, Serialize};

/// Raw image captured when a save was made
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Screenshot {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Produces the screenshot stored alongside each save
pub trait ScreenshotSource {
    /// Returns `None` when nothing can be captured (no camera, headless run, ...)
    fn capture(&mut self) -> Option<Screenshot>;
}

/// Source for hosts without rendering
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScreenshot;

impl ScreenshotSource for NoScreenshot {
    fn capture(&mut self) -> Option<Screenshot> {
        None
    }
}

impl<F> ScreenshotSource for F
where
    F: FnMut() -> Option<Screenshot>,
{
    fn capture(&mut self) -> Option<Screenshot> {
        self()
    }
}
