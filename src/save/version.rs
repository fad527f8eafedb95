//! Dotted-integer game versions
//!
//! Saves record the version string of the application that wrote them. Two
//! questions are asked of those strings:
//! - is a save new enough to be loaded (`is_version_supported`)
//! - which of two versions is the newest (`youngest_version`), used to label sessions

use std::cmp::Ordering;
use std::fmt;

/// Parsed version such as `1.4.2`
///
/// Ordering is lexicographic over the segments, so `1.2 < 1.2.0 < 1.10`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GameVersion {
    segments: Vec<u32>,
}

impl GameVersion {
    /// Parses `"1.2.3"`. Returns `None` if any segment is not a non-negative integer.
    pub fn parse(version: &str) -> Option<Self> {
        let segments = version
            .split('.')
            .map(|segment| segment.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        Some(GameVersion { segments })
    }

    pub fn segments(&self) -> &[u32] {
        &self.segments
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// True if `version` parses and is at least `minimum`
///
/// A malformed version is never supported. A malformed minimum supports nothing.
pub fn is_version_supported(version: &str, minimum: &str) -> bool {
    match (GameVersion::parse(version), GameVersion::parse(minimum)) {
        (Some(version), Some(minimum)) => version >= minimum,
        (None, _) => {
            log::debug!("Version '{}' is malformed, treating save as unsupported", version);
            false
        }
        (_, None) => {
            log::warn!("Minimum supported version '{}' is malformed", minimum);
            false
        }
    }
}

/// Returns whichever of the two version strings is newer
///
/// - an empty string loses to anything
/// - shared segments are compared left to right, the first difference wins
/// - if all shared segments match, the string with more segments wins
///   (on a full tie `second` is returned, which is equal anyway)
///
/// Segments that are not numbers compare as `0`.
pub fn youngest_version<'a>(first: &'a str, second: &'a str) -> &'a str {
    if first.is_empty() {
        return second;
    }
    if second.is_empty() {
        return first;
    }

    let first_segments: Vec<&str> = first.split('.').collect();
    let second_segments: Vec<&str> = second.split('.').collect();

    for (a, b) in first_segments.iter().zip(&second_segments) {
        match segment_value(a).cmp(&segment_value(b)) {
            Ordering::Greater => return first,
            Ordering::Less => return second,
            Ordering::Equal => {}
        }
    }

    if first_segments.len() > second_segments.len() {
        first
    } else {
        second
    }
}

fn segment_value(segment: &str) -> u64 {
    segment.trim().parse().unwrap_or(0)
}
