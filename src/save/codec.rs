//! Structural encoding of save records
//!
//! `Codec` is built once from a `CodecConfig` and handed to the `SaveManager`;
//! nothing is registered globally. Value types that need a particular wire
//! shape carry their own Serde impls (`value_types`), and maps with
//! non-string keys opt into `map_entries` with `#[serde(with = ...)]`.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::SaveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Indented output, easier to inspect by hand
    pub pretty: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig { pretty: true }
    }
}

/// JSON codec used for info, data and settings files
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    config: CodecConfig,
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Codec { config }
    }

    pub fn config(&self) -> CodecConfig {
        self.config
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, SaveError> {
        let bytes = if self.config.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SaveError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Small math types with a fixed `{"X": .., "Y": ..}` wire shape
///
/// Missing components read back as zero, so older files with fewer fields still load.
pub mod value_types {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
    #[serde(rename_all = "UPPERCASE", default)]
    pub struct Vec2 {
        pub x: f32,
        pub y: f32,
    }

    #[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    #[serde(rename_all = "UPPERCASE", default)]
    pub struct Vec2Int {
        pub x: i32,
        pub y: i32,
    }

    #[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
    #[serde(rename_all = "UPPERCASE", default)]
    pub struct Vec3 {
        pub x: f32,
        pub y: f32,
        pub z: f32,
    }

    #[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    #[serde(rename_all = "UPPERCASE", default)]
    pub struct Vec3Int {
        pub x: i32,
        pub y: i32,
        pub z: i32,
    }

    /// Rotation quaternion
    #[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
    #[serde(rename_all = "UPPERCASE", default)]
    pub struct Quat {
        pub x: f32,
        pub y: f32,
        pub z: f32,
        pub w: f32,
    }

    impl Default for Quat {
        fn default() -> Self {
            Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
        }
    }

    impl Vec2 {
        pub fn new(x: f32, y: f32) -> Self {
            Vec2 { x, y }
        }
    }

    impl Vec2Int {
        pub fn new(x: i32, y: i32) -> Self {
            Vec2Int { x, y }
        }
    }

    impl Vec3 {
        pub fn new(x: f32, y: f32, z: f32) -> Self {
            Vec3 { x, y, z }
        }
    }

    impl Vec3Int {
        pub fn new(x: i32, y: i32, z: i32) -> Self {
            Vec3Int { x, y, z }
        }
    }
}

/// Serializes a map as `[{"Key": k, "Value": v}, ...]`
///
/// JSON object keys must be strings; this keeps struct or integer keys intact.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Farm {
///     #[serde(with = "savekit::save::codec::map_entries")]
///     crops: HashMap<Vec2Int, Crop>,
/// }
/// ```
pub mod map_entries {
    use serde::de::{Deserialize, Deserializer};
    use serde::ser::{SerializeSeq, Serializer};
    use serde::Serialize;

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct EntryRef<'a, K, V> {
        key: &'a K,
        value: &'a V,
    }

    #[derive(serde::Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Entry<K, V> {
        key: K,
        value: V,
    }

    pub fn serialize<'a, M, K, V, S>(map: &'a M, serializer: S) -> Result<S::Ok, S::Error>
    where
        &'a M: IntoIterator<Item = (&'a K, &'a V)>,
        K: Serialize + 'a,
        V: Serialize + 'a,
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(None)?;
        for (key, value) in map {
            seq.serialize_element(&EntryRef { key, value })?;
        }
        seq.end()
    }

    pub fn deserialize<'de, M, K, V, D>(deserializer: D) -> Result<M, D::Error>
    where
        M: FromIterator<(K, V)>,
        K: Deserialize<'de>,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let entries = Vec::<Entry<K, V>>::deserialize(deserializer)?;
        Ok(entries.into_iter().map(|entry| (entry.key, entry.value)).collect())
    }
}
