//! Logical save name -> physical path
//!
//! Older builds escaped save names before writing them (spaces to
//! underscores, then brackets dropped). Lookups therefore try, in order:
//!
//! 1. the exact name
//! 2. spaces replaced with `_`
//! 3. the previous variant without `[` and `]`
//!
//! and stop at the first file that exists. Writes always use the exact name.

use std::path::{Path, PathBuf};

use super::store::ByteStore;
use super::types::FileKind;

#[derive(Debug, Clone)]
pub struct FileNameResolver {
    save_folder: PathBuf,
    info_extension: String,
    data_extension: String,
}

impl FileNameResolver {
    pub fn new(
        save_folder: impl Into<PathBuf>,
        info_extension: impl Into<String>,
        data_extension: impl Into<String>,
    ) -> Self {
        FileNameResolver {
            save_folder: save_folder.into(),
            info_extension: info_extension.into(),
            data_extension: data_extension.into(),
        }
    }

    pub fn save_folder(&self) -> &Path {
        &self.save_folder
    }

    pub fn extension(&self, kind: FileKind) -> &str {
        match kind {
            FileKind::Info => &self.info_extension,
            FileKind::Data => &self.data_extension,
        }
    }

    /// Path a save is written to; no sanitizing
    pub fn path_for(&self, file_name: &str, kind: FileKind) -> PathBuf {
        self.save_folder
            .join(format!("{}{}", file_name, self.extension(kind)))
    }

    /// Name variants in lookup order, without duplicates
    pub fn name_variants(file_name: &str) -> Vec<String> {
        let underscored = file_name.replace(' ', "_");
        let unbracketed = underscored.replace(['[', ']'], "");

        let mut variants = vec![file_name.to_string()];
        for variant in [underscored, unbracketed] {
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        }
        variants
    }

    /// First existing physical path for the name, if any
    pub fn resolve(&self, store: &dyn ByteStore, file_name: &str, kind: FileKind) -> Option<PathBuf> {
        Self::name_variants(file_name)
            .into_iter()
            .map(|variant| self.path_for(&variant, kind))
            .find(|path| store.exists(path))
    }

    pub fn exists(&self, store: &dyn ByteStore, file_name: &str, kind: FileKind) -> bool {
        self.resolve(store, file_name, kind).is_some()
    }
}
