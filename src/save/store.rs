//! Byte-level file storage
//!
//! The save system only needs a handful of operations from storage, so they
//! sit behind `ByteStore`. `FsStore` writes real files, `MemoryStore` keeps
//! everything in memory (tests, virtual saves).
//!
//! # Atomic Writes
//!
//! `FsStore::write` never deletes the old file first:
//!
//! 1. Write to `file.ext.tmp`
//! 2. Rename to `file.ext` (atomic replace on the same filesystem)
//!
//! A crash between the two steps leaves the previous file intact.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub trait ByteStore {
    fn exists(&self, path: &Path) -> bool;

    /// File contents, or `None` if the file does not exist
    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    /// Creates or replaces the file
    fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Removes the file; a missing file is not an error
    fn delete(&mut self, path: &Path) -> io::Result<()>;

    /// Contents of every file directly inside `dir` whose name ends with `extension`
    ///
    /// Files come back in name order. A missing directory yields an empty list.
    fn list_files(&self, dir: &Path, extension: &str) -> io::Result<Vec<Vec<u8>>>;

    /// Creates the directory and its parents if needed
    fn create_dir(&mut self, path: &Path) -> io::Result<()>;
}

/// Store backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl FsStore {
    pub fn new() -> Self {
        FsStore
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(extension))
}

impl ByteStore for FsStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp = temp_path(path);
        fs::write(&temp, bytes)?;
        if let Err(e) = fs::rename(&temp, path) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }
        Ok(())
    }

    fn delete(&mut self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn list_files(&self, dir: &Path, extension: &str) -> io::Result<Vec<Vec<u8>>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_extension(path, extension))
            .collect();
        paths.sort();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(fs::read(&path)?);
        }
        Ok(files)
    }

    fn create_dir(&mut self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}

/// Store that keeps every file in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of all stored files, sorted
    pub fn paths(&self) -> Vec<&Path> {
        self.files.keys().map(PathBuf::as_path).collect()
    }
}

impl ByteStore for MemoryStore {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn delete(&mut self, path: &Path) -> io::Result<()> {
        self.files.remove(path);
        Ok(())
    }

    fn list_files(&self, dir: &Path, extension: &str) -> io::Result<Vec<Vec<u8>>> {
        Ok(self
            .files
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir) && has_extension(path, extension))
            .map(|(_, bytes)| bytes.clone())
            .collect())
    }

    fn create_dir(&mut self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}
