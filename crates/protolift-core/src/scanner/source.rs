//! Built-in [`ClassSource`] implementations.

use super::ClassSource;
use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};
use walkdir::WalkDir;

/// File extension of disassembled classes
pub const SMALI_EXTENSION: &str = "smali";

fn is_smali(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(SMALI_EXTENSION)
}

/// Class texts held in memory, listed in insertion order
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: Vec<(PathBuf, String)>,
}

impl MemorySource {
    /// Creates an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one class text
    pub fn insert(&mut self, id: impl Into<PathBuf>, text: impl Into<String>) {
        let id = id.into();
        let text = text.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = text,
            None => self.entries.push((id, text)),
        }
    }
}

impl ClassSource for MemorySource {
    fn candidates(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .entries
            .iter()
            .map(|(id, _)| id)
            .filter(|id| is_smali(id))
            .cloned()
            .collect())
    }

    fn read(&self, id: &Path) -> Result<String> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, text)| text.clone())
            .ok_or_else(|| Error::file_read(id, io::Error::from(io::ErrorKind::NotFound)))
    }
}

/// A directory tree of `.smali` files, walked in file name order
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Creates a source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root of the walk
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ClassSource for DirectorySource {
    fn candidates(&self) -> Result<Vec<PathBuf>> {
        let mut candidates = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(Error::Traversal {
                        root: self.root.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", self.root.display(), e);
                    continue;
                }
            };

            if entry.file_type().is_file() && is_smali(entry.path()) {
                candidates.push(entry.into_path());
            }
        }

        trace!("Found {} candidates under {}", candidates.len(), self.root.display());
        Ok(candidates)
    }

    fn read(&self, id: &Path) -> Result<String> {
        let bytes = fs::read(id).map_err(|e| Error::file_read(id, e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
