//! Pluggable persistence of rendered schemas.
//!
//! This module provides the [`SchemaSink`] trait for deciding what happens to
//! each rendered `.proto` file.

use crate::error::Result;
use crate::schema::SchemaUnit;
use std::path::{Path, PathBuf};

/// Destination for rendered schema files.
///
/// `path` is relative to the output root and has already been checked for
/// traversal. A failing write only drops the affected class.
///
/// # Example
///
/// ```ignore
/// use protolift_core::proto::SchemaSink;
///
/// struct StdoutSink;
///
/// impl SchemaSink for StdoutSink {
///     fn write_schema(&mut self, path: &Path, unit: &SchemaUnit, content: &str) -> Result<()> {
///         println!("// {}\n{}", path.display(), content);
///         Ok(())
///     }
/// }
/// ```
pub trait SchemaSink {
    /// Persist one rendered schema
    fn write_schema(&mut self, path: &Path, unit: &SchemaUnit, content: &str) -> Result<()>;
}

/// A sink that discards all output
#[derive(Debug, Default)]
pub struct NullSink {
    /// Number of schemas received
    pub received: usize,
}

impl SchemaSink for NullSink {
    fn write_schema(&mut self, _path: &Path, _unit: &SchemaUnit, _content: &str) -> Result<()> {
        self.received += 1;
        Ok(())
    }
}

/// A sink that keeps every schema in memory, in write order
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Relative path and rendered text of each schema
    pub files: Vec<(PathBuf, String)>,
    /// The units that were written
    pub units: Vec<SchemaUnit>,
}

impl MemorySink {
    /// Creates an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered text stored under `path`
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        let path = path.as_ref();
        self.files
            .iter()
            .find(|(existing, _)| existing == path)
            .map(|(_, content)| content.as_str())
    }
}

impl SchemaSink for MemorySink {
    fn write_schema(&mut self, path: &Path, unit: &SchemaUnit, content: &str) -> Result<()> {
        self.files.push((path.to_path_buf(), content.to_string()));
        self.units.push(unit.clone());
        Ok(())
    }
}
