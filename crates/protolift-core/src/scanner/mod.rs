//! Candidate discovery and classification.
//!
//! This module finds the classes worth extracting. A [`ClassSource`] lists
//! candidate files and reads their text; the [`Classifier`] sorts them into
//! message adapters and Wire enums by looking for two marker strings.
//!
//! ## Precedence
//!
//! A file containing both markers is reported as a message only, so the two
//! lists never overlap.
//!
//! ## Extensibility
//!
//! Any storage can feed the pipeline by implementing [`ClassSource`]:
//!
//! ```no_run
//! use protolift_core::scanner::ClassSource;
//! use protolift_core::Result;
//! use std::path::{Path, PathBuf};
//!
//! struct ArchiveSource;
//!
//! impl ClassSource for ArchiveSource {
//!     fn candidates(&self) -> Result<Vec<PathBuf>> {
//!         Ok(vec![])
//!     }
//!
//!     fn read(&self, id: &Path) -> Result<String> {
//!         unimplemented!("read {}", id.display())
//!     }
//! }
//! ```

mod source;

use crate::error::Result;
use crate::schema::SchemaKind;
use crate::smali::{ENCODE_SIGNATURE, ENUM_MARKER};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

pub use source::{DirectorySource, MemorySource, SMALI_EXTENSION};

/// Provider of disassembled class text
pub trait ClassSource: Send + Sync {
    /// Lists candidate identifiers in a deterministic order.
    ///
    /// Failing here is fatal for the whole run.
    fn candidates(&self) -> Result<Vec<PathBuf>>;

    /// Reads the full text of one candidate
    fn read(&self, id: &Path) -> Result<String>;
}

/// Decides which kind of schema a class text describes, if any
pub fn classify_text(text: &str) -> Option<SchemaKind> {
    let message = text.contains(ENCODE_SIGNATURE);
    let enumeration = text.contains(ENUM_MARKER);

    match (message, enumeration) {
        (true, true) => {
            debug!("both markers present, treating class as message");
            Some(SchemaKind::Message)
        }
        (true, false) => Some(SchemaKind::Message),
        (false, true) => Some(SchemaKind::Enum),
        (false, false) => None,
    }
}

/// Result of classifying every candidate of a source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Message adapter classes, in source order
    pub messages: Vec<PathBuf>,
    /// Wire enum classes, in source order
    pub enums: Vec<PathBuf>,
    /// Number of candidates inspected
    pub scanned: usize,
    /// Candidates that could not be read
    pub read_failures: usize,
}

impl Classification {
    /// Total number of matched classes
    pub fn matched(&self) -> usize {
        self.messages.len() + self.enums.len()
    }
}

/// Sorts candidates into messages and enums
#[derive(Debug, Clone)]
pub struct Classifier {
    include_enums: bool,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Creates a classifier reporting both messages and enums
    pub fn new() -> Self {
        Self {
            include_enums: true,
        }
    }

    /// Sets whether enum classes are reported
    pub fn include_enums(mut self, include: bool) -> Self {
        self.include_enums = include;
        self
    }

    /// Classifies every candidate of `source`.
    ///
    /// Unreadable candidates are logged and counted; only failing to list the
    /// candidates is an error.
    pub fn classify(&self, source: &dyn ClassSource) -> Result<Classification> {
        let mut classification = Classification::default();

        for id in source.candidates()? {
            classification.scanned += 1;

            let text = match source.read(&id) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Error reading {}: {}", id.display(), e);
                    classification.read_failures += 1;
                    continue;
                }
            };

            match classify_text(&text) {
                Some(SchemaKind::Message) => {
                    trace!("Message class: {}", id.display());
                    classification.messages.push(id);
                }
                Some(SchemaKind::Enum) if self.include_enums => {
                    trace!("Enum class: {}", id.display());
                    classification.enums.push(id);
                }
                _ => {}
            }
        }

        debug!(
            "Classified {} candidates: {} messages, {} enums",
            classification.scanned,
            classification.messages.len(),
            classification.enums.len()
        );
        Ok(classification)
    }
}
