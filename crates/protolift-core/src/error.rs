//! Error types for the protolift-core library.
//!
//! Every failure mode of the pipeline is a variant of [`Error`]. Variants fall
//! into three groups: fatal traversal errors, per-class malformed input, and
//! per-class persistence errors. Only the first group aborts a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for protolift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all protolift operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Output file already exists with different content
    #[error("output '{path}' already exists with different content")]
    OutputExists {
        /// Path of the existing file
        path: PathBuf,
    },

    /// Path traversal attempt detected (security error)
    #[error("path traversal detected: '{path}' would escape output directory")]
    PathTraversal {
        /// The suspicious path
        path: PathBuf,
    },

    /// The input tree could not be walked
    #[error("failed to traverse '{root}': {source}")]
    Traversal {
        /// Root of the traversal
        root: PathBuf,
        /// Underlying walk error
        #[source]
        source: walkdir::Error,
    },

    /// Expected method body is missing from the class
    #[error("malformed input: method '{method}' not found")]
    MissingMethod {
        /// Human readable name of the method
        method: &'static str,
    },

    /// No class reference found in the method body
    #[error("malformed input: no {instruction} resolving the class path after line {line}")]
    UnresolvedClassPath {
        /// Instruction kind that was searched for
        instruction: &'static str,
        /// Line (1-based) where the search started
        line: usize,
    },

    /// Method body ended without a `return-void`
    #[error("malformed input: method '{method}' is not terminated by return-void")]
    UnterminatedMethod {
        /// Human readable name of the method
        method: &'static str,
    },

    /// A cardinality wrapper call had no `move-result-object` before the next field
    #[error("malformed input: no move-result-object follows the adapter wrapper at line {line}")]
    MissingMoveResult {
        /// Line (1-based) of the wrapper call
        line: usize,
    },

    /// Name or value slot of an enum constructor could not be mapped to a register
    #[error("malformed input: cannot resolve {slot} slot of constructor ({signature}) at line {line}")]
    UnresolvedConstructorSlot {
        /// Slot that failed (`name` or `value`)
        slot: &'static str,
        /// Constructor parameter signature
        signature: String,
        /// Line (1-based) of the constructor call
        line: usize,
    },

    /// Numeric literal could not be decoded
    #[error("malformed input: invalid literal '{literal}' at line {line}")]
    InvalidLiteral {
        /// The literal text
        literal: String,
        /// Line (1-based) of the literal
        line: usize,
    },

    /// Class path is empty or otherwise unusable
    #[error("invalid class path '{0}'")]
    InvalidClassPath(String),

    /// Unsupported schema dialect
    #[error("unsupported dialect: {dialect}")]
    UnsupportedDialect {
        /// The requested dialect
        dialect: String,
    },

    /// Failed to encode a descriptor set
    #[error("failed to encode descriptor set: {0}")]
    DescriptorEncode(#[from] prost::EncodeError),

    /// Failed to build file descriptors with prost-reflect
    #[error("failed to build file descriptor: {0}")]
    DescriptorBuild(String),
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new path traversal error
    pub fn path_traversal(path: impl Into<PathBuf>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Creates a new invalid literal error
    pub fn invalid_literal(literal: impl Into<String>, line: usize) -> Self {
        Self::InvalidLiteral {
            literal: literal.into(),
            line,
        }
    }

    /// Creates a new descriptor build error
    pub fn descriptor_build(msg: impl Into<String>) -> Self {
        Self::DescriptorBuild(msg.into())
    }

    /// Returns true if the error stems from unexpected instruction text
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MissingMethod { .. }
                | Self::UnresolvedClassPath { .. }
                | Self::UnterminatedMethod { .. }
                | Self::MissingMoveResult { .. }
                | Self::UnresolvedConstructorSlot { .. }
                | Self::InvalidLiteral { .. }
                | Self::InvalidClassPath(_)
        )
    }
}
