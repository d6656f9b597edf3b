//! # protolift-core
//!
//! A library for recovering Protocol Buffer schemas from disassembled Android
//! classes generated by the Wire compiler.
//!
//! This crate provides the core functionality for:
//! - Finding message adapters and Wire enums in a tree of `.smali` files
//! - Recovering field and enum value definitions from their instruction text
//! - Rendering the recovered definitions as `.proto` files
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`scanner`]: Candidate discovery and classification
//! - [`smali`]: Instruction recognition and register tracking
//! - [`extract`]: Message and enum recovery
//! - [`schema`]: The recovered schema model
//! - [`proto`]: `.proto` rendering and descriptor export
//! - [`pipeline`]: Batch orchestration
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use protolift_core::{DirectorySource, MemorySink, Pipeline};
//!
//! let source = DirectorySource::new("./app/smali");
//! let mut sink = MemorySink::new();
//! let summary = Pipeline::new().run(&source, &mut sink)?;
//!
//! for (path, content) in &sink.files {
//!     println!("// {}\n{}", path.display(), content);
//! }
//! println!("{} of {} classes recovered", summary.emitted, summary.found());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`ClassSource`]: Feed class text from any storage
//! - [`SchemaSink`]: Decide where rendered schemas go
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod extract;
pub mod pipeline;
pub mod proto;
pub mod scanner;
pub mod schema;
pub mod smali;

#[cfg(test)]
mod fixtures;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use extract::{extract_enum, extract_message};
pub use pipeline::{Pipeline, PipelineConfig, RunSummary};
pub use proto::{Dialect, EmitterConfig, MemorySink, NullSink, SchemaEmitter, SchemaSink};
pub use scanner::{ClassSource, Classifier, DirectorySource, MemorySource};
pub use schema::{ClassPath, SchemaKind, SchemaUnit};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
