//! Batch orchestration: classify, extract, render and persist.

use crate::error::Result;
use crate::extract::{extract_enum, extract_message};
use crate::proto::{Dialect, EmitterConfig, SchemaEmitter, SchemaSink, SCHEMA_EXTENSION};
use crate::scanner::{ClassSource, Classifier};
use crate::schema::{SchemaKind, SchemaUnit};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Dialect of the emitted schemas
    pub dialect: Dialect,
    /// Whether enum classes are extracted
    pub include_enums: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Proto2,
            include_enums: true,
        }
    }
}

impl PipelineConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dialect
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets whether enum classes are extracted
    pub fn include_enums(mut self, include: bool) -> Self {
        self.include_enums = include;
        self
    }
}

/// Outcome of one batch
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Candidates inspected by the classifier
    pub scanned: usize,
    /// Message classes found
    pub messages_found: usize,
    /// Enum classes found
    pub enums_found: usize,
    /// Schemas handed to the sink successfully
    pub emitted: usize,
    /// Classes that failed extraction or persistence
    pub failed: usize,
    /// Of the failures, those caused by unexpected instruction text
    pub malformed: usize,
    /// Candidates the classifier could not read
    pub read_failures: usize,
    /// Wall clock time of the run
    pub elapsed: Duration,
    /// Every emitted unit, in emission order
    pub units: Vec<SchemaUnit>,
}

impl RunSummary {
    /// Classes matched by the classifier
    pub fn found(&self) -> usize {
        self.messages_found + self.enums_found
    }
}

/// Runs a whole batch against a source and a sink
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
    emitter: SchemaEmitter,
}

impl Pipeline {
    /// Creates a pipeline with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pipeline with custom configuration
    pub fn with_config(config: PipelineConfig) -> Self {
        let emitter = SchemaEmitter::with_config(EmitterConfig::new().dialect(config.dialect));
        Self { config, emitter }
    }

    /// The active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes every message class, then every enum class.
    ///
    /// Only a failure to enumerate the source aborts the run; every other
    /// failure drops the affected class and is counted in the summary.
    pub fn run(&self, source: &dyn ClassSource, sink: &mut dyn SchemaSink) -> Result<RunSummary> {
        let started = Instant::now();

        let classification = Classifier::new()
            .include_enums(self.config.include_enums)
            .classify(source)?;

        let mut summary = RunSummary {
            scanned: classification.scanned,
            messages_found: classification.messages.len(),
            enums_found: classification.enums.len(),
            read_failures: classification.read_failures,
            ..Default::default()
        };

        let batch = classification
            .messages
            .iter()
            .map(|id| (id, SchemaKind::Message))
            .chain(classification.enums.iter().map(|id| (id, SchemaKind::Enum)));

        for (id, kind) in batch {
            match self.process(source, sink, id, kind) {
                Ok(unit) => {
                    summary.emitted += 1;
                    summary.units.push(unit);
                }
                Err(e) => {
                    summary.failed += 1;
                    if e.is_malformed() {
                        summary.malformed += 1;
                        warn!("Skipping {} {}: {}", kind, id.display(), e);
                    } else {
                        error!("Failed to emit {} {}: {}", kind, id.display(), e);
                    }
                }
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            "Emitted {} of {} classes ({} failed) in {:.2}s",
            summary.emitted,
            summary.found(),
            summary.failed,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    fn process(
        &self,
        source: &dyn ClassSource,
        sink: &mut dyn SchemaSink,
        id: &Path,
        kind: SchemaKind,
    ) -> Result<SchemaUnit> {
        let text = source.read(id)?;
        let unit = match kind {
            SchemaKind::Message => extract_message(&text)?,
            SchemaKind::Enum => extract_enum(&text)?,
        };

        let path = unit.class_path.output_path(SCHEMA_EXTENSION)?;
        let content = self.emitter.render(&unit);
        sink.write_schema(&path, &unit, &content)?;

        debug!("{} -> {}", id.display(), path.display());
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{adapter_of, color_enum, field, foo_message, message_class, scalar};
    use crate::proto::{MemorySink, HEADER};
    use crate::scanner::MemorySource;
    use std::path::PathBuf;

    fn batch() -> MemorySource {
        let mut body = field(&scalar("STRING"), None, 1, "a/b/Bar", "name");
        body.push_str(&field(&adapter_of("a/b/Color"), None, 2, "a/b/Bar", "color"));
        body.push_str("    return-void\n");

        let mut source = MemorySource::new();
        source.insert("smali/a/b/Bar$Companion$ADAPTER$1.smali", message_class("a/b/Bar", &body));
        source.insert("smali/a/b/Color.smali", color_enum());
        source.insert("smali/a/b/Foo$Companion$ADAPTER$1.smali", foo_message());
        source.insert("smali/a/b/Plain.smali", ".class public La/b/Plain;");
        source
    }

    #[test]
    fn test_run_emits_every_class() {
        let source = batch();
        let mut sink = MemorySink::new();
        let summary = Pipeline::new().run(&source, &mut sink).unwrap();

        assert_eq!(summary.scanned, 4);
        assert_eq!(summary.messages_found, 2);
        assert_eq!(summary.enums_found, 1);
        assert_eq!(summary.emitted, 3);
        assert_eq!(summary.failed, 0);

        let paths: Vec<_> = sink.files.iter().map(|(path, _)| path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("a/b/Bar.proto"),
                PathBuf::from("a/b/Foo.proto"),
                PathBuf::from("a/b/Color.proto"),
            ]
        );

        let foo = sink.get("a/b/Foo.proto").unwrap();
        assert!(foo.starts_with(HEADER));
        assert!(foo.contains("message Foo {"));
        assert!(foo.contains("  optional int32 bar = 1;"));
        assert!(!foo.contains("import"));

        let bar = sink.get("a/b/Bar.proto").unwrap();
        assert!(bar.contains("import \"a/b/Color.proto\";"));
        assert!(bar.contains("  optional Color color = 2;"));

        let color = sink.get("a/b/Color.proto").unwrap();
        assert!(color.contains("enum Color {\n  RED = 0;\n  GREEN = 1;\n}"));
    }

    #[test]
    fn test_broken_class_does_not_affect_batch() {
        let mut source = batch();
        let broken = field(&scalar("INT32"), None, 1, "a/b/Broken", "bar");
        source.insert(
            "smali/a/b/Broken$Companion$ADAPTER$1.smali",
            message_class("a/b/Broken", &broken),
        );

        let mut sink = MemorySink::new();
        let summary = Pipeline::new().run(&source, &mut sink).unwrap();

        assert_eq!(summary.messages_found, 3);
        assert_eq!(summary.emitted, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.malformed, 1);
        assert!(sink.get("a/b/Broken.proto").is_none());
        assert!(sink.get("a/b/Foo.proto").is_some());
    }

    #[test]
    fn test_enums_can_be_skipped() {
        let source = batch();
        let mut sink = MemorySink::new();
        let config = PipelineConfig::new().include_enums(false);
        let summary = Pipeline::with_config(config).run(&source, &mut sink).unwrap();

        assert_eq!(summary.enums_found, 0);
        assert_eq!(summary.emitted, 2);
        assert!(sink.units.iter().all(|unit| unit.kind() == SchemaKind::Message));
    }

    #[test]
    fn test_proto3_dialect() {
        let source = batch();
        let mut sink = MemorySink::new();
        let config = PipelineConfig::new().dialect(Dialect::Proto3);
        Pipeline::with_config(config).run(&source, &mut sink).unwrap();

        let foo = sink.get("a/b/Foo.proto").unwrap();
        assert!(foo.contains("syntax = \"proto3\";"));
        assert!(foo.contains("  int32 bar = 1;"));
    }

    #[test]
    fn test_traversal_escape_is_a_class_failure() {
        let mut source = MemorySource::new();
        let body = format!("{}    return-void\n", field(&scalar("INT32"), None, 1, "a/../Evil", "bar"));
        source.insert("smali/Evil.smali", message_class("a/../Evil", &body));

        let mut sink = MemorySink::new();
        let summary = Pipeline::new().run(&source, &mut sink).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.malformed, 0);
        assert!(sink.files.is_empty());
    }
}
