//! protolift - Recover Protocol Buffer schemas from disassembled Android apps
//!
//! This tool walks a tree of `.smali` files produced by a disassembler, finds
//! the classes generated by the Wire compiler and rebuilds `.proto` files from
//! their instruction text.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use protolift_core::proto::descriptor::{build_descriptor_set, encode_descriptor_set, link_check};
use protolift_core::{
    Classifier, Dialect, DirectorySource, Error, Pipeline, PipelineConfig, RunSummary, SchemaSink,
    SchemaUnit,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Recover Protocol Buffer schemas from disassembled Android apps
#[derive(Parser, Debug)]
#[command(name = "protolift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Root of the disassembled tree
    input: PathBuf,

    /// Output directory for recovered .proto files [default: <INPUT>_protolift/proto]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Schema dialect to emit
    #[arg(long, value_enum, default_value = "proto2")]
    dialect: DialectArg,

    /// Skip enum classes
    #[arg(long)]
    no_enums: bool,

    /// Dry run - don't write files, just show what would be written
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing files whose content differs
    #[arg(long)]
    force: bool,

    /// Only list classified classes without extracting
    #[arg(long)]
    list_only: bool,

    /// Also write a binary FileDescriptorSet of every recovered schema
    #[arg(long, value_name = "FILE")]
    descriptor_set: Option<PathBuf>,
}

/// Schema dialect
#[derive(Debug, Clone, Copy, ValueEnum)]
enum DialectArg {
    /// proto2 with explicit optional and packed markers
    Proto2,
    /// proto3 with implicit presence and packing
    Proto3,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Proto2 => Dialect::Proto2,
            DialectArg::Proto3 => Dialect::Proto3,
        }
    }
}

impl Cli {
    fn output_root(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output(&self.input))
    }
}

/// `<INPUT>_protolift/proto`
fn default_output(input: &Path) -> PathBuf {
    let mut name = input.components().as_path().as_os_str().to_os_string();
    name.push("_protolift");
    PathBuf::from(name).join("proto")
}

/// Full blake3 digest of the content
fn content_hash(content: &[u8]) -> blake3::Hash {
    blake3::hash(content)
}

/// What happened to one output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOutcome {
    Written,
    Unchanged,
}

/// Writes rendered schemas below an output root
struct FsSink {
    root: PathBuf,
    force: bool,
    written: usize,
    unchanged: usize,
}

impl FsSink {
    fn new(root: PathBuf, force: bool) -> Self {
        Self {
            root,
            force,
            written: 0,
            unchanged: 0,
        }
    }
}

impl SchemaSink for FsSink {
    fn write_schema(
        &mut self,
        path: &Path,
        _unit: &SchemaUnit,
        content: &str,
    ) -> protolift_core::Result<()> {
        let output_path = self.root.join(path);
        match write_proto_file(&output_path, content, self.force)? {
            WriteOutcome::Written => {
                println!("Wrote {}", output_path.display());
                self.written += 1;
            }
            WriteOutcome::Unchanged => {
                info!("Unchanged: {}", output_path.display());
                self.unchanged += 1;
            }
        }
        Ok(())
    }
}

/// Prints what would be written without touching the filesystem
struct DryRunSink {
    root: PathBuf,
    show_content: bool,
}

impl SchemaSink for DryRunSink {
    fn write_schema(
        &mut self,
        path: &Path,
        _unit: &SchemaUnit,
        content: &str,
    ) -> protolift_core::Result<()> {
        println!("Would write: {}", self.root.join(path).display());
        if self.show_content {
            println!("---");
            println!("{}", content);
            println!("---");
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    if !cli.input.exists() {
        bail!("Input directory does not exist: {}", cli.input.display());
    }
    if !cli.input.is_dir() {
        bail!("Input path is not a directory: {}", cli.input.display());
    }

    let source = DirectorySource::new(&cli.input);
    info!("Scanning directory: {}", cli.input.display());

    if cli.list_only {
        return list_classes(&cli, &source);
    }

    let output = cli.output_root();
    let config = PipelineConfig::new()
        .dialect(cli.dialect.into())
        .include_enums(!cli.no_enums);
    let pipeline = Pipeline::with_config(config);

    let summary = if cli.dry_run {
        let mut sink = DryRunSink {
            root: output,
            show_content: cli.verbose > 0,
        };
        pipeline
            .run(&source, &mut sink)
            .with_context(|| format!("Failed to scan {}", cli.input.display()))?
    } else {
        fs::create_dir_all(&output)
            .with_context(|| format!("Failed to create output directory: {}", output.display()))?;

        let mut sink = FsSink::new(output, cli.force);
        let summary = pipeline
            .run(&source, &mut sink)
            .with_context(|| format!("Failed to scan {}", cli.input.display()))?;
        debug!("{} written, {} unchanged", sink.written, sink.unchanged);
        summary
    };

    if let Some(ref path) = cli.descriptor_set {
        export_descriptor_set(&summary, pipeline.config().dialect, path, cli.dry_run)?;
    }

    print_summary(&summary);
    Ok(())
}

/// Print every classified class and exit
fn list_classes(cli: &Cli, source: &DirectorySource) -> Result<()> {
    let classification = Classifier::new()
        .include_enums(!cli.no_enums)
        .classify(source)
        .with_context(|| format!("Failed to scan {}", cli.input.display()))?;

    for path in &classification.messages {
        println!("message {}", path.display());
    }
    for path in &classification.enums {
        println!("enum    {}", path.display());
    }
    info!(
        "{} candidates, {} matched",
        classification.scanned,
        classification.matched()
    );
    Ok(())
}

fn export_descriptor_set(
    summary: &RunSummary,
    dialect: Dialect,
    path: &Path,
    dry_run: bool,
) -> Result<()> {
    let set = build_descriptor_set(&summary.units, dialect);
    if let Err(e) = link_check(&set) {
        warn!("Recovered schemas do not link: {}", e);
    }

    let bytes = encode_descriptor_set(&set).context("Failed to encode descriptor set")?;
    if dry_run {
        println!("Would write: {} ({} bytes)", path.display(), bytes.len());
        return Ok(());
    }

    fs::write(path, &bytes)
        .with_context(|| format!("Failed to write descriptor set: {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Recovered {} of {} classes ({} messages, {} enums) in {:.2}s",
        summary.emitted,
        summary.found(),
        summary.messages_found,
        summary.enums_found,
        summary.elapsed.as_secs_f64()
    );
    if summary.failed > 0 || summary.read_failures > 0 {
        println!(
            "{} failed ({} malformed), {} unreadable",
            summary.failed, summary.malformed, summary.read_failures
        );
    }
}

/// Write a proto file to disk, leaving identical files untouched
fn write_proto_file(
    output_path: &Path,
    content: &str,
    force: bool,
) -> protolift_core::Result<WriteOutcome> {
    // Create parent directories
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::directory_create(parent, e))?;
    }

    // Check if file exists
    if output_path.exists() {
        let existing = fs::read(output_path).map_err(|e| Error::file_read(output_path, e))?;
        if content_hash(&existing) == content_hash(content.as_bytes()) {
            return Ok(WriteOutcome::Unchanged);
        }
        if !force {
            return Err(Error::OutputExists {
                path: output_path.to_path_buf(),
            });
        }
    }

    // Write the file
    let mut file = fs::File::create(output_path).map_err(|e| Error::file_write(output_path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| Error::file_write(output_path, e))?;

    Ok(WriteOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use protolift_core::ClassPath;
    use tempfile::TempDir;

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("app")),
            Path::new("app_protolift").join("proto")
        );
        assert_eq!(
            default_output(Path::new("work/app/")),
            Path::new("work/app_protolift").join("proto")
        );
    }

    #[test]
    fn test_output_flag_overrides_default() {
        let cli = Cli::parse_from(["protolift", "app", "-o", "out"]);
        assert_eq!(cli.output_root(), PathBuf::from("out"));

        let cli = Cli::parse_from(["protolift", "app"]);
        assert_eq!(cli.output_root(), Path::new("app_protolift").join("proto"));
        assert!(matches!(Dialect::from(cli.dialect), Dialect::Proto2));
    }

    #[test]
    fn test_missing_input_is_rejected() {
        assert!(Cli::try_parse_from(["protolift"]).is_err());
    }

    #[test]
    fn test_content_hash() {
        let hash1 = content_hash(b"hello");
        let hash2 = content_hash(b"hello");
        let hash3 = content_hash(b"world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.to_hex().len(), 64);
    }

    #[test]
    fn test_write_proto_file_outcomes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a/b/Foo.proto");

        assert_eq!(
            write_proto_file(&path, "message Foo {}\n", false).unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(
            write_proto_file(&path, "message Foo {}\n", false).unwrap(),
            WriteOutcome::Unchanged
        );
        assert!(matches!(
            write_proto_file(&path, "message Foo { }\n", false),
            Err(Error::OutputExists { .. })
        ));
        assert_eq!(
            write_proto_file(&path, "message Foo { }\n", true).unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "message Foo { }\n");
    }

    #[test]
    fn test_same_length_edit_is_not_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Foo.proto");

        write_proto_file(&path, "  optional int32 bar = 1;\n", false).unwrap();
        assert!(matches!(
            write_proto_file(&path, "  optional int32 bar = 2;\n", false),
            Err(Error::OutputExists { .. })
        ));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "  optional int32 bar = 1;\n"
        );
    }

    #[test]
    fn test_fs_sink_counts() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = FsSink::new(temp_dir.path().to_path_buf(), false);
        let unit = SchemaUnit::enumeration(ClassPath::new("a/Color").unwrap(), vec![]);
        let path = Path::new("a").join("Color.proto");

        sink.write_schema(&path, &unit, "enum Color {}\n").unwrap();
        sink.write_schema(&path, &unit, "enum Color {}\n").unwrap();
        assert_eq!(sink.written, 1);
        assert_eq!(sink.unchanged, 1);
        assert!(temp_dir.path().join("a/Color.proto").is_file());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
