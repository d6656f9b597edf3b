//! `.proto` rendering of recovered schema units.
//!
//! ## Architecture
//!
//! Rendering is handled by [`SchemaEmitter`], a pure function of a
//! [`SchemaUnit`] and an [`EmitterConfig`]:
//!
//! 1. A fixed provenance header and the `syntax` line of the [`Dialect`]
//! 2. Deduplicated imports (messages only)
//! 3. One `message` or `enum` block named after the class
//!
//! No semantic validation happens here: tags are not checked for uniqueness
//! and type names are not resolved.
//!
//! ## Persistence
//!
//! Rendered text is handed to a [`SchemaSink`], and [`descriptor`] converts a
//! batch of units into a binary `FileDescriptorSet`.

pub mod descriptor;
mod writer;

use crate::error::{Error, Result};
use crate::schema::{EnumValue, FieldDescriptor, SchemaBody, SchemaUnit};
use std::fmt::Write as FmtWrite;

pub use writer::{MemorySink, NullSink, SchemaSink};

/// File extension of emitted schemas
pub const SCHEMA_EXTENSION: &str = "proto";

/// Provenance header placed at the top of every emitted file
pub const HEADER: &str = "/* Reconstructed by protolift from disassembled classes.\n * Definitions may contain inaccuracies. */";

/// Schema language dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Proto2 syntax: singular fields are `optional`, packing is explicit
    #[default]
    Proto2,
    /// Proto3 syntax: singular fields carry no label, packing is the default
    Proto3,
}

impl Dialect {
    /// Returns the syntax declaration string
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Proto2 => "proto2",
            Dialect::Proto3 => "proto3",
        }
    }

    /// Label of a field that is neither repeated nor packed
    pub fn singular_label(&self) -> Option<&'static str> {
        match self {
            Dialect::Proto2 => Some("optional"),
            Dialect::Proto3 => None,
        }
    }

    /// Whether a packed field needs an explicit `[packed=true]` option
    pub fn explicit_packed(&self) -> bool {
        matches!(self, Dialect::Proto2)
    }

    /// Label and trailing option of a field
    pub fn field_qualifiers(&self, field: &FieldDescriptor) -> (Option<&'static str>, Option<&'static str>) {
        if field.repeated {
            (Some("repeated"), None)
        } else if field.packed {
            let option = self.explicit_packed().then_some("[packed=true]");
            (Some("repeated"), option)
        } else {
            (self.singular_label(), None)
        }
    }
}

impl TryFrom<&str> for Dialect {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "" | "proto2" => Ok(Dialect::Proto2),
            "proto3" => Ok(Dialect::Proto3),
            _ => Err(Error::UnsupportedDialect {
                dialect: value.to_string(),
            }),
        }
    }
}

/// Configuration for schema rendering
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Indentation string (default: 2 spaces)
    pub indent_str: String,
    /// Dialect to render
    pub dialect: Dialect,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            indent_str: "  ".to_string(),
            dialect: Dialect::Proto2,
        }
    }
}

impl EmitterConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }

    /// Sets the dialect
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }
}

/// Renders schema units as `.proto` text
#[derive(Debug, Clone, Default)]
pub struct SchemaEmitter {
    config: EmitterConfig,
}

impl SchemaEmitter {
    /// Creates an emitter with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an emitter with custom configuration
    pub fn with_config(config: EmitterConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Render the unit as a string
    pub fn render(&self, unit: &SchemaUnit) -> String {
        let mut output = String::new();
        self.write_to(unit, &mut output)
            .expect("String write cannot fail");
        output
    }

    /// Write the rendered unit to a writer
    pub fn write_to(&self, unit: &SchemaUnit, w: &mut impl FmtWrite) -> std::fmt::Result {
        writeln!(w, "{}", HEADER)?;
        writeln!(w, "syntax = \"{}\";", self.config.dialect.as_str())?;
        writeln!(w)?;

        let name = unit.class_path.name();
        match &unit.body {
            SchemaBody::Message { imports, fields } => {
                let own = unit.class_path.as_str();
                let imports: Vec<_> = imports
                    .deduplicated()
                    .into_iter()
                    .filter(|import| *import != own)
                    .collect();

                for import in &imports {
                    writeln!(w, "import \"{}.{}\";", import, SCHEMA_EXTENSION)?;
                }
                if !imports.is_empty() {
                    writeln!(w)?;
                }

                writeln!(w, "message {} {{", name)?;
                for field in fields {
                    self.write_field(w, field)?;
                }
                writeln!(w, "}}")
            }
            SchemaBody::Enum { values } => {
                writeln!(w, "enum {} {{", name)?;
                for value in values {
                    self.write_enum_value(w, value)?;
                }
                writeln!(w, "}}")
            }
        }
    }

    fn write_field(&self, w: &mut impl FmtWrite, field: &FieldDescriptor) -> std::fmt::Result {
        let (label, option) = self.config.dialect.field_qualifiers(field);

        write!(w, "{}", self.config.indent_str)?;
        if let Some(label) = label {
            write!(w, "{} ", label)?;
        }
        write!(w, "{} {} = {}", field.type_name, field.name, field.tag)?;
        if let Some(option) = option {
            write!(w, " {}", option)?;
        }
        writeln!(w, ";")
    }

    fn write_enum_value(&self, w: &mut impl FmtWrite, value: &EnumValue) -> std::fmt::Result {
        writeln!(w, "{}{} = {};", self.config.indent_str, value.name, value.value)
    }
}
