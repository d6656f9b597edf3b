//! Recovered schema model.
//!
//! A [`SchemaUnit`] is everything the extractors recover from one class: its
//! [`ClassPath`] plus either ordered message fields and imports, or ordered
//! enum values.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Slash delimited class identifier, e.g. `com/example/Foo`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassPath(String);

impl ClassPath {
    /// Creates a class path, rejecting empty or slash-bounded input
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.is_empty() || path.starts_with('/') || path.ends_with('/') {
            return Err(Error::InvalidClassPath(path));
        }
        Ok(Self(path))
    }

    /// The raw slash delimited path
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment, used as the message or enum name
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Everything before the last segment
    pub fn namespace(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(namespace, _)| namespace)
    }

    /// Namespace in dotted protobuf package form (`com.example`)
    pub fn package(&self) -> String {
        self.namespace()
            .map(|ns| ns.replace('/', "."))
            .unwrap_or_default()
    }

    /// Relative file name with the given extension, e.g. `com/example/Foo.proto`
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }

    /// Relative output path, refusing segments that could escape the output root
    pub fn output_path(&self, extension: &str) -> Result<PathBuf> {
        let mut path = PathBuf::new();
        for segment in self.0.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(Error::path_traversal(self.file_name(extension)));
            }
            path.push(segment);
        }
        path.set_file_name(format!("{}.{}", self.name(), extension));
        Ok(path)
    }
}

impl fmt::Display for ClassPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One recovered message field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name (the generated Java/Kotlin property name)
    pub name: String,
    /// Scalar keyword (`int32`) or short referenced type name (`Bar`)
    pub type_name: String,
    /// Wire tag
    pub tag: u32,
    /// Wrapped with `asRepeated()`
    pub repeated: bool,
    /// Wrapped with `asPacked()`
    pub packed: bool,
}

/// One recovered enum constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    /// Constant name
    pub name: String,
    /// Wire value
    pub value: i64,
}

/// Insertion ordered list of referenced class paths.
///
/// Duplicates are kept as recorded; [`ImportSet::deduplicated`] removes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSet(Vec<String>);

impl ImportSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reference
    pub fn push(&mut self, class_path: impl Into<String>) {
        self.0.push(class_path.into());
    }

    /// All recorded references, duplicates included
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// References in first occurrence order without duplicates
    pub fn deduplicated(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.0
            .iter()
            .map(String::as_str)
            .filter(|import| seen.insert(*import))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ImportSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// The two kinds of schema a class can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// `message` block
    Message,
    /// `enum` block
    Enum,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Message => f.write_str("message"),
            SchemaKind::Enum => f.write_str("enum"),
        }
    }
}

/// Kind specific content of a schema unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaBody {
    /// Message fields in declaration order
    Message {
        /// Referenced message and enum classes
        imports: ImportSet,
        /// Fields in encode order
        fields: Vec<FieldDescriptor>,
    },
    /// Enum constants in initializer order
    Enum {
        /// Values in declaration order
        values: Vec<EnumValue>,
    },
}

/// Everything recovered from one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaUnit {
    /// Class the schema was recovered from
    pub class_path: ClassPath,
    /// Message or enum content
    pub body: SchemaBody,
}

impl SchemaUnit {
    /// Creates a message unit
    pub fn message(class_path: ClassPath, imports: ImportSet, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            class_path,
            body: SchemaBody::Message { imports, fields },
        }
    }

    /// Creates an enum unit
    pub fn enumeration(class_path: ClassPath, values: Vec<EnumValue>) -> Self {
        Self {
            class_path,
            body: SchemaBody::Enum { values },
        }
    }

    /// Message or enum
    pub fn kind(&self) -> SchemaKind {
        match self.body {
            SchemaBody::Message { .. } => SchemaKind::Message,
            SchemaBody::Enum { .. } => SchemaKind::Enum,
        }
    }
}
