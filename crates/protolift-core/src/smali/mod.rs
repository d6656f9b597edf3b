//! Smali instruction recognition.
//!
//! This module knows just enough of the baksmali text format to follow the
//! code Square Wire generates for its adapters. Each line of a method body is
//! turned into an [`Instruction`]; everything the extractors do not care about
//! becomes [`Instruction::Other`].
//!
//! ## Marker constants
//!
//! The constants below are fixed by the Wire code generator. They are matched
//! byte for byte and are not configurable.

mod descriptor;
mod literal;
mod registers;

use crate::error::{Error, Result};
use crate::schema::ClassPath;
use lazy_static::lazy_static;
use regex::Regex;

pub use descriptor::{parse_parameters, register_offsets, TypeDescriptor};
pub use literal::decode_hex_literal;
pub use registers::{RegisterFile, Symbol};

/// Bridge method every Wire message adapter implements
pub const ENCODE_SIGNATURE: &str =
    ".method public final encode(Lcom/squareup/wire/ProtoWriter;Ljava/lang/Object;)V";

/// Interface implemented by every Wire enum
pub const ENUM_MARKER: &str = ".implements Lcom/squareup/wire/WireEnum;";

/// Static field holding the adapter of a generated message or enum
pub const ADAPTER_FIELD: &str = "ADAPTER";

/// Adapter call marking a field as repeated
pub const REPEATED_WRAPPER: &str =
    "Lcom/squareup/wire/ProtoAdapter;->asRepeated()Lcom/squareup/wire/ProtoAdapter;";

/// Adapter call marking a field as packed
pub const PACKED_WRAPPER: &str =
    "Lcom/squareup/wire/ProtoAdapter;->asPacked()Lcom/squareup/wire/ProtoAdapter;";

/// Adapter call writing one tagged field
pub const ENCODE_WITH_TAG: &str = "Lcom/squareup/wire/ProtoAdapter;->encodeWithTag(Lcom/squareup/wire/ProtoWriter;ILjava/lang/Object;)V";

/// Signature of the class static initializer
pub const STATIC_INITIALIZER: &str = "<clinit>()V";

lazy_static! {
    static ref CONST: Regex =
        Regex::new(r"^const(?:-wide)?(?:/(?:\d+|high16))?\s+(\w+),\s*(-?0[xX][0-9a-fA-F]+)").unwrap();
    static ref CONST_STRING: Regex =
        Regex::new(r#"^const-string(?:/jumbo)?\s+(\w+),\s*"((?:[^"\\]|\\.)*)""#).unwrap();
    static ref SGET_OBJECT: Regex =
        Regex::new(r"^sget-object\s+(\w+),\s*L([^;]+);->([\w$]+):L[^;]+;").unwrap();
    static ref IGET_OBJECT: Regex =
        Regex::new(r"^iget-object\s+(\w+),\s*\w+,\s*L[^;]+;->([\w$]+):\[*L[^;]+;").unwrap();
    static ref WRAPPER: Regex = Regex::new(
        r"^invoke-virtual\s+\{(\w+)\},\s*Lcom/squareup/wire/ProtoAdapter;->as(Repeated|Packed)\(\)Lcom/squareup/wire/ProtoAdapter;"
    )
    .unwrap();
    static ref ENCODE_CALL: Regex = Regex::new(&format!(
        r"^invoke-virtual\s+\{{(\w+),\s*\w+,\s*(\w+),\s*(\w+)\}},\s*{}",
        regex::escape(ENCODE_WITH_TAG)
    ))
    .unwrap();
    static ref MOVE_RESULT_OBJECT: Regex = Regex::new(r"^move-result-object\s+(\w+)").unwrap();
    static ref CHECK_CAST: Regex = Regex::new(r"^check-cast\s+\w+,\s*L([^;]+);").unwrap();
    static ref NEW_INSTANCE: Regex = Regex::new(r"^new-instance\s+\w+,\s*L([^;]+);").unwrap();
}

/// Which cardinality an adapter wrapper call applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// `asRepeated()`
    Repeated,
    /// `asPacked()`
    Packed,
}

/// One recognized line of a method body.
///
/// Borrowed parts point into the original line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// `const/<width> <reg>, <hex>`
    Const {
        /// Destination register
        register: &'a str,
        /// Decoded literal
        value: i64,
    },
    /// `const-string <reg>, "<text>"`
    ConstString {
        /// Destination register
        register: &'a str,
        /// Literal text, escapes left as written
        value: &'a str,
    },
    /// `sget-object <reg>, L<owner>;-><field>:L<type>;`
    StaticField {
        /// Destination register
        register: &'a str,
        /// Class owning the field
        owner: &'a str,
        /// Field name
        field: &'a str,
    },
    /// `iget-object <reg>, <obj>, L<owner>;-><field>:L<type>;`
    InstanceField {
        /// Destination register
        register: &'a str,
        /// Field name
        field: &'a str,
    },
    /// `invoke-virtual {<reg>}, ...ProtoAdapter;->asRepeated()` and `asPacked()`
    Wrap {
        /// Which wrapper is applied
        cardinality: Cardinality,
        /// Register holding the wrapped adapter
        source: &'a str,
    },
    /// `move-result-object <reg>`
    MoveResultObject {
        /// Destination register
        register: &'a str,
    },
    /// `invoke-virtual {<adapter>, <writer>, <tag>, <value>}, ...encodeWithTag`
    EncodeWithTag {
        /// Register holding the field adapter
        adapter: &'a str,
        /// Register holding the tag
        tag: &'a str,
        /// Register holding the field value
        value: &'a str,
    },
    /// `check-cast <reg>, L<class>;`
    CheckCast {
        /// Cast target
        class: &'a str,
    },
    /// `new-instance <reg>, L<class>;`
    NewInstance {
        /// Instantiated class
        class: &'a str,
    },
    /// `return-void`
    ReturnVoid,
    /// `.end method`
    EndMethod,
    /// Anything else
    Other,
}

impl<'a> Instruction<'a> {
    /// Recognizes a single line. `line_no` is only used for error reporting.
    pub fn parse(line: &'a str, line_no: usize) -> Result<Self> {
        let text = line.trim();
        let Some(op) = opcode(text) else {
            return Ok(Instruction::Other);
        };

        let instruction = match op {
            "return-void" => Instruction::ReturnVoid,
            ".end" if text.starts_with(".end method") => Instruction::EndMethod,
            op if op.starts_with("const-string") => CONST_STRING
                .captures(text)
                .map(|caps| Instruction::ConstString {
                    register: caps.get(1).map_or("", |m| m.as_str()),
                    value: caps.get(2).map_or("", |m| m.as_str()),
                })
                .unwrap_or(Instruction::Other),
            op if op.starts_with("const") => match CONST.captures(text) {
                Some(caps) => {
                    let literal = caps.get(2).map_or("", |m| m.as_str());
                    let value = decode_hex_literal(literal)
                        .ok_or_else(|| Error::invalid_literal(literal, line_no))?;
                    Instruction::Const {
                        register: caps.get(1).map_or("", |m| m.as_str()),
                        value,
                    }
                }
                None => Instruction::Other,
            },
            "sget-object" => SGET_OBJECT
                .captures(text)
                .map(|caps| Instruction::StaticField {
                    register: caps.get(1).map_or("", |m| m.as_str()),
                    owner: caps.get(2).map_or("", |m| m.as_str()),
                    field: caps.get(3).map_or("", |m| m.as_str()),
                })
                .unwrap_or(Instruction::Other),
            "iget-object" => IGET_OBJECT
                .captures(text)
                .map(|caps| Instruction::InstanceField {
                    register: caps.get(1).map_or("", |m| m.as_str()),
                    field: caps.get(2).map_or("", |m| m.as_str()),
                })
                .unwrap_or(Instruction::Other),
            "invoke-virtual" => {
                if let Some(caps) = ENCODE_CALL.captures(text) {
                    Instruction::EncodeWithTag {
                        adapter: caps.get(1).map_or("", |m| m.as_str()),
                        tag: caps.get(2).map_or("", |m| m.as_str()),
                        value: caps.get(3).map_or("", |m| m.as_str()),
                    }
                } else if let Some(caps) = WRAPPER.captures(text) {
                    let cardinality = match caps.get(2).map(|m| m.as_str()) {
                        Some("Packed") => Cardinality::Packed,
                        _ => Cardinality::Repeated,
                    };
                    Instruction::Wrap {
                        cardinality,
                        source: caps.get(1).map_or("", |m| m.as_str()),
                    }
                } else {
                    Instruction::Other
                }
            }
            "move-result-object" => MOVE_RESULT_OBJECT
                .captures(text)
                .map(|caps| Instruction::MoveResultObject {
                    register: caps.get(1).map_or("", |m| m.as_str()),
                })
                .unwrap_or(Instruction::Other),
            "check-cast" => CHECK_CAST
                .captures(text)
                .map(|caps| Instruction::CheckCast {
                    class: caps.get(1).map_or("", |m| m.as_str()),
                })
                .unwrap_or(Instruction::Other),
            "new-instance" => NEW_INSTANCE
                .captures(text)
                .map(|caps| Instruction::NewInstance {
                    class: caps.get(1).map_or("", |m| m.as_str()),
                })
                .unwrap_or(Instruction::Other),
            _ => Instruction::Other,
        };

        Ok(instruction)
    }
}

/// First whitespace separated token of a trimmed line
fn opcode(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

/// A constructor call on one specific class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorCall<'a> {
    /// Argument registers, receiver first, ranges expanded
    pub registers: Vec<String>,
    /// Parameter descriptors between the parentheses
    pub signature: &'a str,
}

/// Recognizes `invoke-direct` constructor calls of a single class.
///
/// The pattern is keyed to the class path, so it can only be built once the
/// class path of the initializer is known.
#[derive(Debug, Clone)]
pub struct ConstructorMatcher {
    pattern: Regex,
}

impl ConstructorMatcher {
    /// Builds a matcher for constructors of `class_path`
    pub fn new(class_path: &ClassPath) -> Result<Self> {
        let pattern = Regex::new(&format!(
            r"^invoke-direct(?:/range)?\s+\{{([^}}]*)\}},\s*L{};-><init>\(([^)]*)\)V",
            regex::escape(class_path.as_str())
        ))
        .map_err(|_| Error::InvalidClassPath(class_path.to_string()))?;

        Ok(Self { pattern })
    }

    /// Returns the call if `line` invokes a constructor of the class
    pub fn matches<'a>(&self, line: &'a str) -> Option<ConstructorCall<'a>> {
        let caps = self.pattern.captures(line.trim())?;
        let registers = expand_register_list(caps.get(1)?.as_str())?;
        Some(ConstructorCall {
            registers,
            signature: caps.get(2)?.as_str(),
        })
    }
}

/// Highest register index addressable by a method
const MAX_REGISTER: usize = u16::MAX as usize;

/// Expands an invoke register list.
///
/// Handles both `v0, v1, v2` and the range form `v0 .. v3`. Ranges reaching
/// past the last addressable register are rejected.
pub fn expand_register_list(list: &str) -> Option<Vec<String>> {
    let list = list.trim();
    if list.is_empty() {
        return Some(Vec::new());
    }

    if let Some((first, last)) = list.split_once("..") {
        let (first, last) = (first.trim(), last.trim());
        let prefix = first.chars().next()?;
        if last.chars().next()? != prefix {
            return None;
        }
        let start: usize = first[prefix.len_utf8()..].parse().ok()?;
        let end: usize = last[prefix.len_utf8()..].parse().ok()?;
        if end < start || end > MAX_REGISTER {
            return None;
        }
        return Some((start..=end).map(|n| format!("{}{}", prefix, n)).collect());
    }

    Some(list.split(',').map(|r| r.trim().to_string()).collect())
}
