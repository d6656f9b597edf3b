//! Enum value recovery from the static initializer.
//!
//! Every constant of a Wire enum is created in `<clinit>`:
//!
//! ```text
//! new-instance v0, Lcom/example/Color;
//! const-string v1, "RED"
//! const/4 v2, 0x0
//! invoke-direct {v0, v1, v2, v2}, Lcom/example/Color;-><init>(Ljava/lang/String;II)V
//! ```
//!
//! The constructor receives the constant name, the synthetic ordinal and the
//! wire value. The parameter descriptors decide which argument register holds
//! which of them.

use super::{resolve_class_path, ClassReference};
use crate::error::{Error, Result};
use crate::schema::{EnumValue, SchemaUnit};
use crate::smali::{
    parse_parameters, register_offsets, ConstructorCall, ConstructorMatcher, Instruction,
    RegisterFile, Symbol, TypeDescriptor, STATIC_INITIALIZER,
};
use tracing::{debug, trace};

const METHOD: &str = "<clinit>";

/// Recover the enum schema from the text of a `WireEnum` class
pub fn extract_enum(source: &str) -> Result<SchemaUnit> {
    let lines: Vec<&str> = source.lines().collect();

    let start = lines
        .iter()
        .position(|line| line.trim_start().starts_with(".method") && line.contains(STATIC_INITIALIZER))
        .ok_or(Error::MissingMethod { method: METHOD })?;

    let (class_path, _) = resolve_class_path(&lines, start + 1, ClassReference::NewInstance)?;
    let constructor = ConstructorMatcher::new(&class_path)?;

    let mut registers = RegisterFile::new();
    let mut values = Vec::new();

    for (idx, line) in lines.iter().enumerate().skip(start + 1) {
        let line_no = idx + 1;
        match Instruction::parse(line, line_no)? {
            Instruction::ConstString { register, value } => {
                registers.bind(register, Symbol::Literal(value.to_string()));
            }
            Instruction::Const { register, value } => {
                registers.bind(register, Symbol::Integer(value));
            }
            Instruction::ReturnVoid => {
                debug!(class = %class_path, values = values.len(), "recovered enum");
                return Ok(SchemaUnit::enumeration(class_path, values));
            }
            Instruction::EndMethod => break,
            _ => {
                if let Some(call) = constructor.matches(line) {
                    let value = constant_of(&call, &registers, line_no)?;
                    trace!(?value, "enum value");
                    values.push(value);
                }
            }
        }
    }

    Err(Error::UnterminatedMethod { method: METHOD })
}

/// Maps the name and value parameters of a constructor call to their registers.
///
/// The name is the first `String` parameter. The value is the last `int`
/// parameter, so that in `(String name, int ordinal, int value)` the ordinal is
/// skipped.
fn constant_of(call: &ConstructorCall<'_>, registers: &RegisterFile, line: usize) -> Result<EnumValue> {
    let unresolved = |slot: &'static str| Error::UnresolvedConstructorSlot {
        slot,
        signature: call.signature.to_string(),
        line,
    };

    let params = parse_parameters(call.signature).ok_or_else(|| unresolved("value"))?;
    let offsets = register_offsets(&params);

    let value_slot = params
        .iter()
        .rposition(TypeDescriptor::is_int)
        .ok_or_else(|| unresolved("value"))?;
    let name_slot = params
        .iter()
        .position(TypeDescriptor::is_string)
        .ok_or_else(|| unresolved("name"))?;

    let name_register = call
        .registers
        .get(offsets[name_slot])
        .ok_or_else(|| unresolved("name"))?;
    let value_register = call
        .registers
        .get(offsets[value_slot])
        .ok_or_else(|| unresolved("value"))?;

    Ok(EnumValue {
        name: registers.resolve_text(name_register, line),
        value: registers.resolve_integer(value_register, line).unwrap_or(0),
    })
}
