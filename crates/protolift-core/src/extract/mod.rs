//! Schema extraction from smali method bodies.
//!
//! Both extractors simulate a small symbolic machine over a single method:
//!
//! - [`extract_message`] walks the typed `encode` method of a message adapter
//!   and records one [`FieldDescriptor`](crate::schema::FieldDescriptor) per
//!   `encodeWithTag` call.
//! - [`extract_enum`] walks the `<clinit>` of an enum class and records one
//!   [`EnumValue`](crate::schema::EnumValue) per constructor call.
//!
//! Registers are tracked in a fresh [`RegisterFile`](crate::smali::RegisterFile)
//! per class. Unresolved registers are reported with `warn!` and produce empty
//! values instead of aborting the class.

mod enumeration;
mod message;

use crate::error::{Error, Result};
use crate::schema::ClassPath;
use crate::smali::Instruction;
use tracing::debug;

pub use enumeration::extract_enum;
pub use message::extract_message;

/// Instruction that names the class a method works on
#[derive(Debug, Clone, Copy)]
enum ClassReference {
    CheckCast,
    NewInstance,
}

impl ClassReference {
    fn mnemonic(self) -> &'static str {
        match self {
            ClassReference::CheckCast => "check-cast",
            ClassReference::NewInstance => "new-instance",
        }
    }
}

/// Finds the class path from the first matching instruction at or after `from`.
///
/// Returns the class path and the index of the line it was found on. The
/// search stops at the end of the method.
fn resolve_class_path(
    lines: &[&str],
    from: usize,
    reference: ClassReference,
) -> Result<(ClassPath, usize)> {
    for (idx, line) in lines.iter().enumerate().skip(from) {
        let class = match (Instruction::parse(line, idx + 1)?, reference) {
            (Instruction::CheckCast { class }, ClassReference::CheckCast) => class,
            (Instruction::NewInstance { class }, ClassReference::NewInstance) => class,
            (Instruction::EndMethod, _) => break,
            _ => continue,
        };

        let class_path = ClassPath::new(class)?;
        debug!(class = %class_path, line = idx + 1, "resolved class path");
        return Ok((class_path, idx));
    }

    Err(Error::UnresolvedClassPath {
        instruction: reference.mnemonic(),
        line: from + 1,
    })
}
