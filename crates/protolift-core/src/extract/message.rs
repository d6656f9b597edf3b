//! Message field recovery from the adapter `encode` method.
//!
//! A Wire message adapter contains two `encode` methods: the bridge
//! `encode(ProtoWriter, Object)` which casts its argument to the message class
//! and delegates, and the typed method that writes every field:
//!
//! ```text
//! sget-object v0, Lcom/squareup/wire/ProtoAdapter;->STRING:Lcom/squareup/wire/ProtoAdapter;
//! invoke-virtual {v0}, Lcom/squareup/wire/ProtoAdapter;->asRepeated()Lcom/squareup/wire/ProtoAdapter;
//! move-result-object v0
//! const/4 v1, 0x2
//! iget-object v2, p2, Lcom/example/Foo;->tags:Ljava/util/List;
//! invoke-virtual {v0, p1, v1, v2}, Lcom/squareup/wire/ProtoAdapter;->encodeWithTag(...)V
//! ```
//!
//! The bridge yields the class path, the typed method yields the fields.

use super::{resolve_class_path, ClassReference};
use crate::error::{Error, Result};
use crate::schema::{FieldDescriptor, ImportSet, SchemaUnit};
use crate::smali::{
    Cardinality, Instruction, RegisterFile, Symbol, ADAPTER_FIELD, ENCODE_SIGNATURE,
    ENCODE_WITH_TAG,
};
use tracing::{debug, trace, warn};

const METHOD: &str = "encode";

/// Recover the message schema from the text of a message adapter class
pub fn extract_message(source: &str) -> Result<SchemaUnit> {
    MessageExtractor::new(source).run()
}

struct MessageExtractor<'a> {
    lines: Vec<&'a str>,
    registers: RegisterFile,
    imports: ImportSet,
    fields: Vec<FieldDescriptor>,
    repeated: bool,
    packed: bool,
}

impl<'a> MessageExtractor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines().collect(),
            registers: RegisterFile::new(),
            imports: ImportSet::new(),
            fields: Vec::new(),
            repeated: false,
            packed: false,
        }
    }

    fn run(mut self) -> Result<SchemaUnit> {
        let start = self
            .lines
            .iter()
            .position(|line| line.trim() == ENCODE_SIGNATURE)
            .ok_or(Error::MissingMethod { method: METHOD })?;

        let (class_path, cast) =
            resolve_class_path(&self.lines, start + 1, ClassReference::CheckCast)?;

        let mut cursor = self.tag_region_start(cast + 1, class_path.as_str());
        trace!(line = cursor + 1, "tag region starts");

        while cursor < self.lines.len() {
            let line_no = cursor + 1;
            match Instruction::parse(self.lines[cursor], line_no)? {
                Instruction::Const { register, value } => {
                    self.registers.bind(register, Symbol::Integer(value));
                }
                Instruction::StaticField {
                    register,
                    owner,
                    field,
                } => {
                    if field == ADAPTER_FIELD {
                        self.imports.push(owner);
                        let short = owner.rsplit('/').next().unwrap_or(owner);
                        self.registers.bind(register, Symbol::TypeName(short.to_string()));
                    } else {
                        self.registers
                            .bind(register, Symbol::TypeName(field.to_lowercase()));
                    }
                }
                Instruction::InstanceField { register, field } => {
                    self.registers.bind(register, Symbol::FieldName(field.to_string()));
                }
                Instruction::Wrap {
                    cardinality,
                    source,
                } => {
                    match cardinality {
                        Cardinality::Repeated => self.repeated = true,
                        Cardinality::Packed => self.packed = true,
                    }
                    let (result_idx, target) = self.seek_move_result(cursor)?;
                    self.registers.alias(source, target);
                    cursor = result_idx;
                }
                Instruction::EncodeWithTag {
                    adapter,
                    tag,
                    value,
                } => {
                    let field = FieldDescriptor {
                        name: self.registers.resolve_text(value, line_no),
                        type_name: self.registers.resolve_text(adapter, line_no),
                        tag: self.resolve_tag(tag, line_no),
                        repeated: self.repeated,
                        packed: self.packed,
                    };
                    trace!(?field, "field");
                    self.fields.push(field);
                    self.repeated = false;
                    self.packed = false;
                }
                Instruction::ReturnVoid => {
                    debug!(
                        class = %class_path,
                        fields = self.fields.len(),
                        imports = self.imports.as_slice().len(),
                        "recovered message"
                    );
                    return Ok(SchemaUnit::message(class_path, self.imports, self.fields));
                }
                Instruction::EndMethod => break,
                _ => {}
            }
            cursor += 1;
        }

        Err(Error::UnterminatedMethod { method: METHOD })
    }

    /// Index of the first line of the method body that writes the fields.
    ///
    /// When an `encodeWithTag` call shows up before any `return-void`, the
    /// fields are written by the bridge itself and `from` is returned. The
    /// same holds for the rest of the bridge after an early-return prologue.
    /// Otherwise the typed `encode(ProtoWriter, <class>)` method is preferred,
    /// falling back to the method following the bridge.
    fn tag_region_start(&self, from: usize, class_path: &str) -> usize {
        let mut prologue_end = None;
        for (idx, line) in self.lines.iter().enumerate().skip(from) {
            if line.contains(ENCODE_WITH_TAG) {
                return from;
            }
            if line.trim() == "return-void" {
                prologue_end = Some(idx + 1);
                break;
            }
        }
        let Some(prologue_end) = prologue_end else {
            return from;
        };

        let continues_after_prologue = self.lines[prologue_end..]
            .iter()
            .take_while(|line| line.trim() != ".end method")
            .any(|line| line.contains(ENCODE_WITH_TAG));
        if continues_after_prologue {
            return prologue_end;
        }

        let typed = format!("encode(Lcom/squareup/wire/ProtoWriter;L{};)V", class_path);
        if let Some(idx) = self
            .lines
            .iter()
            .position(|line| is_method_header(line) && line.contains(&typed))
        {
            return idx + 1;
        }

        self.lines
            .iter()
            .enumerate()
            .skip(prologue_end)
            .find(|(_, line)| is_method_header(line))
            .map_or(self.lines.len(), |(idx, _)| idx + 1)
    }

    /// Finds the `move-result-object` belonging to the wrapper call at `wrapper`.
    fn seek_move_result(&self, wrapper: usize) -> Result<(usize, &'a str)> {
        for idx in wrapper + 1..self.lines.len() {
            match Instruction::parse(self.lines[idx], idx + 1)? {
                Instruction::MoveResultObject { register } => return Ok((idx, register)),
                Instruction::EncodeWithTag { .. }
                | Instruction::ReturnVoid
                | Instruction::EndMethod => break,
                _ => {}
            }
        }
        Err(Error::MissingMoveResult { line: wrapper + 1 })
    }

    fn resolve_tag(&self, register: &str, line: usize) -> u32 {
        let Some(tag) = self.registers.resolve_integer(register, line) else {
            return 0;
        };
        u32::try_from(tag).unwrap_or_else(|_| {
            warn!(register, line, tag, "tag out of range, using 0");
            0
        })
    }
}

fn is_method_header(line: &str) -> bool {
    line.trim_start().starts_with(".method")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{adapter_of, field, foo_message, message_class, scalar};
    use crate::schema::SchemaBody;
    use crate::smali::{PACKED_WRAPPER, REPEATED_WRAPPER};
    use pretty_assertions::assert_eq;

    fn fields_of(unit: &SchemaUnit) -> &[FieldDescriptor] {
        match &unit.body {
            SchemaBody::Message { fields, .. } => fields,
            SchemaBody::Enum { .. } => panic!("expected a message"),
        }
    }

    fn imports_of(unit: &SchemaUnit) -> Vec<&str> {
        match &unit.body {
            SchemaBody::Message { imports, .. } => imports.as_slice().iter().map(String::as_str).collect(),
            SchemaBody::Enum { .. } => panic!("expected a message"),
        }
    }

    #[test]
    fn test_single_scalar_field() {
        let unit = extract_message(&foo_message()).unwrap();
        assert_eq!(unit.class_path.as_str(), "a/b/Foo");
        assert_eq!(
            fields_of(&unit),
            &[FieldDescriptor {
                name: "bar".to_string(),
                type_name: "int32".to_string(),
                tag: 1,
                repeated: false,
                packed: false,
            }]
        );
        assert!(imports_of(&unit).is_empty());
    }

    #[test]
    fn test_field_order_follows_encode_calls() {
        let cp = "com/example/Order";
        let mut body = String::new();
        body.push_str(&field(&scalar("STRING"), None, 3, cp, "id"));
        body.push_str(&field(&scalar("INT64"), None, 1, cp, "amount"));
        body.push_str(&field(&adapter_of("com/example/Customer"), None, 2, cp, "customer"));
        body.push_str("    return-void\n");

        let unit = extract_message(&message_class(cp, &body)).unwrap();
        let summary: Vec<_> = fields_of(&unit)
            .iter()
            .map(|f| (f.name.as_str(), f.type_name.as_str(), f.tag))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("id", "string", 3),
                ("amount", "int64", 1),
                ("customer", "Customer", 2)
            ]
        );
        assert_eq!(imports_of(&unit), vec!["com/example/Customer"]);
    }

    #[test]
    fn test_cardinality_flags_apply_once() {
        let cp = "a/List";
        let mut body = String::new();
        body.push_str(&field(&scalar("STRING"), Some(REPEATED_WRAPPER), 1, cp, "tags"));
        body.push_str(&field(&scalar("INT32"), Some(PACKED_WRAPPER), 2, cp, "ids"));
        body.push_str(&field(&scalar("BOOL"), None, 3, cp, "done"));
        body.push_str("    return-void\n");

        let unit = extract_message(&message_class(cp, &body)).unwrap();
        let flags: Vec<_> = fields_of(&unit)
            .iter()
            .map(|f| (f.type_name.as_str(), f.repeated, f.packed))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("string", true, false),
                ("int32", false, true),
                ("bool", false, false)
            ]
        );
    }

    #[test]
    fn test_wrapper_result_in_other_register() {
        let cp = "a/Wrapped";
        let body = format!(
            r#"    sget-object v0, {adapter}

    invoke-virtual {{v0}}, {wrapper}

    move-result-object v3

    const/4 v1, 0x4

    iget-object v2, p2, La/Wrapped;->items:Ljava/util/List;

    invoke-virtual {{v3, p1, v1, v2}}, {encode}

    return-void
"#,
            adapter = adapter_of("a/Item"),
            wrapper = REPEATED_WRAPPER,
            encode = ENCODE_WITH_TAG
        );

        let unit = extract_message(&message_class(cp, &body)).unwrap();
        let field = &fields_of(&unit)[0];
        assert_eq!(field.type_name, "Item");
        assert_eq!(field.name, "items");
        assert!(field.repeated);
    }

    #[test]
    fn test_duplicate_imports_are_kept() {
        let cp = "a/Pair";
        let mut body = String::new();
        body.push_str(&field(&adapter_of("a/Point"), None, 1, cp, "left"));
        body.push_str(&field(&adapter_of("a/Point"), None, 2, cp, "right"));
        body.push_str("    return-void\n");

        let unit = extract_message(&message_class(cp, &body)).unwrap();
        assert_eq!(imports_of(&unit), vec!["a/Point", "a/Point"]);
    }

    #[test]
    fn test_unbound_registers_yield_empty_values() {
        let body = format!(
            "    invoke-virtual {{v0, p1, v1, v2}}, {}\n\n    return-void\n",
            ENCODE_WITH_TAG
        );
        let unit = extract_message(&message_class("a/Empty", &body)).unwrap();
        assert_eq!(
            fields_of(&unit),
            &[FieldDescriptor {
                name: String::new(),
                type_name: String::new(),
                tag: 0,
                repeated: false,
                packed: false,
            }]
        );
    }

    #[test]
    fn test_encode_without_bridge_prologue() {
        let text = format!(
            "{}\n    check-cast p2, La/Inline;\n{}    return-void\n.end method\n",
            ENCODE_SIGNATURE,
            field(&scalar("DOUBLE"), None, 5, "a/Inline", "ratio")
        );
        let unit = extract_message(&text).unwrap();
        assert_eq!(fields_of(&unit)[0].tag, 5);
        assert_eq!(fields_of(&unit)[0].type_name, "double");
    }

    #[test]
    fn test_typed_encode_declared_before_bridge() {
        let mut typed = String::from(".method public encode(Lcom/squareup/wire/ProtoWriter;La/Early;)V\n");
        typed.push_str(&field(&scalar("BYTES"), None, 7, "a/Early", "payload"));
        typed.push_str("    return-void\n.end method\n\n");
        let bridge = format!(
            "{}\n    check-cast p2, La/Early;\n    invoke-virtual {{p0, p1, p2}}, La/Early$ADAPTER;->encode(Lcom/squareup/wire/ProtoWriter;La/Early;)V\n    return-void\n.end method\n",
            ENCODE_SIGNATURE
        );

        let unit = extract_message(&(typed + &bridge)).unwrap();
        assert_eq!(fields_of(&unit)[0].name, "payload");
        assert_eq!(fields_of(&unit)[0].type_name, "bytes");
    }

    #[test]
    fn test_missing_encode_method() {
        let err = extract_message(".class public La/Foo;\n").unwrap_err();
        assert!(matches!(err, Error::MissingMethod { method: "encode" }));
    }

    #[test]
    fn test_missing_class_path() {
        let text = format!("{}\n    return-void\n.end method\n", ENCODE_SIGNATURE);
        let err = extract_message(&text).unwrap_err();
        assert!(matches!(err, Error::UnresolvedClassPath { .. }));
    }

    #[test]
    fn test_unterminated_tag_region() {
        let body = field(&scalar("INT32"), None, 1, "a/Broken", "bar");
        let text = message_class("a/Broken", &body);
        let err = extract_message(&text).unwrap_err();
        assert!(matches!(err, Error::UnterminatedMethod { method: "encode" }));

        let truncated = text.trim_end().strip_suffix(".end method").unwrap();
        let err = extract_message(truncated).unwrap_err();
        assert!(matches!(err, Error::UnterminatedMethod { .. }));
    }

    #[test]
    fn test_wrapper_without_move_result() {
        let body = format!(
            "    sget-object v0, {}\n    invoke-virtual {{v0}}, {}\n    const/4 v1, 0x1\n    invoke-virtual {{v0, p1, v1, v2}}, {}\n    move-result-object v0\n    return-void\n",
            scalar("STRING"),
            REPEATED_WRAPPER,
            ENCODE_WITH_TAG
        );
        let err = extract_message(&message_class("a/Bad", &body)).unwrap_err();
        assert!(matches!(err, Error::MissingMoveResult { .. }));
    }

    #[test]
    fn test_fields_after_early_return_in_bridge() {
        let text = format!(
            ".class public final La/b/Foo$ADAPTER;\n\n{}\n    .registers 5\n\n    check-cast p2, La/b/Foo;\n\n    if-nez p2, :cond_0\n\n    return-void\n\n    :cond_0\n{}    return-void\n.end method\n\n.method public encodedSize(La/b/Foo;)I\n    .registers 3\n\n    const/4 v0, 0x0\n\n    return v0\n.end method\n",
            ENCODE_SIGNATURE,
            field(&scalar("INT32"), None, 1, "a/b/Foo", "bar")
        );

        let unit = extract_message(&text).unwrap();
        assert_eq!(unit.class_path.as_str(), "a/b/Foo");
        assert_eq!(
            fields_of(&unit),
            &[FieldDescriptor {
                name: "bar".to_string(),
                type_name: "int32".to_string(),
                tag: 1,
                repeated: false,
                packed: false,
            }]
        );
    }
}
