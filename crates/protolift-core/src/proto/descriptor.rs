//! Binary descriptor export.
//!
//! Converts a batch of recovered units into a `FileDescriptorSet`, one file
//! per unit, so that the result can be fed to `protoc`-compatible tooling
//! without re-parsing the emitted text.

use super::{Dialect, SCHEMA_EXTENSION};
use crate::error::{Error, Result};
use crate::schema::{ClassPath, EnumValue, FieldDescriptor, SchemaBody, SchemaUnit};
use bytes::{Bytes, BytesMut};
use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FieldOptions, FileDescriptorProto, FileDescriptorSet,
};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Builds one `FileDescriptorProto` per unit.
///
/// Referenced types are typed as enums when the batch itself recovered the
/// referenced class as an enum, and as messages otherwise.
pub fn build_descriptor_set(units: &[SchemaUnit], dialect: Dialect) -> FileDescriptorSet {
    let enums: HashSet<&str> = units
        .iter()
        .filter(|unit| matches!(unit.body, SchemaBody::Enum { .. }))
        .map(|unit| unit.class_path.as_str())
        .collect();

    let file = units
        .iter()
        .map(|unit| file_descriptor(unit, dialect, &enums))
        .collect();

    FileDescriptorSet { file }
}

fn file_descriptor(unit: &SchemaUnit, dialect: Dialect, enums: &HashSet<&str>) -> FileDescriptorProto {
    let class_path = &unit.class_path;
    let package = class_path.package();

    let mut file = FileDescriptorProto {
        name: Some(class_path.file_name(SCHEMA_EXTENSION)),
        package: (!package.is_empty()).then_some(package),
        syntax: Some(dialect.as_str().to_string()),
        ..Default::default()
    };

    match &unit.body {
        SchemaBody::Message { imports, fields } => {
            let imports: Vec<&str> = imports
                .deduplicated()
                .into_iter()
                .filter(|import| *import != class_path.as_str())
                .collect();

            file.dependency = imports
                .iter()
                .map(|import| format!("{}.{}", import, SCHEMA_EXTENSION))
                .collect();

            let field = fields
                .iter()
                .filter_map(|field| field_descriptor(field, class_path, &imports, enums))
                .collect();

            file.message_type.push(DescriptorProto {
                name: Some(class_path.name().to_string()),
                field,
                ..Default::default()
            });
        }
        SchemaBody::Enum { values } => {
            file.enum_type.push(EnumDescriptorProto {
                name: Some(class_path.name().to_string()),
                value: values.iter().filter_map(enum_value).collect(),
                ..Default::default()
            });
        }
    }

    file
}

fn field_descriptor(
    field: &FieldDescriptor,
    owner: &ClassPath,
    imports: &[&str],
    enums: &HashSet<&str>,
) -> Option<FieldDescriptorProto> {
    let Ok(number) = i32::try_from(field.tag) else {
        warn!("Skipping field {} of {}: tag {} out of range", field.name, owner, field.tag);
        return None;
    };

    let label = if field.repeated || field.packed {
        Label::Repeated
    } else {
        Label::Optional
    };

    let mut proto = FieldDescriptorProto {
        name: Some(field.name.clone()),
        number: Some(number),
        label: Some(label as i32),
        ..Default::default()
    };

    match scalar_type(&field.type_name) {
        Some(scalar) => proto.r#type = Some(scalar as i32),
        None => {
            let referenced = resolve_reference(&field.type_name, owner, imports);
            let kind = match referenced {
                Some(path) if enums.contains(path) => Type::Enum,
                _ => Type::Message,
            };
            proto.r#type = Some(kind as i32);
            proto.type_name = Some(match referenced {
                Some(path) => fully_qualified(path),
                None => field.type_name.clone(),
            });
        }
    }

    if field.packed {
        proto.options = Some(FieldOptions {
            packed: Some(true),
            ..Default::default()
        });
    }

    Some(proto)
}

fn enum_value(value: &EnumValue) -> Option<EnumValueDescriptorProto> {
    match i32::try_from(value.value) {
        Ok(number) => Some(EnumValueDescriptorProto {
            name: Some(value.name.clone()),
            number: Some(number),
            ..Default::default()
        }),
        Err(_) => {
            warn!("Skipping enum value {}: {} exceeds the int32 range", value.name, value.value);
            None
        }
    }
}

/// Protobuf scalar type of a lowercase keyword such as `int32`
fn scalar_type(keyword: &str) -> Option<Type> {
    match Type::from_str_name(&format!("TYPE_{}", keyword.to_uppercase()))? {
        Type::Message | Type::Enum | Type::Group => None,
        scalar => Some(scalar),
    }
}

fn resolve_reference<'a>(name: &str, owner: &'a ClassPath, imports: &[&'a str]) -> Option<&'a str> {
    if owner.name() == name {
        return Some(owner.as_str());
    }
    imports
        .iter()
        .copied()
        .find(|import| import.rsplit('/').next() == Some(name))
}

/// `a/b/Foo` becomes `.a.b.Foo`
fn fully_qualified(class_path: &str) -> String {
    format!(".{}", class_path.replace('/', "."))
}

/// Encodes the set into its binary wire form
pub fn encode_descriptor_set(set: &FileDescriptorSet) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(set.encoded_len());
    set.encode(&mut buf)?;
    Ok(buf.freeze())
}

/// Links every file of the set, reporting unresolved imports and types
pub fn link_check(set: &FileDescriptorSet) -> Result<DescriptorPool> {
    let pool = DescriptorPool::from_file_descriptor_set(set.clone())
        .map_err(|e| Error::descriptor_build(e.to_string()))?;
    debug!("Linked {} files", pool.files().len());
    Ok(pool)
}
