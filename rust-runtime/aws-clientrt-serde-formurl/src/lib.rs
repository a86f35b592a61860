/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! `application/x-www-form-urlencoded` back-end for the descriptor-driven
//! serialization framework.
//!
//! The query protocol family serializes requests in this format and parses
//! responses as XML, so this back-end is serialize-only. Member paths are
//! dotted prefixes (`ListName.member.1`, `MapName.entry.1.key`); keys and
//! values are percent-encoded; `QueryLiteral` traits on the root object
//! contribute fixed pairs such as `Action` and `Version`.

use aws_clientrt_serde::descriptor::{FieldTrait, SdkFieldDescriptor, SdkObjectDescriptor};
use aws_clientrt_serde::{SerialValue, SerializationError, Serializer};
use aws_clientrt_types::base64;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

const FORMAT_NAME: &str = "form-url";
const DEFAULT_MEMBER_NAME: &str = "member";
const DEFAULT_ENTRY_NAME: &str = "entry";
const DEFAULT_KEY_NAME: &str = "key";
const DEFAULT_VALUE_NAME: &str = "value";

/// Everything except the RFC 3986 unreserved characters is percent-encoded.
const FORM_URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug)]
enum Scope {
    Struct {
        prefix: String,
    },
    List {
        /// Key prefix up to (not including) the element index.
        base: String,
        /// Key emitted for an empty list.
        empty_key: String,
        index: usize,
    },
    Map {
        /// Key prefix up to (not including) the entry index.
        base: String,
        key_name: String,
        value_name: String,
        index: usize,
    },
}

/// Serializes a descriptor-driven shape into a form-url body.
#[derive(Debug, Default)]
pub struct FormUrlSerializer {
    pairs: Vec<(String, String)>,
    scopes: Vec<Scope>,
}

impl FormUrlSerializer {
    /// Creates an empty serializer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalizes serialization and returns the encoded body.
    pub fn finish(self) -> Result<String, SerializationError> {
        if !self.scopes.is_empty() {
            return Err(SerializationError::new(
                "serialization finished with unterminated scopes",
            ));
        }
        let encoded: Vec<String> = self
            .pairs
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(key, FORM_URL_ENCODE_SET),
                    utf8_percent_encode(value, FORM_URL_ENCODE_SET)
                )
            })
            .collect();
        Ok(encoded.join("&"))
    }

    fn field_key_name<'a>(field: &'a SdkFieldDescriptor) -> Result<&'a str, SerializationError> {
        field
            .form_url_name()
            .or_else(|| field.xml_name())
            .ok_or_else(|| SerializationError::new("field descriptor has no serial name"))
    }

    fn current_prefix(&self) -> Result<&str, SerializationError> {
        match self.scopes.last() {
            Some(Scope::Struct { prefix }) => Ok(prefix),
            _ => Err(SerializationError::new(
                "operation requires an enclosing structure scope",
            )),
        }
    }

    fn is_flattened(field: &SdkFieldDescriptor) -> bool {
        field.has_trait(|t| matches!(t, FieldTrait::FormUrlFlattened | FieldTrait::Flattened))
    }
}

fn leaf_to_string(value: SerialValue<'_>) -> Result<String, SerializationError> {
    Ok(match value {
        SerialValue::Boolean(v) => v.to_string(),
        SerialValue::Byte(v) => v.to_string(),
        SerialValue::Short(v) => v.to_string(),
        SerialValue::Integer(v) => v.to_string(),
        SerialValue::Long(v) => v.to_string(),
        SerialValue::Float(v) => float_to_string(f64::from(v)),
        SerialValue::Double(v) => float_to_string(v),
        SerialValue::Char(v) => v.to_string(),
        SerialValue::String(v) => v.to_string(),
        SerialValue::Blob(v) => base64::encode(v),
        SerialValue::BigNumber(v) => v.to_string(),
        SerialValue::Timestamp(v, format) => v.fmt(format),
        SerialValue::Document(_) => {
            return Err(SerializationError::new(format!(
                "documents cannot be serialized as {}",
                FORMAT_NAME
            )))
        }
        SerialValue::Null => {
            return Err(SerializationError::new(
                "null cannot be serialized as form-url",
            ))
        }
        _ => {
            return Err(SerializationError::new(format!(
                "unsupported value type cannot be serialized as {}",
                FORMAT_NAME
            )))
        }
    })
}

fn float_to_string(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        value.to_string()
    }
}

impl Serializer for FormUrlSerializer {
    fn begin_struct(
        &mut self,
        descriptor: &SdkObjectDescriptor,
    ) -> Result<(), SerializationError> {
        if !self.scopes.is_empty() {
            return Err(SerializationError::new(
                "nested structures must be opened with begin_struct_field",
            ));
        }
        for field_trait in &descriptor.traits {
            if let FieldTrait::QueryLiteral { key, value } = field_trait {
                self.pairs.push((key.clone(), value.clone()));
            }
        }
        self.scopes.push(Scope::Struct {
            prefix: String::new(),
        });
        Ok(())
    }

    fn begin_struct_field(
        &mut self,
        field: &SdkFieldDescriptor,
        _descriptor: &SdkObjectDescriptor,
    ) -> Result<(), SerializationError> {
        let prefix = match self.scopes.last_mut() {
            Some(Scope::Struct { prefix }) => {
                format!("{}{}.", prefix, Self::field_key_name(field)?)
            }
            Some(Scope::List { base, index, .. }) => {
                *index += 1;
                format!("{}{}.", base, index)
            }
            Some(Scope::Map { .. }) => {
                return Err(SerializationError::new(
                    "structure-valued map entries are not supported by the form-url back-end",
                ))
            }
            None => {
                return Err(SerializationError::new(
                    "begin_struct_field requires an enclosing scope",
                ))
            }
        };
        self.scopes.push(Scope::Struct { prefix });
        Ok(())
    }

    fn end_struct(&mut self) -> Result<(), SerializationError> {
        match self.scopes.pop() {
            Some(Scope::Struct { .. }) => Ok(()),
            _ => Err(SerializationError::new("end_struct without begin_struct")),
        }
    }

    fn begin_list(&mut self, descriptor: &SdkFieldDescriptor) -> Result<(), SerializationError> {
        let prefix = self.current_prefix()?.to_string();
        let name = Self::field_key_name(descriptor)?;
        let empty_key = format!("{}{}", prefix, name);
        let base = if Self::is_flattened(descriptor) {
            format!("{}{}.", prefix, name)
        } else {
            let member = descriptor
                .find_trait(|t| match t {
                    FieldTrait::FormUrlCollectionName(name) => Some(name.as_str()),
                    _ => None,
                })
                .unwrap_or(DEFAULT_MEMBER_NAME);
            format!("{}{}.{}.", prefix, name, member)
        };
        self.scopes.push(Scope::List {
            base,
            empty_key,
            index: 0,
        });
        Ok(())
    }

    fn end_list(&mut self) -> Result<(), SerializationError> {
        match self.scopes.pop() {
            Some(Scope::List {
                empty_key, index, ..
            }) => {
                // the wire distinguishes an empty list from an absent one
                if index == 0 {
                    self.pairs.push((empty_key, String::new()));
                }
                Ok(())
            }
            _ => Err(SerializationError::new("end_list without begin_list")),
        }
    }

    fn begin_map(&mut self, descriptor: &SdkFieldDescriptor) -> Result<(), SerializationError> {
        let prefix = self.current_prefix()?.to_string();
        let name = Self::field_key_name(descriptor)?;
        let base = if Self::is_flattened(descriptor) {
            format!("{}{}.", prefix, name)
        } else {
            format!("{}{}.{}.", prefix, name, DEFAULT_ENTRY_NAME)
        };
        let (key_name, value_name) = descriptor
            .find_trait(|t| match t {
                FieldTrait::FormUrlMapName { key, value } => Some((key.clone(), value.clone())),
                _ => None,
            })
            .unwrap_or_else(|| (DEFAULT_KEY_NAME.to_string(), DEFAULT_VALUE_NAME.to_string()));
        self.scopes.push(Scope::Map {
            base,
            key_name,
            value_name,
            index: 0,
        });
        Ok(())
    }

    fn end_map(&mut self) -> Result<(), SerializationError> {
        match self.scopes.pop() {
            Some(Scope::Map { .. }) => Ok(()),
            _ => Err(SerializationError::new("end_map without begin_map")),
        }
    }

    fn field(
        &mut self,
        descriptor: &SdkFieldDescriptor,
        value: SerialValue<'_>,
    ) -> Result<(), SerializationError> {
        let prefix = self.current_prefix()?.to_string();
        let key = format!("{}{}", prefix, Self::field_key_name(descriptor)?);
        let text = leaf_to_string(value)?;
        self.pairs.push((key, text));
        Ok(())
    }

    fn element(&mut self, value: SerialValue<'_>) -> Result<(), SerializationError> {
        let key = match self.scopes.last_mut() {
            Some(Scope::List { base, index, .. }) => {
                *index += 1;
                format!("{}{}", base, index)
            }
            _ => {
                return Err(SerializationError::new(
                    "element requires an enclosing list scope",
                ))
            }
        };
        let text = leaf_to_string(value)?;
        self.pairs.push((key, text));
        Ok(())
    }

    fn entry(&mut self, key: &str, value: SerialValue<'_>) -> Result<(), SerializationError> {
        let (key_pair, value_pair) = match self.scopes.last_mut() {
            Some(Scope::Map {
                base,
                key_name,
                value_name,
                index,
            }) => {
                *index += 1;
                (
                    (format!("{}{}.{}", base, index, key_name), key.to_string()),
                    format!("{}{}.{}", base, index, value_name),
                )
            }
            _ => {
                return Err(SerializationError::new(
                    "entry requires an enclosing map scope",
                ))
            }
        };
        let text = leaf_to_string(value)?;
        self.pairs.push(key_pair);
        self.pairs.push((value_pair, text));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_clientrt_serde::descriptor::SerialKind;
    use aws_clientrt_types::{DateTime, Format};
    use pretty_assertions::assert_eq;

    fn field(kind: SerialKind, index: usize, name: &str) -> SdkFieldDescriptor {
        SdkFieldDescriptor::new(kind, index)
            .with_trait(FieldTrait::FormUrlSerialName(name.into()))
    }

    fn query_object() -> SdkObjectDescriptor {
        SdkObjectDescriptor::builder()
            .with_trait(FieldTrait::QueryLiteral {
                key: "Action".into(),
                value: "DescribeThings".into(),
            })
            .with_trait(FieldTrait::QueryLiteral {
                key: "Version".into(),
                value: "2010-05-08".into(),
            })
            .build()
    }

    #[test]
    fn literals_and_scalar_fields() {
        let object = query_object();
        let name = field(SerialKind::String, 0, "Name");
        let when = field(SerialKind::Timestamp, 1, "After");

        let mut ser = FormUrlSerializer::new();
        ser.begin_struct(&object).unwrap();
        ser.field(&name, SerialValue::String("a b&c")).unwrap();
        ser.field(
            &when,
            SerialValue::Timestamp(&DateTime::from_secs(1576540098), Format::EpochSeconds),
        )
        .unwrap();
        ser.end_struct().unwrap();
        assert_eq!(
            "Action=DescribeThings&Version=2010-05-08&Name=a%20b%26c&After=1576540098",
            ser.finish().unwrap()
        );
    }

    #[test]
    fn wrapped_and_flattened_lists() {
        let object = query_object();
        let wrapped = field(SerialKind::List, 0, "Items");
        let flattened =
            field(SerialKind::List, 1, "Flat").with_trait(FieldTrait::FormUrlFlattened);

        let mut ser = FormUrlSerializer::new();
        ser.begin_struct(&object).unwrap();
        ser.begin_list(&wrapped).unwrap();
        ser.element(SerialValue::String("first")).unwrap();
        ser.element(SerialValue::String("second")).unwrap();
        ser.end_list().unwrap();
        ser.begin_list(&flattened).unwrap();
        ser.element(SerialValue::Integer(5)).unwrap();
        ser.end_list().unwrap();
        ser.end_struct().unwrap();
        assert_eq!(
            "Action=DescribeThings&Version=2010-05-08\
             &Items.member.1=first&Items.member.2=second&Flat.1=5",
            ser.finish().unwrap()
        );
    }

    #[test]
    fn empty_list_writes_empty_value() {
        let object = query_object();
        let items = field(SerialKind::List, 0, "Items");
        let mut ser = FormUrlSerializer::new();
        ser.begin_struct(&object).unwrap();
        ser.begin_list(&items).unwrap();
        ser.end_list().unwrap();
        ser.end_struct().unwrap();
        assert_eq!(
            "Action=DescribeThings&Version=2010-05-08&Items=",
            ser.finish().unwrap()
        );
    }

    #[test]
    fn maps_with_custom_member_names() {
        let object = query_object();
        let tags = field(SerialKind::Map, 0, "Tags").with_trait(FieldTrait::FormUrlMapName {
            key: "Name".into(),
            value: "Value".into(),
        });

        let mut ser = FormUrlSerializer::new();
        ser.begin_struct(&object).unwrap();
        ser.begin_map(&tags).unwrap();
        ser.entry("env", SerialValue::String("prod")).unwrap();
        ser.end_map().unwrap();
        ser.end_struct().unwrap();
        assert_eq!(
            "Action=DescribeThings&Version=2010-05-08\
             &Tags.entry.1.Name=env&Tags.entry.1.Value=prod",
            ser.finish().unwrap()
        );
    }

    #[test]
    fn nested_structures_use_dotted_prefixes() {
        let object = query_object();
        let child_field = field(SerialKind::Struct, 0, "Config");
        let child = SdkObjectDescriptor::builder().build();
        let setting = field(SerialKind::String, 0, "Mode");

        let mut ser = FormUrlSerializer::new();
        ser.begin_struct(&object).unwrap();
        ser.begin_struct_field(&child_field, &child).unwrap();
        ser.field(&setting, SerialValue::String("fast")).unwrap();
        ser.end_struct().unwrap();
        ser.end_struct().unwrap();
        assert_eq!(
            "Action=DescribeThings&Version=2010-05-08&Config.Mode=fast",
            ser.finish().unwrap()
        );
    }

    #[test]
    fn structs_inside_lists() {
        let object = query_object();
        let list = field(SerialKind::List, 0, "Users");
        let user = SdkObjectDescriptor::builder().build();
        let name = field(SerialKind::String, 0, "Name");

        let mut ser = FormUrlSerializer::new();
        ser.begin_struct(&object).unwrap();
        ser.begin_list(&list).unwrap();
        for value in ["alpha", "beta"] {
            ser.begin_struct_field(&SdkFieldDescriptor::new(SerialKind::Struct, 0), &user)
                .unwrap();
            ser.field(&name, SerialValue::String(value)).unwrap();
            ser.end_struct().unwrap();
        }
        ser.end_list().unwrap();
        ser.end_struct().unwrap();
        assert_eq!(
            "Action=DescribeThings&Version=2010-05-08\
             &Users.member.1.Name=alpha&Users.member.2.Name=beta",
            ser.finish().unwrap()
        );
    }

    #[test]
    fn document_is_unsupported() {
        let object = query_object();
        let doc_field = field(SerialKind::Document, 0, "Doc");
        let mut ser = FormUrlSerializer::new();
        ser.begin_struct(&object).unwrap();
        let err = ser
            .field(
                &doc_field,
                SerialValue::Document(&aws_clientrt_types::Document::Null),
            )
            .unwrap_err();
        assert!(err.to_string().contains("cannot be serialized"));
    }
}
