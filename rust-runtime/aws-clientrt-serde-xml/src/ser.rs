/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_clientrt_serde::descriptor::{FieldTrait, SdkFieldDescriptor, SdkObjectDescriptor};
use aws_clientrt_serde::{SerialValue, SerializationError, Serializer};
use aws_clientrt_types::base64;
use aws_clientrt_xml::escape::escape;

const FORMAT_NAME: &str = "XML";
const DEFAULT_MEMBER_NAME: &str = "member";
const DEFAULT_KEY_NAME: &str = "key";
const DEFAULT_VALUE_NAME: &str = "value";

#[derive(Debug, Clone)]
struct NsDecl {
    uri: String,
    prefix: Option<String>,
}

#[derive(Debug)]
enum Scope {
    Struct {
        name: String,
        tag_open: bool,
    },
    List {
        wrapper: Option<String>,
        member_name: String,
        member_ns: Option<NsDecl>,
        sparse: bool,
    },
    Map {
        wrapper: Option<String>,
        entry_name: String,
        key_name: String,
        value_name: String,
        key_ns: Option<NsDecl>,
        sparse: bool,
    },
}

/// Serializes a descriptor-driven shape into an XML document.
#[derive(Debug, Default)]
pub struct XmlSerializer {
    doc: String,
    scopes: Vec<Scope>,
}

impl XmlSerializer {
    /// Creates an empty serializer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalizes serialization and returns the document.
    pub fn finish(self) -> Result<String, SerializationError> {
        if !self.scopes.is_empty() {
            return Err(SerializationError::new(
                "serialization finished with unterminated scopes",
            ));
        }
        Ok(self.doc)
    }

    fn close_open_tag(&mut self) {
        if let Some(Scope::Struct { tag_open, .. }) = self.scopes.last_mut() {
            if *tag_open {
                *tag_open = false;
                self.doc.push('>');
            }
        }
    }

    fn open_element(&mut self, name: &str, ns: Option<&NsDecl>) {
        self.doc.push('<');
        self.doc.push_str(name);
        if let Some(ns) = ns {
            match &ns.prefix {
                Some(prefix) => {
                    self.doc.push_str(" xmlns:");
                    self.doc.push_str(prefix);
                }
                None => self.doc.push_str(" xmlns"),
            }
            self.doc.push_str("=\"");
            self.doc.push_str(&escape(&ns.uri));
            self.doc.push('"');
        }
    }

    fn write_leaf_element(
        &mut self,
        name: &str,
        ns: Option<&NsDecl>,
        value: SerialValue<'_>,
    ) -> Result<(), SerializationError> {
        if matches!(value, SerialValue::Null) {
            self.open_element(name, ns);
            self.doc.push_str("/>");
            return Ok(());
        }
        let text = leaf_to_string(value)?;
        self.open_element(name, ns);
        self.doc.push('>');
        self.doc.push_str(&escape(&text));
        self.doc.push_str("</");
        self.doc.push_str(name);
        self.doc.push('>');
        Ok(())
    }

    fn field_element_name<'a>(
        field: &'a SdkFieldDescriptor,
    ) -> Result<&'a str, SerializationError> {
        field
            .xml_name()
            .ok_or_else(|| SerializationError::new("field descriptor has no XML serial name"))
    }
}

fn xml_namespace(traits: &[FieldTrait]) -> Option<NsDecl> {
    traits.iter().find_map(|t| match t {
        FieldTrait::XmlNamespace { uri, prefix } => Some(NsDecl {
            uri: uri.clone(),
            prefix: prefix.clone(),
        }),
        _ => None,
    })
}

fn collection_value_namespace(traits: &[FieldTrait]) -> Option<NsDecl> {
    traits.iter().find_map(|t| match t {
        FieldTrait::XmlCollectionValueNamespace { uri, prefix } => Some(NsDecl {
            uri: uri.clone(),
            prefix: prefix.clone(),
        }),
        _ => None,
    })
}

fn map_key_namespace(traits: &[FieldTrait]) -> Option<NsDecl> {
    traits.iter().find_map(|t| match t {
        FieldTrait::XmlMapKeyNamespace { uri, prefix } => Some(NsDecl {
            uri: uri.clone(),
            prefix: prefix.clone(),
        }),
        _ => None,
    })
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
                "null is only valid inside sparse collections",
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

impl Serializer for XmlSerializer {
    fn begin_struct(
        &mut self,
        descriptor: &SdkObjectDescriptor,
    ) -> Result<(), SerializationError> {
        if !self.scopes.is_empty() {
            return Err(SerializationError::new(
                "nested structures must be opened with begin_struct_field",
            ));
        }
        let name = descriptor
            .xml_name()
            .ok_or_else(|| SerializationError::new("struct descriptor has no XML serial name"))?
            .to_string();
        let ns = xml_namespace(&descriptor.traits);
        self.open_element(&name, ns.as_ref());
        self.scopes.push(Scope::Struct {
            name,
            tag_open: true,
        });
        Ok(())
    }

    fn begin_struct_field(
        &mut self,
        field: &SdkFieldDescriptor,
        _descriptor: &SdkObjectDescriptor,
    ) -> Result<(), SerializationError> {
        let (name, ns) = match self.scopes.last() {
            Some(Scope::Struct { .. }) => (
                Self::field_element_name(field)?.to_string(),
                xml_namespace(&field.traits),
            ),
            Some(Scope::List {
                member_name,
                member_ns,
                ..
            }) => (member_name.clone(), member_ns.clone()),
            Some(Scope::Map { .. }) => {
                return Err(SerializationError::new(
                    "structure-valued map entries are not supported by the XML back-end",
                ))
            }
            None => {
                return Err(SerializationError::new(
                    "begin_struct_field requires an enclosing scope",
                ))
            }
        };
        self.close_open_tag();
        self.open_element(&name, ns.as_ref());
        self.scopes.push(Scope::Struct {
            name,
            tag_open: true,
        });
        Ok(())
    }

    fn end_struct(&mut self) -> Result<(), SerializationError> {
        match self.scopes.pop() {
            Some(Scope::Struct { name, tag_open }) => {
                if tag_open {
                    self.doc.push_str("/>");
                } else {
                    self.doc.push_str("</");
                    self.doc.push_str(&name);
                    self.doc.push('>');
                }
                Ok(())
            }
            _ => Err(SerializationError::new("end_struct without begin_struct")),
        }
    }

    fn begin_list(&mut self, descriptor: &SdkFieldDescriptor) -> Result<(), SerializationError> {
        if !matches!(self.scopes.last(), Some(Scope::Struct { .. })) {
            return Err(SerializationError::new(
                "lists are only supported as structure fields by the XML back-end",
            ));
        }
        self.close_open_tag();
        let field_name = Self::field_element_name(descriptor)?.to_string();
        let member_ns = collection_value_namespace(&descriptor.traits);
        let sparse = descriptor.is_sparse();
        let (wrapper, member_name) = if descriptor.is_flattened() {
            (None, field_name)
        } else {
            let member_name = descriptor
                .find_trait(|t| match t {
                    FieldTrait::XmlCollectionName(name) => Some(name.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| DEFAULT_MEMBER_NAME.to_string());
            self.open_element(&field_name, xml_namespace(&descriptor.traits).as_ref());
            self.doc.push('>');
            (Some(field_name), member_name)
        };
        self.scopes.push(Scope::List {
            wrapper,
            member_name,
            member_ns,
            sparse,
        });
        Ok(())
    }

    fn end_list(&mut self) -> Result<(), SerializationError> {
        match self.scopes.pop() {
            Some(Scope::List { wrapper, .. }) => {
                if let Some(wrapper) = wrapper {
                    self.doc.push_str("</");
                    self.doc.push_str(&wrapper);
                    self.doc.push('>');
                }
                Ok(())
            }
            _ => Err(SerializationError::new("end_list without begin_list")),
        }
    }

    fn begin_map(&mut self, descriptor: &SdkFieldDescriptor) -> Result<(), SerializationError> {
        if !matches!(self.scopes.last(), Some(Scope::Struct { .. })) {
            return Err(SerializationError::new(
                "maps are only supported as structure fields by the XML back-end",
            ));
        }
        self.close_open_tag();
        let field_name = Self::field_element_name(descriptor)?.to_string();
        let (key_name, value_name) = descriptor
            .find_trait(|t| match t {
                FieldTrait::XmlMapName { key, value } => Some((key.clone(), value.clone())),
                _ => None,
            })
            .unwrap_or_else(|| (DEFAULT_KEY_NAME.to_string(), DEFAULT_VALUE_NAME.to_string()));
        let key_ns = map_key_namespace(&descriptor.traits);
        let sparse = descriptor.is_sparse();
        let (wrapper, entry_name) = if descriptor.is_flattened() {
            (None, field_name)
        } else {
            self.open_element(&field_name, xml_namespace(&descriptor.traits).as_ref());
            self.doc.push('>');
            (Some(field_name), "entry".to_string())
        };
        self.scopes.push(Scope::Map {
            wrapper,
            entry_name,
            key_name,
            value_name,
            key_ns,
            sparse,
        });
        Ok(())
    }

    fn end_map(&mut self) -> Result<(), SerializationError> {
        match self.scopes.pop() {
            Some(Scope::Map { wrapper, .. }) => {
                if let Some(wrapper) = wrapper {
                    self.doc.push_str("</");
                    self.doc.push_str(&wrapper);
                    self.doc.push('>');
                }
                Ok(())
            }
            _ => Err(SerializationError::new("end_map without begin_map")),
        }
    }

    fn field(
        &mut self,
        descriptor: &SdkFieldDescriptor,
        value: SerialValue<'_>,
    ) -> Result<(), SerializationError> {
        let name = Self::field_element_name(descriptor)?.to_string();
        match self.scopes.last() {
            Some(Scope::Struct { tag_open, .. }) => {
                if descriptor.is_xml_attribute() {
                    if !*tag_open {
                        return Err(SerializationError::new(
                            "attributes must be serialized before any child content",
                        ));
                    }
                    let text = leaf_to_string(value)?;
                    self.doc.push(' ');
                    self.doc.push_str(&name);
                    self.doc.push_str("=\"");
                    self.doc.push_str(&escape(&text));
                    self.doc.push('"');
                    Ok(())
                } else {
                    if matches!(value, SerialValue::Null) {
                        return Err(SerializationError::new(
                            "null is only valid inside sparse collections",
                        ));
                    }
                    self.close_open_tag();
                    let ns = xml_namespace(&descriptor.traits);
                    self.write_leaf_element(&name, ns.as_ref(), value)
                }
            }
            _ => Err(SerializationError::new(
                "field requires an enclosing structure scope",
            )),
        }
    }

    fn element(&mut self, value: SerialValue<'_>) -> Result<(), SerializationError> {
        match self.scopes.last() {
            Some(Scope::List {
                member_name,
                member_ns,
                sparse,
                ..
            }) => {
                if matches!(value, SerialValue::Null) && !*sparse {
                    return Err(SerializationError::new(
                        "null element in a non-sparse list",
                    ));
                }
                let member_name = member_name.clone();
                let member_ns = member_ns.clone();
                self.write_leaf_element(&member_name, member_ns.as_ref(), value)
            }
            _ => Err(SerializationError::new(
                "element requires an enclosing list scope",
            )),
        }
    }

    fn entry(&mut self, key: &str, value: SerialValue<'_>) -> Result<(), SerializationError> {
        match self.scopes.last() {
            Some(Scope::Map {
                entry_name,
                key_name,
                value_name,
                key_ns,
                sparse,
                ..
            }) => {
                if matches!(value, SerialValue::Null) && !*sparse {
                    return Err(SerializationError::new("null value in a non-sparse map"));
                }
                let entry_name = entry_name.clone();
                let key_name = key_name.clone();
                let value_name = value_name.clone();
                let key_ns = key_ns.clone();
                self.open_element(&entry_name, None);
                self.doc.push('>');
                self.write_leaf_element(&key_name, key_ns.as_ref(), SerialValue::String(key))?;
                self.write_leaf_element(&value_name, None, value)?;
                self.doc.push_str("</");
                self.doc.push_str(&entry_name);
                self.doc.push('>');
                Ok(())
            }
            _ => Err(SerializationError::new(
                "entry requires an enclosing map scope",
            )),
        }
    }
}
