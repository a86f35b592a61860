/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_clientrt_parse::datetime::{parse_epoch, parse_iso8601, parse_rfc5322};
use aws_clientrt_serde::descriptor::{
    FieldTrait, SdkFieldDescriptor, SdkObjectDescriptor, UNKNOWN_FIELD,
};
use aws_clientrt_serde::{DeserializationError, Deserializer};
use aws_clientrt_types::{base64, Blob, DateTime, Format};
use aws_clientrt_xml::decode::{QName, XmlDecodeError, XmlToken, XmlTokenReader};
use std::collections::VecDeque;

const DEFAULT_MEMBER_NAME: &str = "member";
const DEFAULT_KEY_NAME: &str = "key";
const DEFAULT_VALUE_NAME: &str = "value";
const DEFAULT_ENTRY_NAME: &str = "entry";

/// `(local, namespace, decoded value)` of an attribute, detached from the
/// input buffer.
type OwnedAttr = (String, Option<String>, String);

#[derive(Debug)]
enum Pending {
    /// A matched attribute value.
    Attribute(String),
    /// A matched element whose begin token has been consumed; the value is
    /// everything up to the end token at `depth`.
    Element { depth: usize, attrs: Vec<OwnedAttr> },
}

#[derive(Debug)]
enum Frame {
    Struct {
        depth: usize,
        attrs: VecDeque<OwnedAttr>,
    },
    List {
        container_depth: usize,
        member_name: String,
        flattened: bool,
        /// The already-consumed begin token of the first flattened member.
        pending_first: Option<(usize, Vec<OwnedAttr>)>,
    },
    Map {
        container_depth: usize,
        entry_name: String,
        key_name: String,
        value_name: String,
        flattened: bool,
        pending_first: Option<(usize, Vec<OwnedAttr>)>,
        /// Depth of an entry whose value has been consumed but whose end
        /// token has not.
        open_entry_depth: Option<usize>,
    },
}

/// Deserializes descriptor-driven shapes from an XML document.
#[derive(Debug)]
pub struct XmlDeserializer<'inp> {
    reader: XmlTokenReader<'inp>,
    frames: Vec<Frame>,
    pending: Option<Pending>,
}

fn decode_err(err: XmlDecodeError) -> DeserializationError {
    DeserializationError::with_source("malformed XML document", err)
}

fn owned_attrs(attrs: Vec<aws_clientrt_xml::decode::Attr<'_>>) -> Vec<OwnedAttr> {
    attrs
        .into_iter()
        .map(|attr| {
            (
                attr.name.local.to_string(),
                attr.name.namespace.as_deref().map(str::to_string),
                attr.value.into_owned(),
            )
        })
        .collect()
}

fn element_field_matches(field: &SdkFieldDescriptor, name: &QName<'_>) -> bool {
    if field.is_xml_attribute() {
        return false;
    }
    let Some(serial) = field.xml_name() else {
        return false;
    };
    if serial != name.local {
        return false;
    }
    match field.find_trait(|t| match t {
        FieldTrait::XmlNamespace { uri, .. } => Some(uri.as_str()),
        _ => None,
    }) {
        Some(uri) => name.namespace.as_deref() == Some(uri),
        None => true,
    }
}

fn attribute_field_matches(field: &SdkFieldDescriptor, local: &str, ns: Option<&str>) -> bool {
    if !field.is_xml_attribute() {
        return false;
    }
    if field.xml_name() != Some(local) {
        return false;
    }
    match field.find_trait(|t| match t {
        FieldTrait::XmlNamespace { uri, .. } => Some(uri.as_str()),
        _ => None,
    }) {
        Some(uri) => ns == Some(uri),
        None => true,
    }
}

impl<'inp> XmlDeserializer<'inp> {
    /// Creates a deserializer over a complete document.
    pub fn new(input: &'inp str) -> Self {
        XmlDeserializer {
            reader: XmlTokenReader::new(input),
            frames: Vec::new(),
            pending: None,
        }
    }

    fn next(&mut self) -> Result<XmlToken<'inp>, DeserializationError> {
        self.reader.next_token().map_err(decode_err)
    }

    fn peek(&mut self) -> Result<XmlToken<'inp>, DeserializationError> {
        self.reader.peek(1).map_err(decode_err)
    }

    /// Consumes everything up to and including the end token at `depth`.
    fn drain_to_end(&mut self, depth: usize) -> Result<(), DeserializationError> {
        loop {
            match self.next()? {
                XmlToken::EndElement { depth: d, .. } if d == depth => return Ok(()),
                XmlToken::EndDocument => {
                    return Err(DeserializationError::new(
                        "document ended while skipping a value",
                    ))
                }
                _ => {}
            }
        }
    }

    fn take_pending(&mut self) -> Result<Pending, DeserializationError> {
        self.pending
            .take()
            .ok_or_else(|| DeserializationError::new("no pending value to read"))
    }

    fn read_text(&mut self) -> Result<String, DeserializationError> {
        match self.take_pending()? {
            Pending::Attribute(value) => Ok(value),
            Pending::Element { depth, .. } => {
                let mut out = String::new();
                loop {
                    match self.next()? {
                        XmlToken::Text { text, .. } => out.push_str(&text),
                        XmlToken::EndElement { depth: d, .. } if d == depth => return Ok(out),
                        XmlToken::BeginElement { name, .. } => {
                            return Err(DeserializationError::new(format!(
                                "expected scalar content but found element `{}`",
                                name.local
                            )))
                        }
                        XmlToken::EndDocument => {
                            return Err(DeserializationError::new(
                                "document ended inside a scalar value",
                            ))
                        }
                        XmlToken::EndElement { .. } => {
                            return Err(DeserializationError::new("malformed document structure"))
                        }
                    }
                }
            }
        }
    }
}

impl Deserializer for XmlDeserializer<'_> {
    fn begin_struct(
        &mut self,
        descriptor: &SdkObjectDescriptor,
    ) -> Result<(), DeserializationError> {
        match self.pending.take() {
            Some(Pending::Element { depth, attrs }) => {
                self.frames.push(Frame::Struct {
                    depth,
                    attrs: attrs.into(),
                });
                Ok(())
            }
            Some(Pending::Attribute(_)) => Err(DeserializationError::new(
                "a structure cannot be read from an attribute",
            )),
            None if self.frames.is_empty() => loop {
                match self.next()? {
                    XmlToken::BeginElement {
                        depth,
                        name,
                        attributes,
                        ..
                    } => {
                        if let Some(expected) = descriptor.xml_name() {
                            if name.local != expected {
                                return Err(DeserializationError::new(format!(
                                    "unexpected root element `{}` (expected `{}`)",
                                    name.local, expected
                                )));
                            }
                        }
                        self.frames.push(Frame::Struct {
                            depth,
                            attrs: owned_attrs(attributes).into(),
                        });
                        return Ok(());
                    }
                    XmlToken::EndDocument => {
                        return Err(DeserializationError::new("document has no root element"))
                    }
                    _ => continue,
                }
            },
            None => Err(DeserializationError::new(
                "begin_struct requires a matched struct field",
            )),
        }
    }

    fn find_next_field_index(
        &mut self,
        descriptor: &SdkObjectDescriptor,
    ) -> Result<Option<usize>, DeserializationError> {
        if self.pending.is_some() {
            return Err(DeserializationError::new(
                "the previous field value was not consumed",
            ));
        }
        let frame_depth = match self.frames.last() {
            Some(Frame::Struct { depth, .. }) => *depth,
            _ => {
                return Err(DeserializationError::new(
                    "find_next_field_index requires an open structure",
                ))
            }
        };
        // attributes of the open element are delivered before its children;
        // unmatched attributes are dropped
        loop {
            let attr = match self.frames.last_mut() {
                Some(Frame::Struct { attrs, .. }) => attrs.pop_front(),
                _ => unreachable!("frame checked above"),
            };
            let Some((local, ns, value)) = attr else {
                break;
            };
            if let Some(field) = descriptor
                .fields
                .iter()
                .find(|field| attribute_field_matches(field, &local, ns.as_deref()))
            {
                self.pending = Some(Pending::Attribute(value));
                return Ok(Some(field.index));
            }
        }
        loop {
            match self.next()? {
                XmlToken::BeginElement {
                    depth,
                    name,
                    attributes,
                    ..
                } if depth == frame_depth + 1 => {
                    let matched = descriptor
                        .fields
                        .iter()
                        .find(|field| element_field_matches(field, &name));
                    self.pending = Some(Pending::Element {
                        depth,
                        attrs: owned_attrs(attributes),
                    });
                    return Ok(Some(matched.map(|field| field.index).unwrap_or(UNKNOWN_FIELD)));
                }
                XmlToken::Text { .. } => continue,
                XmlToken::EndElement { depth, .. } if depth == frame_depth => {
                    self.frames.pop();
                    return Ok(None);
                }
                XmlToken::EndDocument => return Ok(None),
                _ => {
                    return Err(DeserializationError::new("malformed document structure"))
                }
            }
        }
    }

    fn skip_value(&mut self) -> Result<(), DeserializationError> {
        match self.take_pending()? {
            Pending::Attribute(_) => Ok(()),
            Pending::Element { depth, .. } => self.drain_to_end(depth),
        }
    }

    fn begin_list(
        &mut self,
        descriptor: &SdkFieldDescriptor,
    ) -> Result<(), DeserializationError> {
        let Pending::Element { depth, attrs } = self.take_pending()? else {
            return Err(DeserializationError::new(
                "a list cannot be read from an attribute",
            ));
        };
        if descriptor.is_flattened() {
            let member_name = descriptor
                .xml_name()
                .ok_or_else(|| {
                    DeserializationError::new("flattened list descriptor has no serial name")
                })?
                .to_string();
            self.frames.push(Frame::List {
                container_depth: depth - 1,
                member_name,
                flattened: true,
                pending_first: Some((depth, attrs)),
            });
        } else {
            let member_name = descriptor
                .find_trait(|t| match t {
                    FieldTrait::XmlCollectionName(name) => Some(name.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| DEFAULT_MEMBER_NAME.to_string());
            self.frames.push(Frame::List {
                container_depth: depth,
                member_name,
                flattened: false,
                pending_first: None,
            });
        }
        Ok(())
    }

    fn next_element(&mut self) -> Result<bool, DeserializationError> {
        let (container_depth, flattened, member_name, pending_first) =
            match self.frames.last_mut() {
                Some(Frame::List {
                    container_depth,
                    flattened,
                    member_name,
                    pending_first,
                }) => (
                    *container_depth,
                    *flattened,
                    member_name.clone(),
                    pending_first.take(),
                ),
                _ => {
                    return Err(DeserializationError::new(
                        "next_element requires an open list",
                    ))
                }
            };
        if let Some((depth, attrs)) = pending_first {
            self.pending = Some(Pending::Element { depth, attrs });
            return Ok(true);
        }
        if flattened {
            match self.peek()? {
                XmlToken::BeginElement { depth, name, .. }
                    if depth == container_depth + 1 && name.local == member_name =>
                {
                    match self.next()? {
                        XmlToken::BeginElement {
                            depth, attributes, ..
                        } => {
                            self.pending = Some(Pending::Element {
                                depth,
                                attrs: owned_attrs(attributes),
                            });
                            Ok(true)
                        }
                        _ => unreachable!("token was peeked"),
                    }
                }
                _ => {
                    self.frames.pop();
                    Ok(false)
                }
            }
        } else {
            loop {
                match self.next()? {
                    XmlToken::BeginElement {
                        depth, attributes, ..
                    } if depth == container_depth + 1 => {
                        self.pending = Some(Pending::Element {
                            depth,
                            attrs: owned_attrs(attributes),
                        });
                        return Ok(true);
                    }
                    XmlToken::Text { .. } => continue,
                    XmlToken::EndElement { depth, .. } if depth == container_depth => {
                        self.frames.pop();
                        return Ok(false);
                    }
                    XmlToken::EndDocument => {
                        return Err(DeserializationError::new(
                            "document ended inside a list",
                        ))
                    }
                    _ => {
                        return Err(DeserializationError::new("malformed document structure"))
                    }
                }
            }
        }
    }

    fn begin_map(&mut self, descriptor: &SdkFieldDescriptor) -> Result<(), DeserializationError> {
        let Pending::Element { depth, attrs } = self.take_pending()? else {
            return Err(DeserializationError::new(
                "a map cannot be read from an attribute",
            ));
        };
        let (key_name, value_name) = descriptor
            .find_trait(|t| match t {
                FieldTrait::XmlMapName { key, value } => Some((key.clone(), value.clone())),
                _ => None,
            })
            .unwrap_or_else(|| (DEFAULT_KEY_NAME.to_string(), DEFAULT_VALUE_NAME.to_string()));
        if descriptor.is_flattened() {
            let entry_name = descriptor
                .xml_name()
                .ok_or_else(|| {
                    DeserializationError::new("flattened map descriptor has no serial name")
                })?
                .to_string();
            self.frames.push(Frame::Map {
                container_depth: depth - 1,
                entry_name,
                key_name,
                value_name,
                flattened: true,
                pending_first: Some((depth, attrs)),
                open_entry_depth: None,
            });
        } else {
            self.frames.push(Frame::Map {
                container_depth: depth,
                entry_name: DEFAULT_ENTRY_NAME.to_string(),
                key_name,
                value_name,
                flattened: false,
                pending_first: None,
                open_entry_depth: None,
            });
        }
        Ok(())
    }

    fn next_key(&mut self) -> Result<Option<String>, DeserializationError> {
        let (container_depth, flattened, entry_name, key_name, value_name, pending_first, open) =
            match self.frames.last_mut() {
                Some(Frame::Map {
                    container_depth,
                    flattened,
                    entry_name,
                    key_name,
                    value_name,
                    pending_first,
                    open_entry_depth,
                }) => (
                    *container_depth,
                    *flattened,
                    entry_name.clone(),
                    key_name.clone(),
                    value_name.clone(),
                    pending_first.take(),
                    open_entry_depth.take(),
                ),
                _ => {
                    return Err(DeserializationError::new(
                        "next_key requires an open map",
                    ))
                }
            };
        if let Some(depth) = open {
            // finish the previous entry
            self.drain_to_end(depth)?;
        }

        // position on the next entry element
        let entry_depth = if let Some((depth, _attrs)) = pending_first {
            depth
        } else if flattened {
            match self.peek()? {
                XmlToken::BeginElement { depth, name, .. }
                    if depth == container_depth + 1 && name.local == entry_name =>
                {
                    self.next()?;
                    depth
                }
                _ => {
                    self.frames.pop();
                    return Ok(None);
                }
            }
        } else {
            loop {
                match self.next()? {
                    XmlToken::BeginElement { depth, .. } if depth == container_depth + 1 => {
                        break depth
                    }
                    XmlToken::Text { .. } => continue,
                    XmlToken::EndElement { depth, .. } if depth == container_depth => {
                        self.frames.pop();
                        return Ok(None);
                    }
                    XmlToken::EndDocument => {
                        return Err(DeserializationError::new("document ended inside a map"))
                    }
                    _ => {
                        return Err(DeserializationError::new("malformed document structure"))
                    }
                }
            }
        };

        // read the key element
        let key = loop {
            match self.next()? {
                XmlToken::BeginElement { depth, name, .. } if depth == entry_depth + 1 => {
                    if name.local == key_name {
                        self.pending = Some(Pending::Element {
                            depth,
                            attrs: Vec::new(),
                        });
                        break self.read_text()?;
                    }
                    // unknown element ahead of the key
                    self.drain_to_end(depth)?;
                }
                XmlToken::Text { .. } => continue,
                XmlToken::EndElement { depth, .. } if depth == entry_depth => {
                    return Err(DeserializationError::new("map entry is missing its key"))
                }
                _ => {
                    return Err(DeserializationError::new("malformed document structure"))
                }
            }
        };

        // position on the value element
        loop {
            match self.next()? {
                XmlToken::BeginElement {
                    depth,
                    name,
                    attributes,
                    ..
                } if depth == entry_depth + 1 => {
                    if name.local == value_name {
                        self.pending = Some(Pending::Element {
                            depth,
                            attrs: owned_attrs(attributes),
                        });
                        match self.frames.last_mut() {
                            Some(Frame::Map {
                                open_entry_depth, ..
                            }) => *open_entry_depth = Some(entry_depth),
                            _ => unreachable!("map frame checked above"),
                        }
                        return Ok(Some(key));
                    }
                    self.drain_to_end(depth)?;
                }
                XmlToken::Text { .. } => continue,
                XmlToken::EndElement { depth, .. } if depth == entry_depth => {
                    return Err(DeserializationError::new("map entry is missing its value"))
                }
                _ => return Err(DeserializationError::new("malformed document structure")),
            }
        }
    }

    fn is_null(&mut self) -> Result<bool, DeserializationError> {
        match &self.pending {
            Some(Pending::Attribute(_)) => Ok(false),
            Some(Pending::Element { depth, .. }) => {
                let depth = *depth;
                Ok(matches!(
                    self.peek()?,
                    XmlToken::EndElement { depth: d, .. } if d == depth
                ))
            }
            None => Err(DeserializationError::new("no pending value")),
        }
    }

    fn read_null(&mut self) -> Result<(), DeserializationError> {
        match self.take_pending()? {
            Pending::Attribute(value) if value.is_empty() => Ok(()),
            Pending::Attribute(_) => {
                Err(DeserializationError::new("expected a null attribute value"))
            }
            Pending::Element { depth, .. } => match self.next()? {
                XmlToken::EndElement { depth: d, .. } if d == depth => Ok(()),
                _ => Err(DeserializationError::new("expected an empty element")),
            },
        }
    }

    fn read_boolean(&mut self) -> Result<bool, DeserializationError> {
        match self.read_text()?.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(DeserializationError::new(format!(
                "invalid boolean `{}`",
                other
            ))),
        }
    }

    fn read_byte(&mut self) -> Result<i8, DeserializationError> {
        let text = self.read_text()?;
        text.parse()
            .map_err(|_| DeserializationError::new(format!("invalid byte `{}`", text)))
    }

    fn read_short(&mut self) -> Result<i16, DeserializationError> {
        let text = self.read_text()?;
        text.parse()
            .map_err(|_| DeserializationError::new(format!("invalid short `{}`", text)))
    }

    fn read_integer(&mut self) -> Result<i32, DeserializationError> {
        let text = self.read_text()?;
        text.parse()
            .map_err(|_| DeserializationError::new(format!("invalid integer `{}`", text)))
    }

    fn read_long(&mut self) -> Result<i64, DeserializationError> {
        let text = self.read_text()?;
        text.parse()
            .map_err(|_| DeserializationError::new(format!("invalid long `{}`", text)))
    }

    fn read_float(&mut self) -> Result<f32, DeserializationError> {
        Ok(self.read_double()? as f32)
    }

    fn read_double(&mut self) -> Result<f64, DeserializationError> {
        let text = self.read_text()?;
        match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse()
                .map_err(|_| DeserializationError::new(format!("invalid double `{}`", other))),
        }
    }

    fn read_char(&mut self) -> Result<char, DeserializationError> {
        let text = self.read_text()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(DeserializationError::new(format!(
                "expected a single character, got `{}`",
                text
            ))),
        }
    }

    fn read_string(&mut self) -> Result<String, DeserializationError> {
        self.read_text()
    }

    fn read_blob(&mut self) -> Result<Blob, DeserializationError> {
        let text = self.read_text()?;
        base64::decode(&text)
            .map(Blob::new)
            .map_err(|err| DeserializationError::with_source("invalid base64 blob", err))
    }

    fn read_big_number(&mut self) -> Result<String, DeserializationError> {
        self.read_text()
    }

    fn read_timestamp(&mut self, format: Format) -> Result<DateTime, DeserializationError> {
        let text = self.read_text()?;
        let parsed = match format {
            Format::DateTime => parse_iso8601(&text),
            Format::HttpDate => parse_rfc5322(&text),
            Format::EpochSeconds => parse_epoch(&text),
        };
        parsed
            .map(|datetime| datetime.as_date_time())
            .map_err(|err| {
                DeserializationError::with_source(format!("invalid timestamp `{}`", text), err)
            })
    }
}
