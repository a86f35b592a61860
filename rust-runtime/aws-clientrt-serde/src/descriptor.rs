/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Runtime descriptors for serialized shapes.

/// The serialized kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialKind {
    /// Boolean value
    Boolean,
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Single character
    Char,
    /// UTF-8 string
    String,
    /// Binary data
    Blob,
    /// Arbitrary-precision number carried as its decimal representation
    BigNumber,
    /// Instant in time
    Timestamp,
    /// Ordered collection
    List,
    /// Key/value collection with string keys
    Map,
    /// Structure with named members
    Struct,
    /// String-backed enumeration
    Enum,
    /// Integer-backed enumeration
    IntEnum,
    /// Schemaless document value
    Document,
    /// The unit shape (no value)
    Unit,
}

/// Index reported by `find_next_field_index` for a field not present in the
/// descriptor. Unknown fields must be skippable via `skip_value`.
pub const UNKNOWN_FIELD: usize = usize::MAX;

/// Format-specific metadata attached to a descriptor.
///
/// The trait set is open: format implementations pick out the traits they
/// understand and ignore the rest, so a descriptor can carry XML and
/// form-url traits at the same time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldTrait {
    /// XML element (or attribute) name for this field.
    XmlSerialName(String),
    /// Serialize this field as an attribute of the enclosing element.
    XmlAttribute,
    /// Namespace declared on (and applied to) this field's element.
    XmlNamespace {
        /// Namespace URI.
        uri: String,
        /// Bound prefix; `None` declares the default namespace.
        prefix: Option<String>,
    },
    /// Member element name for a wrapped collection (default `member`).
    XmlCollectionName(String),
    /// Entry key/value element names for a map (defaults `key`/`value`).
    XmlMapName {
        /// Name of the key element.
        key: String,
        /// Name of the value element.
        value: String,
    },
    /// Collection or map members appear directly in the parent, without a
    /// wrapper element.
    Flattened,
    /// Namespace applied to the member elements of a collection.
    XmlCollectionValueNamespace {
        /// Namespace URI.
        uri: String,
        /// Bound prefix; `None` declares the default namespace.
        prefix: Option<String>,
    },
    /// Namespace applied to the key elements of a map.
    XmlMapKeyNamespace {
        /// Namespace URI.
        uri: String,
        /// Bound prefix; `None` declares the default namespace.
        prefix: Option<String>,
    },
    /// form-url key for this field.
    FormUrlSerialName(String),
    /// form-url collections drop the `member`/`entry` path segment.
    FormUrlFlattened,
    /// Member path segment for a wrapped form-url collection.
    FormUrlCollectionName(String),
    /// Key/value path segments for a form-url map.
    FormUrlMapName {
        /// Path segment of map keys.
        key: String,
        /// Path segment of map values.
        value: String,
    },
    /// A literal key/value pair always serialized with the object
    /// (e.g. `Action`/`Version` on query protocol requests).
    QueryLiteral {
        /// Literal key.
        key: String,
        /// Literal value.
        value: String,
    },
    /// Collection values may be null and nulls must be round-tripped.
    SparseValues,
}

/// Describes one serialized field: its kind, its positional index within the
/// owning structure, and its format traits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkFieldDescriptor {
    /// Serialized kind of this field.
    pub kind: SerialKind,
    /// Positional index reported by `find_next_field_index`.
    pub index: usize,
    /// Format-specific traits.
    pub traits: Vec<FieldTrait>,
}

impl SdkFieldDescriptor {
    /// Creates a descriptor with no traits.
    pub fn new(kind: SerialKind, index: usize) -> Self {
        SdkFieldDescriptor {
            kind,
            index,
            traits: Vec::new(),
        }
    }

    /// Attaches a trait.
    pub fn with_trait(mut self, field_trait: FieldTrait) -> Self {
        self.traits.push(field_trait);
        self
    }

    /// Finds the first trait matched by `select`.
    pub fn find_trait<'a, T>(&'a self, select: impl Fn(&'a FieldTrait) -> Option<T>) -> Option<T> {
        self.traits.iter().find_map(select)
    }

    /// True when `predicate` matches any attached trait.
    pub fn has_trait(&self, predicate: impl Fn(&FieldTrait) -> bool) -> bool {
        self.traits.iter().any(predicate)
    }

    /// XML element/attribute name, when declared.
    pub fn xml_name(&self) -> Option<&str> {
        self.find_trait(|t| match t {
            FieldTrait::XmlSerialName(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// form-url key, when declared.
    pub fn form_url_name(&self) -> Option<&str> {
        self.find_trait(|t| match t {
            FieldTrait::FormUrlSerialName(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// True when the field is an XML attribute.
    pub fn is_xml_attribute(&self) -> bool {
        self.has_trait(|t| matches!(t, FieldTrait::XmlAttribute))
    }

    /// True when the collection or map is flattened for the given format
    /// flavor of the flatten trait.
    pub fn is_flattened(&self) -> bool {
        self.has_trait(|t| matches!(t, FieldTrait::Flattened))
    }

    /// True when the collection tolerates and round-trips null values.
    pub fn is_sparse(&self) -> bool {
        self.has_trait(|t| matches!(t, FieldTrait::SparseValues))
    }
}

/// Structure-level descriptor carrying the child field descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkObjectDescriptor {
    /// Traits of the structure itself (serial name, namespaces, literals).
    pub traits: Vec<FieldTrait>,
    /// Child fields, in index order.
    pub fields: Vec<SdkFieldDescriptor>,
}

impl SdkObjectDescriptor {
    /// Returns a builder.
    pub fn builder() -> SdkObjectDescriptorBuilder {
        SdkObjectDescriptorBuilder::default()
    }

    /// XML element name of the structure, when declared.
    pub fn xml_name(&self) -> Option<&str> {
        self.traits.iter().find_map(|t| match t {
            FieldTrait::XmlSerialName(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Looks up a child field by index.
    pub fn field(&self, index: usize) -> Option<&SdkFieldDescriptor> {
        self.fields.iter().find(|field| field.index == index)
    }
}

/// Builder for [`SdkObjectDescriptor`].
#[derive(Debug, Default)]
pub struct SdkObjectDescriptorBuilder {
    traits: Vec<FieldTrait>,
    fields: Vec<SdkFieldDescriptor>,
}

impl SdkObjectDescriptorBuilder {
    /// Attaches a structure-level trait.
    pub fn with_trait(mut self, field_trait: FieldTrait) -> Self {
        self.traits.push(field_trait);
        self
    }

    /// Adds a child field descriptor.
    pub fn field(mut self, descriptor: SdkFieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    /// Builds the descriptor.
    pub fn build(self) -> SdkObjectDescriptor {
        SdkObjectDescriptor {
            traits: self.traits,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trait_lookup() {
        let descriptor = SdkFieldDescriptor::new(SerialKind::List, 0)
            .with_trait(FieldTrait::XmlSerialName("Items".into()))
            .with_trait(FieldTrait::Flattened)
            .with_trait(FieldTrait::FormUrlSerialName("Items".into()));
        assert_eq!(Some("Items"), descriptor.xml_name());
        assert!(descriptor.is_flattened());
        assert!(!descriptor.is_xml_attribute());
        assert_eq!(Some("Items"), descriptor.form_url_name());
    }

    #[test]
    fn object_descriptor_indexes_fields() {
        let object = SdkObjectDescriptor::builder()
            .with_trait(FieldTrait::XmlSerialName("Shape".into()))
            .field(
                SdkFieldDescriptor::new(SerialKind::String, 0)
                    .with_trait(FieldTrait::XmlSerialName("Name".into())),
            )
            .field(
                SdkFieldDescriptor::new(SerialKind::Integer, 1)
                    .with_trait(FieldTrait::XmlSerialName("Count".into())),
            )
            .build();
        assert_eq!(Some("Shape"), object.xml_name());
        assert_eq!(Some("Count"), object.field(1).and_then(|f| f.xml_name()));
        assert!(object.field(7).is_none());
    }
}
