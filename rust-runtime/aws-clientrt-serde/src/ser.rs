/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Serializer contract implemented by the format back-ends.

use crate::descriptor::{SdkFieldDescriptor, SdkObjectDescriptor};
use crate::error::SerializationError;
use aws_clientrt_types::{Blob, DateTime, Document, Format};

/// A typed leaf value handed to a serializer.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub enum SerialValue<'a> {
    /// Boolean value
    Boolean(bool),
    /// 8-bit signed integer
    Byte(i8),
    /// 16-bit signed integer
    Short(i16),
    /// 32-bit signed integer
    Integer(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Single character
    Char(char),
    /// UTF-8 string (also used for string-backed enums)
    String(&'a str),
    /// Binary data, base64 on text formats
    Blob(&'a Blob),
    /// Arbitrary-precision number in decimal notation
    BigNumber(&'a str),
    /// Instant serialized in the given wire format
    Timestamp(&'a DateTime, Format),
    /// Schemaless document; rejected by formats without a mapping
    Document(&'a Document),
    /// Explicit null, only valid inside sparse collections
    Null,
}

/// Descriptor-driven serializer.
///
/// Containers are written with matched `begin_*`/`end_*` scopes; leaves are
/// written with [`field`](Serializer::field) inside struct scopes,
/// [`element`](Serializer::element) inside list scopes, and
/// [`entry`](Serializer::entry) inside map scopes. Implementations validate
/// scope balance and report violations as [`SerializationError`].
pub trait Serializer {
    /// Opens a structure scope.
    ///
    /// At the top level `descriptor` names the document root; nested within
    /// another scope, `field_descriptor` of the containing field (carrying
    /// its serial name) must be supplied via
    /// [`begin_struct_field`](Serializer::begin_struct_field) instead.
    fn begin_struct(&mut self, descriptor: &SdkObjectDescriptor)
        -> Result<(), SerializationError>;

    /// Opens a structure scope for a struct-valued field, list element, or
    /// map value.
    fn begin_struct_field(
        &mut self,
        field: &SdkFieldDescriptor,
        descriptor: &SdkObjectDescriptor,
    ) -> Result<(), SerializationError>;

    /// Closes the innermost structure scope.
    fn end_struct(&mut self) -> Result<(), SerializationError>;

    /// Opens a list scope for the given field.
    fn begin_list(&mut self, descriptor: &SdkFieldDescriptor) -> Result<(), SerializationError>;

    /// Closes the innermost list scope.
    fn end_list(&mut self) -> Result<(), SerializationError>;

    /// Opens a map scope for the given field.
    fn begin_map(&mut self, descriptor: &SdkFieldDescriptor) -> Result<(), SerializationError>;

    /// Closes the innermost map scope.
    fn end_map(&mut self) -> Result<(), SerializationError>;

    /// Writes a leaf field of the enclosing structure.
    fn field(
        &mut self,
        descriptor: &SdkFieldDescriptor,
        value: SerialValue<'_>,
    ) -> Result<(), SerializationError>;

    /// Writes a leaf element of the enclosing list.
    fn element(&mut self, value: SerialValue<'_>) -> Result<(), SerializationError>;

    /// Writes a leaf entry of the enclosing map.
    fn entry(&mut self, key: &str, value: SerialValue<'_>) -> Result<(), SerializationError>;
}
