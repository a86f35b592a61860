/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Deserializer contract implemented by the format back-ends.

use crate::descriptor::{SdkFieldDescriptor, SdkObjectDescriptor};
use crate::error::DeserializationError;
use aws_clientrt_types::{Blob, DateTime, Format};

/// Descriptor-driven deserializer.
///
/// Structures are read as an iterator over field indexes:
/// [`find_next_field_index`](Deserializer::find_next_field_index) yields the
/// descriptor index of the next known field,
/// [`UNKNOWN_FIELD`](crate::descriptor::UNKNOWN_FIELD) for a field that is
/// not in the descriptor (which must then be skipped with
/// [`skip_value`](Deserializer::skip_value)), and `None` at the end of the
/// container. Lists and maps are iterated with
/// [`next_element`](Deserializer::next_element) and
/// [`next_key`](Deserializer::next_key).
pub trait Deserializer {
    /// Opens the structure a matched struct field (or the document root)
    /// contains.
    fn begin_struct(
        &mut self,
        descriptor: &SdkObjectDescriptor,
    ) -> Result<(), DeserializationError>;

    /// Advances to the next field of the open structure.
    fn find_next_field_index(
        &mut self,
        descriptor: &SdkObjectDescriptor,
    ) -> Result<Option<usize>, DeserializationError>;

    /// Skips the value of the field last returned by
    /// [`find_next_field_index`](Deserializer::find_next_field_index).
    fn skip_value(&mut self) -> Result<(), DeserializationError>;

    /// Opens the list a matched list field contains.
    fn begin_list(&mut self, descriptor: &SdkFieldDescriptor)
        -> Result<(), DeserializationError>;

    /// Advances to the next list element; `false` closes the list scope.
    fn next_element(&mut self) -> Result<bool, DeserializationError>;

    /// Opens the map a matched map field contains.
    fn begin_map(&mut self, descriptor: &SdkFieldDescriptor) -> Result<(), DeserializationError>;

    /// Advances to the next map entry and returns its key; `None` closes the
    /// map scope.
    fn next_key(&mut self) -> Result<Option<String>, DeserializationError>;

    /// True when the pending value is an explicit null (an empty value
    /// element). Callers consult the descriptor's sparse trait to decide
    /// whether a null is legal.
    fn is_null(&mut self) -> Result<bool, DeserializationError>;

    /// Consumes a pending null value.
    fn read_null(&mut self) -> Result<(), DeserializationError>;

    /// Reads the pending value as a boolean.
    fn read_boolean(&mut self) -> Result<bool, DeserializationError>;
    /// Reads the pending value as an 8-bit integer.
    fn read_byte(&mut self) -> Result<i8, DeserializationError>;
    /// Reads the pending value as a 16-bit integer.
    fn read_short(&mut self) -> Result<i16, DeserializationError>;
    /// Reads the pending value as a 32-bit integer.
    fn read_integer(&mut self) -> Result<i32, DeserializationError>;
    /// Reads the pending value as a 64-bit integer.
    fn read_long(&mut self) -> Result<i64, DeserializationError>;
    /// Reads the pending value as a 32-bit float.
    fn read_float(&mut self) -> Result<f32, DeserializationError>;
    /// Reads the pending value as a 64-bit float.
    fn read_double(&mut self) -> Result<f64, DeserializationError>;
    /// Reads the pending value as a single character.
    fn read_char(&mut self) -> Result<char, DeserializationError>;
    /// Reads the pending value as a string.
    fn read_string(&mut self) -> Result<String, DeserializationError>;
    /// Reads the pending value as binary data.
    fn read_blob(&mut self) -> Result<Blob, DeserializationError>;
    /// Reads the pending value as an arbitrary-precision decimal string.
    fn read_big_number(&mut self) -> Result<String, DeserializationError>;
    /// Reads the pending value as a timestamp in the given wire format.
    fn read_timestamp(&mut self, format: Format) -> Result<DateTime, DeserializationError>;
}
