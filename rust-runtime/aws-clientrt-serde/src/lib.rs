/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Descriptor-driven serialization framework.
//!
//! Generated code describes each shape with an [`SdkFieldDescriptor`] (kind,
//! index, and format-specific traits) and drives a format back-end through
//! the [`Serializer`](ser::Serializer) and [`Deserializer`](de::Deserializer)
//! contracts. Format implementations consult descriptor traits to decide
//! element vs attribute placement, wrapping vs flattening, naming, and
//! namespaces, and ignore traits they do not recognize.

pub mod de;
pub mod descriptor;
pub mod error;
pub mod ser;

pub use de::Deserializer;
pub use descriptor::{
    FieldTrait, SdkFieldDescriptor, SdkObjectDescriptor, SerialKind, UNKNOWN_FIELD,
};
pub use error::{DeserializationError, SerializationError};
pub use ser::{SerialValue, Serializer};
