/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! XML back-end for the descriptor-driven serialization framework.
//!
//! [`XmlSerializer`] and [`XmlDeserializer`] honor the XML descriptor
//! traits: serial names, attribute placement, namespaces (including
//! collection-value and map-key namespaces), wrapped vs flattened
//! collections, and custom map entry names. Values written and read with
//! the same descriptor set round-trip for every supported kind.

mod de;
mod ser;

pub use de::XmlDeserializer;
pub use ser::XmlSerializer;
