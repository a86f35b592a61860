/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::descriptor::SerialKind;
use aws_clientrt_types::error::BoxError;
use std::error::Error as StdError;
use std::fmt;

/// Invalid input at the serialization layer: a kind the format cannot
/// represent, unbalanced scopes, or a null value in a non-sparse collection.
#[derive(Debug)]
pub struct SerializationError {
    message: String,
}

impl SerializationError {
    /// Creates an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        SerializationError {
            message: message.into(),
        }
    }

    /// The format cannot represent `kind`.
    pub fn unsupported_kind(kind: SerialKind, format: &str) -> Self {
        SerializationError {
            message: format!("{:?} cannot be serialized as {}", kind, format),
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for SerializationError {}

/// Malformed input at the deserialization layer.
///
/// Wraps the lexer failure (with its position and snippet) when the failure
/// originated in the document itself.
#[derive(Debug)]
pub struct DeserializationError {
    message: String,
    source: Option<BoxError>,
}

impl DeserializationError {
    /// Creates an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        DeserializationError {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        DeserializationError {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl fmt::Display for DeserializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => write!(f, "{}", self.message),
        }
    }
}

impl StdError for DeserializationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|err| err as _)
    }
}
