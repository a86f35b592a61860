/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Errors produced by the streaming I/O layer.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum IoError {
    /// An argument violated the contract of the called operation.
    InvalidArgument {
        /// What was wrong with the argument.
        message: String,
    },
    /// The stream ended before the requested number of bytes was available.
    EndOfStream {
        /// Number of bytes the caller asked for.
        expected: usize,
        /// Number of bytes that could be read before the end of the stream.
        available: usize,
    },
    /// The operation failed because the channel was closed.
    ChannelClosed {
        /// The failure that closed the channel, if it was closed with one.
        cause: Option<Arc<dyn StdError + Send + Sync>>,
    },
}

impl IoError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        IoError::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn end_of_stream(expected: usize, available: usize) -> Self {
        IoError::EndOfStream {
            expected,
            available,
        }
    }

    pub(crate) fn closed(cause: Option<Arc<dyn StdError + Send + Sync>>) -> Self {
        IoError::ChannelClosed { cause }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::InvalidArgument { message } => write!(f, "invalid argument: {}", message),
            IoError::EndOfStream {
                expected,
                available,
            } => write!(
                f,
                "unexpected end of stream: expected {} bytes, {} available",
                expected, available
            ),
            IoError::ChannelClosed { cause: None } => write!(f, "channel closed"),
            IoError::ChannelClosed { cause: Some(cause) } => {
                write!(f, "channel closed: {}", cause)
            }
        }
    }
}

impl StdError for IoError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            IoError::ChannelClosed { cause: Some(cause) } => Some(cause.as_ref() as _),
            _ => None,
        }
    }
}
