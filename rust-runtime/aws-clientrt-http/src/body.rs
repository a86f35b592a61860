/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! HTTP request and response bodies.

use aws_clientrt_io::{IoError, Source};
use bytes::Bytes;
use std::fmt;

/// An HTTP body: empty, in-memory bytes, or a lazily-produced stream.
pub enum SdkBody {
    /// No body.
    Empty,
    /// A body held entirely in memory. Replayable across retries.
    Bytes(Bytes),
    /// A streaming body. One-shot unless the underlying source is bounded.
    Streaming {
        /// Where the bytes come from.
        source: Source,
        /// Total body size, when known up front.
        content_length: Option<u64>,
    },
}

impl SdkBody {
    /// Creates an empty body.
    pub fn empty() -> Self {
        SdkBody::Empty
    }

    /// Creates an in-memory body.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        SdkBody::Bytes(data.into())
    }

    /// Creates a streaming body. The source's own length is used when
    /// `content_length` is not given.
    pub fn from_source(source: Source, content_length: Option<u64>) -> Self {
        let content_length = content_length.or_else(|| source.content_length());
        SdkBody::Streaming {
            source,
            content_length,
        }
    }

    /// Number of bytes this body will produce, when known.
    pub fn content_length(&self) -> Option<u64> {
        match self {
            SdkBody::Empty => Some(0),
            SdkBody::Bytes(data) => Some(data.len() as u64),
            SdkBody::Streaming { content_length, .. } => *content_length,
        }
    }

    /// Borrows the bytes of an in-memory body. `None` for streaming bodies.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            SdkBody::Empty => Some(&[]),
            SdkBody::Bytes(data) => Some(data),
            SdkBody::Streaming { .. } => None,
        }
    }

    /// Attempts to clone this body for a retry. Streaming bodies can only
    /// be replayed when their source is restartable.
    pub fn try_clone(&self) -> Option<SdkBody> {
        match self {
            SdkBody::Empty => Some(SdkBody::Empty),
            SdkBody::Bytes(data) => Some(SdkBody::Bytes(data.clone())),
            SdkBody::Streaming {
                source,
                content_length,
            } => source.try_clone().map(|source| SdkBody::Streaming {
                source,
                content_length: *content_length,
            }),
        }
    }

    /// Reads the entire body into memory.
    pub async fn collect(self) -> Result<Bytes, IoError> {
        match self {
            SdkBody::Empty => Ok(Bytes::new()),
            SdkBody::Bytes(data) => Ok(data),
            SdkBody::Streaming { mut source, .. } => {
                source.read_all().await.map(Bytes::from)
            }
        }
    }
}

impl fmt::Debug for SdkBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkBody::Empty => write!(f, "SdkBody::Empty"),
            SdkBody::Bytes(data) => f
                .debug_struct("SdkBody::Bytes")
                .field("len", &data.len())
                .finish(),
            SdkBody::Streaming { content_length, .. } => f
                .debug_struct("SdkBody::Streaming")
                .field("content_length", content_length)
                .finish(),
        }
    }
}

impl From<&'static str> for SdkBody {
    fn from(data: &'static str) -> Self {
        SdkBody::from_bytes(data.as_bytes())
    }
}

impl From<Vec<u8>> for SdkBody {
    fn from(data: Vec<u8>) -> Self {
        SdkBody::from_bytes(data)
    }
}

impl From<Bytes> for SdkBody {
    fn from(data: Bytes) -> Self {
        SdkBody::from_bytes(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_clientrt_io::ByteChannel;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn bytes_body_is_replayable() {
        let body = SdkBody::from("hello");
        assert_eq!(Some(5), body.content_length());
        assert_eq!(Some(&b"hello"[..]), body.bytes());
        let replay = body.try_clone().unwrap();
        assert_eq!(body.collect().await.unwrap(), b"hello".as_slice());
        assert_eq!(replay.collect().await.unwrap(), b"hello".as_slice());
    }

    #[tokio::test]
    async fn streaming_body_reads_from_channel() {
        let channel = ByteChannel::new();
        channel.write_fully(b"streamed").await.unwrap();
        channel.close();

        let body = SdkBody::from_source(Source::from_channel(channel), Some(8));
        assert_eq!(Some(8), body.content_length());
        assert!(body.bytes().is_none());
        assert!(body.try_clone().is_none());
        assert_eq!(body.collect().await.unwrap(), b"streamed".as_slice());
    }

    #[test]
    fn bounded_source_supplies_its_length() {
        let body = SdkBody::from_source(Source::from_static(b"abc"), None);
        assert_eq!(Some(3), body.content_length());
    }
}
