/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Read-only stream abstraction over in-memory bytes and lazy channels.

use crate::byte_channel::ByteChannel;
use crate::error::IoError;
use bytes::Bytes;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// A read-only stream of bytes.
///
/// Sources come in two shapes:
///
/// * **Bounded**: backed by a finite chunk of memory. The length is known up
///   front and the source can be replayed via [`try_clone`](Source::try_clone).
/// * **Streaming**: backed by a [`ByteChannel`]. One-shot and possibly
///   unbounded; reads suspend until the producer makes progress.
pub struct Source {
    inner: Inner,
}

enum Inner {
    Bytes(Bytes),
    Channel(ByteChannel),
}

#[derive(Debug)]
struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source cancelled")
    }
}

impl StdError for Cancelled {}

impl Source {
    /// Creates an empty bounded source.
    pub fn empty() -> Self {
        Source {
            inner: Inner::Bytes(Bytes::new()),
        }
    }

    /// Creates a bounded source over the given bytes.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Source {
            inner: Inner::Bytes(data.into()),
        }
    }

    /// Creates a bounded source over a static slice without copying.
    pub fn from_static(data: &'static [u8]) -> Self {
        Source {
            inner: Inner::Bytes(Bytes::from_static(data)),
        }
    }

    /// Creates a streaming source that reads from `channel`.
    pub fn from_channel(channel: ByteChannel) -> Self {
        Source {
            inner: Inner::Channel(channel),
        }
    }

    /// Number of bytes this source will yield, when known up front.
    pub fn content_length(&self) -> Option<u64> {
        match &self.inner {
            Inner::Bytes(data) => Some(data.len() as u64),
            Inner::Channel(_) => None,
        }
    }

    /// True for streaming sources, which can only be consumed once.
    pub fn is_one_shot(&self) -> bool {
        matches!(self.inner, Inner::Channel(_))
    }

    /// Returns a restarted copy of this source when it is bounded.
    /// Streaming sources cannot be replayed and yield `None`.
    pub fn try_clone(&self) -> Option<Source> {
        match &self.inner {
            Inner::Bytes(data) => Some(Source {
                inner: Inner::Bytes(data.clone()),
            }),
            Inner::Channel(_) => None,
        }
    }

    /// Reads up to `dst.len()` bytes. Returns `Ok(None)` once the source is
    /// exhausted. Streaming sources suspend while empty and open.
    pub async fn read_available(&mut self, dst: &mut [u8]) -> Result<Option<usize>, IoError> {
        match &mut self.inner {
            Inner::Bytes(data) => {
                if data.is_empty() {
                    return Ok(None);
                }
                let n = dst.len().min(data.len());
                dst[..n].copy_from_slice(&data.split_to(n));
                Ok(Some(n))
            }
            Inner::Channel(channel) => channel.read_available(dst).await,
        }
    }

    /// Reads exactly `dst.len()` bytes, failing with
    /// [`IoError::EndOfStream`] when the source ends early.
    pub async fn read_fully(&mut self, dst: &mut [u8]) -> Result<(), IoError> {
        match &mut self.inner {
            Inner::Bytes(data) => {
                if data.len() < dst.len() {
                    return Err(IoError::end_of_stream(dst.len(), data.len()));
                }
                dst.copy_from_slice(&data.split_to(dst.len()));
                Ok(())
            }
            Inner::Channel(channel) => channel.read_fully(dst).await,
        }
    }

    /// Reads every remaining byte.
    pub async fn read_all(&mut self) -> Result<Vec<u8>, IoError> {
        match &mut self.inner {
            Inner::Bytes(data) => Ok(data.split_to(data.len()).to_vec()),
            Inner::Channel(channel) => channel.read_all().await,
        }
    }

    /// Abandons the source, releasing whatever backs it. For streaming
    /// sources the producer observes the cancellation.
    pub fn cancel(&mut self) {
        match &mut self.inner {
            Inner::Bytes(data) => *data = Bytes::new(),
            Inner::Channel(channel) => channel.cancel(Arc::new(Cancelled)),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Bytes(data) => f
                .debug_struct("Source")
                .field("kind", &"bytes")
                .field("remaining", &data.len())
                .finish(),
            Inner::Channel(channel) => f
                .debug_struct("Source")
                .field("kind", &"channel")
                .field("channel", channel)
                .finish(),
        }
    }
}

impl From<Bytes> for Source {
    fn from(data: Bytes) -> Self {
        Source::from_bytes(data)
    }
}

impl From<Vec<u8>> for Source {
    fn from(data: Vec<u8>) -> Self {
        Source::from_bytes(data)
    }
}

impl From<&'static str> for Source {
    fn from(data: &'static str) -> Self {
        Source::from_static(data.as_bytes())
    }
}
