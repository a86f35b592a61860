/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Write-only stream abstraction mirroring [`Source`](crate::Source).

use crate::byte_channel::ByteChannel;
use crate::error::IoError;
use std::fmt;

/// A write-only stream of bytes, backed either by an in-memory buffer or by
/// the write half of a [`ByteChannel`].
pub struct Sink {
    inner: Inner,
}

enum Inner {
    Buffer(Vec<u8>),
    Channel(ByteChannel),
}

impl Sink {
    /// Creates an in-memory sink.
    pub fn buffer() -> Self {
        Sink {
            inner: Inner::Buffer(Vec::new()),
        }
    }

    /// Creates a sink that writes into `channel`.
    pub fn from_channel(channel: ByteChannel) -> Self {
        Sink {
            inner: Inner::Channel(channel),
        }
    }

    /// Writes all of `src`, suspending when a backing channel is full.
    pub async fn write_fully(&mut self, src: &[u8]) -> Result<(), IoError> {
        match &mut self.inner {
            Inner::Buffer(buffer) => {
                buffer.extend_from_slice(src);
                Ok(())
            }
            Inner::Channel(channel) => channel.write_fully(src).await,
        }
    }

    /// Publishes buffered writes to the reading side, where applicable.
    pub fn flush(&mut self) {
        if let Inner::Channel(channel) = &self.inner {
            channel.flush();
        }
    }

    /// Closes the sink. For channel-backed sinks this closes the write half.
    pub fn close(&mut self) {
        if let Inner::Channel(channel) = &self.inner {
            channel.close();
        }
    }

    /// Consumes an in-memory sink and returns its contents. Returns `None`
    /// for channel-backed sinks.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self.inner {
            Inner::Buffer(buffer) => Some(buffer),
            Inner::Channel(_) => None,
        }
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Buffer(buffer) => f
                .debug_struct("Sink")
                .field("kind", &"buffer")
                .field("len", &buffer.len())
                .finish(),
            Inner::Channel(channel) => f
                .debug_struct("Sink")
                .field("kind", &"channel")
                .field("channel", channel)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn buffer_sink_collects_bytes() {
        let mut sink = Sink::buffer();
        sink.write_fully(b"abc").await.unwrap();
        sink.write_fully(b"def").await.unwrap();
        sink.flush();
        assert_eq!(Some(b"abcdef".to_vec()), sink.into_bytes());
    }

    #[tokio::test]
    async fn channel_sink_feeds_reader() {
        let channel = ByteChannel::new();
        let mut sink = Sink::from_channel(channel.clone());
        sink.write_fully(b"pay").await.unwrap();
        sink.write_fully(b"load").await.unwrap();
        sink.close();
        assert_eq!(b"payload".to_vec(), channel.read_all().await.unwrap());
        assert_eq!(None, sink.into_bytes());
    }
}
