/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! A bounded producer/consumer byte stream with backpressure.

use crate::error::IoError;
use crate::ring_buffer::RingBuffer;
use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// Default internal capacity of a [`ByteChannel`].
pub const DEFAULT_CAPACITY: usize = 4096;

/// Size of the intermediate buffer used by the non-direct copy path.
const COPY_BUFFER_SIZE: usize = 8192;

/// An ordered stream of bytes with a write half and a read half.
///
/// The channel holds at most `capacity` buffered bytes. Writers suspend when
/// the buffer is full until the reader drains space; readers suspend when no
/// bytes are available and the channel is still open. Bytes are delivered in
/// exactly the order they were written.
///
/// With `auto_flush` (the default), written bytes become readable
/// immediately. Otherwise they are staged and only published by
/// [`flush`](ByteChannel::flush) or [`close`](ByteChannel::close).
///
/// Cloning produces another handle to the same channel.
#[derive(Clone)]
pub struct ByteChannel {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    space_available: Notify,
    bytes_available: Notify,
}

struct State {
    buffer: RingBuffer,
    /// Bytes written but not yet published to readers (`auto_flush == false`).
    staged: usize,
    auto_flush: bool,
    closed_for_write: bool,
    cancelled: bool,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
    total_bytes_written: u64,
}

impl State {
    fn available_for_read(&self) -> usize {
        self.buffer.read_remaining() - self.staged
    }

    fn free_space(&self) -> usize {
        self.buffer.capacity() - self.buffer.read_remaining()
    }

    /// Copies published bytes into `dst`, reclaiming buffer space.
    fn take_available(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.available_for_read());
        if n > 0 {
            let unread = self.buffer.unread_slice();
            dst[..n].copy_from_slice(&unread[..n]);
            self.buffer.discard(n);
            if self.buffer.read_remaining() == 0 {
                self.buffer.reset();
            }
        }
        n
    }
}

impl ByteChannel {
    /// Creates a channel with the default capacity and `auto_flush` enabled.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a channel with the given capacity and `auto_flush` enabled.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_auto_flush(capacity, true)
    }

    /// Creates a channel with explicit `auto_flush` behavior.
    pub fn with_auto_flush(capacity: usize, auto_flush: bool) -> Self {
        ByteChannel {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    buffer: RingBuffer::new(capacity),
                    staged: 0,
                    auto_flush,
                    closed_for_write: false,
                    cancelled: false,
                    cause: None,
                    total_bytes_written: 0,
                }),
                space_available: Notify::new(),
                bytes_available: Notify::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap()
    }

    /// Total number of bytes written to this channel. Frozen after close.
    pub fn total_bytes_written(&self) -> u64 {
        self.state().total_bytes_written
    }

    /// Number of bytes currently available for reading.
    pub fn available_for_read(&self) -> usize {
        self.state().available_for_read()
    }

    /// True once [`close`](ByteChannel::close) or
    /// [`cancel`](ByteChannel::cancel) has been called.
    pub fn is_closed_for_write(&self) -> bool {
        self.state().closed_for_write
    }

    /// True when the channel is closed and every buffered byte has been
    /// consumed (or the channel failed).
    pub fn is_closed_for_read(&self) -> bool {
        let state = self.state();
        state.closed_for_write && (state.available_for_read() == 0 || state.cause.is_some())
    }

    /// Appends a single byte, suspending while the channel is full.
    pub async fn write_byte(&self, byte: u8) -> Result<(), IoError> {
        self.write_fully(&[byte]).await
    }

    /// Appends a string as UTF-8, suspending while the channel is full.
    pub async fn write_utf8(&self, src: &str) -> Result<(), IoError> {
        self.write_fully(src.as_bytes()).await
    }

    /// Appends all of `src`, suspending while the channel is full.
    pub async fn write_fully(&self, src: &[u8]) -> Result<(), IoError> {
        let mut remaining = src;
        while !remaining.is_empty() {
            let notified = self.inner.space_available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state();
                if state.closed_for_write {
                    return Err(IoError::closed(state.cause.clone()));
                }
                let free = state.free_space();
                if free > 0 {
                    let n = free.min(remaining.len());
                    if state.buffer.write_remaining() < n {
                        state.buffer.compact();
                    }
                    state
                        .buffer
                        .write_fully(&remaining[..n])
                        .expect("space was checked");
                    state.total_bytes_written += n as u64;
                    if state.auto_flush {
                        self.inner.bytes_available.notify_waiters();
                    } else {
                        state.staged += n;
                    }
                    remaining = &remaining[n..];
                    continue;
                }
            }
            notified.await;
        }
        Ok(())
    }

    /// Publishes staged writes to readers.
    pub fn flush(&self) {
        let mut state = self.state();
        if state.staged > 0 {
            state.staged = 0;
            self.inner.bytes_available.notify_waiters();
        }
    }

    /// Closes the write half. Buffered bytes stay readable. Returns `true`
    /// if this call performed the close.
    pub fn close(&self) -> bool {
        self.close_with_cause(None)
    }

    /// Closes the write half with a failure `cause` that is surfaced to any
    /// pending and future readers.
    pub fn close_with_cause(
        &self,
        cause: Option<Arc<dyn StdError + Send + Sync>>,
    ) -> bool {
        let mut state = self.state();
        if state.closed_for_write {
            return false;
        }
        state.closed_for_write = true;
        state.staged = 0;
        state.cause = cause;
        self.inner.bytes_available.notify_waiters();
        self.inner.space_available.notify_waiters();
        true
    }

    /// Closes both halves immediately, discarding unread bytes and surfacing
    /// `cause` to pending callers. Idempotent: later cancellations are inert.
    pub fn cancel(&self, cause: Arc<dyn StdError + Send + Sync>) {
        let mut state = self.state();
        if state.cancelled {
            return;
        }
        state.cancelled = true;
        state.closed_for_write = true;
        if state.cause.is_none() {
            state.cause = Some(cause);
        }
        state.staged = 0;
        state.buffer.reset();
        self.inner.bytes_available.notify_waiters();
        self.inner.space_available.notify_waiters();
    }

    /// Reads a single byte, suspending until one is available.
    pub async fn read_byte(&self) -> Result<u8, IoError> {
        let mut byte = [0u8; 1];
        loop {
            let notified = self.inner.bytes_available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state();
                if let Some(cause) = &state.cause {
                    return Err(IoError::closed(Some(cause.clone())));
                }
                if state.take_available(&mut byte) == 1 {
                    self.inner.space_available.notify_waiters();
                    return Ok(byte[0]);
                }
                if state.closed_for_write {
                    return Err(IoError::end_of_stream(1, 0));
                }
            }
            notified.await;
        }
    }

    /// Reads exactly `dst.len()` bytes, suspending as needed.
    ///
    /// Fails with [`IoError::EndOfStream`] when the channel closes before the
    /// destination is filled; bytes consumed before the failure stay consumed.
    pub async fn read_fully(&self, dst: &mut [u8]) -> Result<(), IoError> {
        let mut filled = 0;
        while filled < dst.len() {
            let notified = self.inner.bytes_available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state();
                if let Some(cause) = &state.cause {
                    return Err(IoError::closed(Some(cause.clone())));
                }
                let n = state.take_available(&mut dst[filled..]);
                if n > 0 {
                    filled += n;
                    self.inner.space_available.notify_waiters();
                    continue;
                }
                if state.closed_for_write {
                    return Err(IoError::end_of_stream(dst.len(), filled));
                }
            }
            notified.await;
        }
        Ok(())
    }

    /// Reads up to `dst.len()` bytes, suspending while the channel is empty
    /// and open. Returns `Ok(None)` once the channel is closed and drained.
    pub async fn read_available(&self, dst: &mut [u8]) -> Result<Option<usize>, IoError> {
        loop {
            let notified = self.inner.bytes_available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state();
                if let Some(cause) = &state.cause {
                    return Err(IoError::closed(Some(cause.clone())));
                }
                let n = state.take_available(dst);
                if n > 0 {
                    self.inner.space_available.notify_waiters();
                    return Ok(Some(n));
                }
                if dst.is_empty() {
                    return Ok(Some(0));
                }
                if state.closed_for_write {
                    return Ok(None);
                }
            }
            notified.await;
        }
    }

    /// Variant of [`read_available`](ByteChannel::read_available) that fills
    /// the writable region of a [`RingBuffer`].
    pub async fn read_available_buf(
        &self,
        dst: &mut RingBuffer,
    ) -> Result<Option<usize>, IoError> {
        let result = self.read_available(dst.writable_slice()).await?;
        if let Some(n) = result {
            dst.commit_written(n).expect("read fit the writable region");
        }
        Ok(result)
    }

    /// Reads every remaining byte until the channel closes.
    pub async fn read_all(&self) -> Result<Vec<u8>, IoError> {
        let mut out = Vec::new();
        let mut chunk = [0u8; COPY_BUFFER_SIZE];
        while let Some(n) = self.read_available(&mut chunk).await? {
            out.extend_from_slice(&chunk[..n]);
        }
        Ok(out)
    }

    /// Pumps bytes from this channel into `dst` until this channel is closed
    /// or `limit` bytes have been copied, returning the number copied.
    ///
    /// When `close_dst` is set and the pump drained this channel to its end
    /// (rather than stopping at `limit`), `dst` is closed afterwards.
    pub async fn copy_to(
        &self,
        dst: &ByteChannel,
        limit: Option<u64>,
        close_dst: bool,
    ) -> Result<u64, IoError> {
        if Arc::ptr_eq(&self.inner, &dst.inner) {
            return Err(IoError::invalid_argument(
                "cannot copy a channel to itself",
            ));
        }
        let mut copied = 0u64;
        let mut chunk = [0u8; COPY_BUFFER_SIZE];
        let mut source_drained = false;
        loop {
            let remaining = match limit {
                Some(limit) => {
                    if copied == limit {
                        break;
                    }
                    (limit - copied).min(usize::MAX as u64) as usize
                }
                None => usize::MAX,
            };
            // Direct ring-to-ring transfer avoids the intermediate buffer
            // whenever both locks are free and both sides have room.
            if let Some(n) = self.transfer_direct(dst, remaining) {
                if n > 0 {
                    copied += n as u64;
                    continue;
                }
            }
            let want = remaining.min(chunk.len());
            match self.read_available(&mut chunk[..want]).await? {
                None => {
                    source_drained = true;
                    break;
                }
                Some(n) => {
                    dst.write_fully(&chunk[..n]).await?;
                    copied += n as u64;
                }
            }
        }
        if close_dst && source_drained {
            dst.close();
        }
        Ok(copied)
    }

    /// Attempts to move bytes straight from this channel's ring into `dst`'s
    /// ring. Returns `None` when a lock is contended or either side cannot
    /// participate, letting the caller fall back to the buffered path.
    fn transfer_direct(&self, dst: &ByteChannel, max: usize) -> Option<usize> {
        // Lock in stable address order so two pumps running in opposite
        // directions cannot deadlock.
        let (first, second) = if Arc::as_ptr(&self.inner) < Arc::as_ptr(&dst.inner) {
            (&self.inner, &dst.inner)
        } else {
            (&dst.inner, &self.inner)
        };
        let first_guard = first.state.try_lock().ok()?;
        let second_guard = second.state.try_lock().ok()?;
        let (mut src_state, mut dst_state) = if Arc::as_ptr(&self.inner) < Arc::as_ptr(&dst.inner)
        {
            (first_guard, second_guard)
        } else {
            (second_guard, first_guard)
        };
        if src_state.cause.is_some() || dst_state.closed_for_write {
            return None;
        }
        let n = src_state
            .available_for_read()
            .min(dst_state.free_space())
            .min(max);
        if n == 0 {
            return Some(0);
        }
        if dst_state.buffer.write_remaining() < n {
            dst_state.buffer.compact();
        }
        dst_state
            .buffer
            .write_fully(&src_state.buffer.unread_slice()[..n])
            .expect("space was checked");
        dst_state.total_bytes_written += n as u64;
        if !dst_state.auto_flush {
            dst_state.staged += n;
        }
        src_state.buffer.discard(n);
        if src_state.buffer.read_remaining() == 0 {
            src_state.buffer.reset();
        }
        self.inner.space_available.notify_waiters();
        if dst_state.auto_flush {
            dst.inner.bytes_available.notify_waiters();
        }
        Some(n)
    }
}

impl Default for ByteChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ByteChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ByteChannel")
            .field("capacity", &state.buffer.capacity())
            .field("available_for_read", &state.available_for_read())
            .field("auto_flush", &state.auto_flush)
            .field("closed_for_write", &state.closed_for_write)
            .field("total_bytes_written", &state.total_bytes_written)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fmt;
    use std::time::Duration;

    #[derive(Debug)]
    struct FakeFailure;
    impl fmt::Display for FakeFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fake failure")
        }
    }
    impl std::error::Error for FakeFailure {}

    #[tokio::test]
    async fn flush_then_close_delivers_bytes() {
        let channel = ByteChannel::with_auto_flush(64, false);
        channel.write_fully(b"Mad dog").await.unwrap();
        assert_eq!(0, channel.available_for_read());
        channel.flush();
        assert_eq!(7, channel.available_for_read());
        channel.close();

        let mut buf = [0u8; 7];
        channel.read_fully(&mut buf).await.unwrap();
        assert_eq!(b"Mad dog", &buf);
        assert!(matches!(
            channel.read_byte().await,
            Err(IoError::EndOfStream { .. })
        ));
        assert!(channel.is_closed_for_read());
    }

    #[tokio::test]
    async fn fifo_ordering_under_backpressure() {
        let channel = ByteChannel::with_capacity(8);
        let writer = {
            let channel = channel.clone();
            tokio::spawn(async move {
                for i in 0..64u8 {
                    channel.write_byte(i).await.unwrap();
                }
                channel.close();
            })
        };
        let mut received = Vec::new();
        let mut chunk = [0u8; 16];
        while let Some(n) = channel.read_available(&mut chunk).await.unwrap() {
            received.extend_from_slice(&chunk[..n]);
        }
        writer.await.unwrap();
        assert_eq!((0..64u8).collect::<Vec<_>>(), received);
        assert_eq!(64, channel.total_bytes_written());
    }

    #[tokio::test]
    async fn writer_suspends_until_reader_drains() {
        let channel = ByteChannel::with_capacity(4);
        channel.write_fully(b"abcd").await.unwrap();

        let pending_write = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.write_fully(b"ef").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending_write.is_finished());

        let mut buf = [0u8; 4];
        channel.read_fully(&mut buf).await.unwrap();
        pending_write.await.unwrap().unwrap();
        assert_eq!(6, channel.total_bytes_written());
    }

    #[tokio::test]
    async fn read_available_returns_none_after_close() {
        let channel = ByteChannel::new();
        channel.write_fully(b"xy").await.unwrap();
        channel.close();

        let mut buf = [0u8; 8];
        assert_eq!(Some(2), channel.read_available(&mut buf).await.unwrap());
        assert_eq!(None, channel.read_available(&mut buf).await.unwrap());
    }

    #[tokio::test]
    async fn close_is_exactly_once() {
        let channel = ByteChannel::new();
        assert!(channel.close());
        assert!(!channel.close());
        assert!(matches!(
            channel.write_byte(1).await,
            Err(IoError::ChannelClosed { .. })
        ));
        assert_eq!(0, channel.total_bytes_written());
    }

    #[tokio::test]
    async fn cancel_discards_unread_and_propagates_cause() {
        let channel = ByteChannel::new();
        channel.write_fully(b"buffered").await.unwrap();
        channel.cancel(Arc::new(FakeFailure));

        assert_eq!(0, channel.available_for_read());
        assert!(channel.is_closed_for_read());
        let err = channel.read_byte().await.unwrap_err();
        assert!(matches!(err, IoError::ChannelClosed { cause: Some(_) }));
        // later cancellations are inert
        channel.cancel(Arc::new(FakeFailure));
    }

    #[tokio::test]
    async fn close_with_cause_fails_pending_reader() {
        let channel = ByteChannel::new();
        let reader = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.read_byte().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        channel.close_with_cause(Some(Arc::new(FakeFailure)));
        assert!(matches!(
            reader.await.unwrap(),
            Err(IoError::ChannelClosed { cause: Some(_) })
        ));
    }

    #[tokio::test]
    async fn copy_to_self_is_invalid() {
        let channel = ByteChannel::new();
        let clone = channel.clone();
        assert!(matches!(
            channel.copy_to(&clone, None, true).await,
            Err(IoError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn copy_to_pumps_and_closes_destination() {
        let src = ByteChannel::with_capacity(16);
        let dst = ByteChannel::with_capacity(16);
        let pump = {
            let (src, dst) = (src.clone(), dst.clone());
            tokio::spawn(async move { src.copy_to(&dst, None, true).await })
        };
        let payload: Vec<u8> = (0..200u16).map(|i| (i % 251) as u8).collect();
        let writer = {
            let (src, payload) = (src.clone(), payload.clone());
            tokio::spawn(async move {
                src.write_fully(&payload).await.unwrap();
                src.close();
            })
        };

        // drain the destination while the pump works through the small rings
        assert_eq!(payload, dst.read_all().await.unwrap());
        writer.await.unwrap();
        let copied = pump.await.unwrap().unwrap();
        assert_eq!(200, copied);
        assert!(dst.is_closed_for_read());
    }

    #[tokio::test]
    async fn copy_to_respects_limit() {
        let src = ByteChannel::new();
        let dst = ByteChannel::new();
        src.write_fully(b"0123456789").await.unwrap();
        src.close();

        let copied = src.copy_to(&dst, Some(4), true).await.unwrap();
        assert_eq!(4, copied);
        // the limit cut the pump short, so dst must stay open
        assert!(!dst.is_closed_for_write());
        let mut buf = [0u8; 4];
        dst.read_fully(&mut buf).await.unwrap();
        assert_eq!(b"0123", &buf);
    }

    #[tokio::test]
    async fn total_written_accounts_for_all_bytes() {
        let channel = ByteChannel::with_capacity(32);
        channel.write_fully(&[1u8; 10]).await.unwrap();
        let mut buf = [0u8; 4];
        channel.read_fully(&mut buf).await.unwrap();
        assert_eq!(
            channel.total_bytes_written(),
            4 + channel.available_for_read() as u64
        );
    }
}
