/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Streaming I/O substrate for the client runtime.
//!
//! Three layers, lowest first:
//!
//! * [`RingBuffer`]: a fixed-capacity byte buffer with separate read and
//!   write cursors. Single-threaded; the building block for everything else.
//! * [`ByteChannel`]: a bounded producer/consumer byte stream with
//!   backpressure. Operations that cannot make progress suspend until the
//!   other half catches up.
//! * [`Source`] / [`Sink`]: a unified read/write abstraction over in-memory
//!   bytes and lazy channels, used for HTTP bodies.

pub mod byte_channel;
pub mod error;
pub mod ring_buffer;
pub mod sink;
pub mod source;

pub use byte_channel::ByteChannel;
pub use error::IoError;
pub use ring_buffer::RingBuffer;
pub use sink::Sink;
pub use source::Source;
