/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! A thin wrapper over a correct, fast base64 implementation.
//!
//! Blobs cross the wire base64-encoded in every text protocol, so this lives
//! next to [`Blob`](crate::Blob).

use std::error::Error as StdError;
use std::fmt;

/// Failure to decode a base64 payload.
#[derive(Debug)]
#[non_exhaustive]
pub struct DecodeError(base64_simd::Error);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode base64: {}", self.0)
    }
}

impl StdError for DecodeError {}

/// Encodes `input` as standard base64 with padding.
pub fn encode(input: impl AsRef<[u8]>) -> String {
    base64_simd::STANDARD.encode_to_string(input.as_ref())
}

/// Decodes a standard base64 payload.
pub fn decode(input: impl AsRef<str>) -> Result<Vec<u8>, DecodeError> {
    base64_simd::STANDARD
        .decode_to_vec(input.as_ref().as_bytes())
        .map_err(DecodeError)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        assert_eq!("aGVsbG8=", encode(b"hello"));
        assert_eq!(b"hello".to_vec(), decode("aGVsbG8=").unwrap());
        assert!(decode("not base64!").is_err());
    }
}
