/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Signed `aws-chunked` body encoding.
//!
//! Large streaming bodies are rewritten into frames of
//!
//! ```text
//! HEX(len);chunk-signature=<hex64>\r\n
//! <len bytes>\r\n
//! ```
//!
//! terminated by a zero-length chunk. Each chunk signature chains off the
//! previous one, seeded with the request signature. When trailing headers
//! are declared (`x-amz-trailer`), the trailer section is appended and
//! signed as `x-amz-trailer-signature`.

use crate::http_request::SigningParams;
use crate::sign::{calculate_signature, generate_signing_key, sha256_hex_string};
use crate::{date_time, SigningOutput};
use aws_clientrt_io::{ByteChannel, IoError, Source};
use std::error::Error as StdError;
use std::fmt;

const HMAC_256_PAYLOAD: &str = "AWS4-HMAC-SHA256-PAYLOAD";
const HMAC_256_TRAILER: &str = "AWS4-HMAC-SHA256-TRAILER";

const CRLF: &str = "\r\n";
const CHUNK_SIGNATURE_BEGIN: &str = ";chunk-signature=";
const TRAILER_SIGNATURE_NAME: &str = "x-amz-trailer-signature";

const SIGNATURE_LENGTH: u64 = 64;
const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Chunks are always this size, except for the final short chunk.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Streaming bodies shorter than this are signed in one piece instead.
pub const MIN_STREAMING_BODY_SIZE: u64 = 16 * CHUNK_SIZE as u64;

/// Header value that triggers the chunked rewrite.
pub const AWS_CHUNKED: &str = "aws-chunked";

/// Header names involved in chunked uploads.
pub mod header {
    /// Carries the pre-encoding body length.
    pub const X_AMZ_DECODED_CONTENT_LENGTH: &str = "x-amz-decoded-content-length";
    /// Declares the trailing header names, comma separated.
    pub const X_AMZ_TRAILER: &str = "x-amz-trailer";
    /// The encoding that carries the chunk frames.
    pub const CONTENT_ENCODING: &str = "content-encoding";
}

/// Returns whether a body should be rewritten into signed chunks: a
/// streaming body of at least [`MIN_STREAMING_BODY_SIZE`] with
/// `Content-Encoding: aws-chunked` declared.
pub fn is_eligible(content_length: u64, content_encoding: Option<&str>) -> bool {
    content_length >= MIN_STREAMING_BODY_SIZE
        && content_encoding
            .map(|encoding| {
                encoding
                    .split(',')
                    .any(|token| token.trim().eq_ignore_ascii_case(AWS_CHUNKED))
            })
            .unwrap_or(false)
}

/// Failure while encoding a chunked body.
#[derive(Debug)]
#[non_exhaustive]
pub enum ChunkedEncodingError {
    /// Reading the source or writing the destination failed.
    Io(IoError),
}

impl fmt::Display for ChunkedEncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkedEncodingError::Io(_) => write!(f, "chunked body encoding failed"),
        }
    }
}

impl StdError for ChunkedEncodingError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ChunkedEncodingError::Io(err) => Some(err),
        }
    }
}

impl From<IoError> for ChunkedEncodingError {
    fn from(err: IoError) -> Self {
        ChunkedEncodingError::Io(err)
    }
}

/// Signs chunks and trailers, chaining each signature off the previous one.
#[derive(Debug)]
pub struct ChunkSigner {
    signing_key: Vec<u8>,
    date_time: String,
    scope: String,
    previous_signature: String,
}

impl ChunkSigner {
    /// Creates a signer from the signing parameters of the request and the
    /// request's own signature (the seed of the chain).
    pub fn new(params: &SigningParams<'_>, seed_signature: impl Into<String>) -> Self {
        let signing_key = generate_signing_key(
            params.credentials.secret_access_key(),
            params.time,
            params.region,
            params.name,
        );
        ChunkSigner {
            signing_key: signing_key.as_ref().to_vec(),
            date_time: date_time::format_date_time(params.time),
            scope: format!(
                "{}/{}/{}/aws4_request",
                date_time::format_date(params.time),
                params.region,
                params.name
            ),
            previous_signature: seed_signature.into(),
        }
    }

    /// Signs a single chunk (empty for the terminal chunk) and rolls the
    /// chain forward. Returns 64 lowercase hex characters.
    pub fn sign_chunk(&mut self, chunk: &[u8]) -> String {
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            HMAC_256_PAYLOAD,
            self.date_time,
            self.scope,
            self.previous_signature,
            EMPTY_SHA256,
            sha256_hex_string(chunk),
        );
        let signature = calculate_signature(&self.signing_key, string_to_sign.as_bytes());
        self.previous_signature = signature.clone();
        signature
    }

    /// Signs the trailing headers. Returns 64 lowercase hex characters.
    pub fn sign_trailers(&mut self, trailers: &[(String, String)]) -> String {
        let canonical = canonical_trailers(trailers);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}\n{}",
            HMAC_256_TRAILER,
            self.date_time,
            self.scope,
            self.previous_signature,
            sha256_hex_string(canonical.as_bytes()),
        );
        let signature = calculate_signature(&self.signing_key, string_to_sign.as_bytes());
        self.previous_signature = signature.clone();
        signature
    }
}

/// Trailers canonicalize like headers: lowercased names, trimmed values,
/// sorted, one `name:value` line each.
fn canonical_trailers(trailers: &[(String, String)]) -> String {
    let mut entries: Vec<(String, &str)> = trailers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
        .collect();
    entries.sort();
    let mut out = String::new();
    for (name, value) in entries {
        out.push_str(&name);
        out.push(':');
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// Pumps a body [`Source`] into a destination channel, framing and signing
/// every chunk, the terminal chunk, and the optional trailer section.
#[derive(Debug)]
pub struct AwsChunkedEncoder {
    signer: ChunkSigner,
    trailers: Vec<(String, String)>,
    chunk_size: usize,
}

impl AwsChunkedEncoder {
    /// Creates an encoder with the production chunk size.
    pub fn new(signer: ChunkSigner) -> Self {
        Self {
            signer,
            trailers: Vec::new(),
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Declares a trailing header, appended and signed after the terminal
    /// chunk.
    pub fn with_trailer(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.trailers.push((name.into(), value.into()));
        self
    }

    #[cfg(test)]
    fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Value for the `x-amz-trailer` header: the declared trailer names.
    pub fn trailer_header_value(&self) -> Option<String> {
        if self.trailers.is_empty() {
            return None;
        }
        Some(
            self.trailers
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Length of the encoded body for a payload of `stream_length` bytes,
    /// for `Content-Length` (the decoded length travels separately in
    /// `X-Amz-Decoded-Content-Length`).
    pub fn encoded_length(&self, stream_length: u64) -> u64 {
        let chunk_size = self.chunk_size as u64;
        let full_chunks = stream_length / chunk_size;
        let remainder = stream_length % chunk_size;
        let mut length = full_chunks * signed_chunk_length(chunk_size);
        if remainder > 0 {
            length += signed_chunk_length(remainder);
        }
        // terminal chunk has a header but no payload CRLF
        length += signed_chunk_length(0) - CRLF.len() as u64;
        for (name, value) in &self.trailers {
            length += (name.len() + 1 + value.len() + CRLF.len()) as u64;
        }
        if !self.trailers.is_empty() {
            length += (TRAILER_SIGNATURE_NAME.len() + 1) as u64
                + SIGNATURE_LENGTH
                + CRLF.len() as u64;
        }
        // encoding terminator
        length += CRLF.len() as u64;
        length
    }

    /// Reads the whole `source`, writing framed and signed chunks into
    /// `dst`. Closes `dst` when the body is complete. Returns the number of
    /// payload bytes consumed.
    pub async fn encode(
        mut self,
        source: &mut Source,
        dst: &ByteChannel,
    ) -> Result<SigningOutput<u64>, ChunkedEncodingError> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0usize;
        let mut total: u64 = 0;
        loop {
            match source.read_available(&mut buf[filled..]).await? {
                None => break,
                Some(n) => {
                    filled += n;
                    if filled == self.chunk_size {
                        total += filled as u64;
                        self.write_chunk(dst, &buf[..filled]).await?;
                        filled = 0;
                    }
                }
            }
        }
        if filled > 0 {
            total += filled as u64;
            self.write_chunk(dst, &buf[..filled]).await?;
        }

        // terminal zero-length chunk
        let terminal_signature = self.signer.sign_chunk(b"");
        dst.write_utf8(&format!(
            "0{}{}{}",
            CHUNK_SIGNATURE_BEGIN, terminal_signature, CRLF
        ))
        .await?;

        let mut last_signature = terminal_signature;
        if !self.trailers.is_empty() {
            for (name, value) in &self.trailers {
                dst.write_utf8(&format!("{}:{}{}", name, value, CRLF)).await?;
            }
            let trailer_signature = self.signer.sign_trailers(&self.trailers);
            dst.write_utf8(&format!(
                "{}:{}{}",
                TRAILER_SIGNATURE_NAME, trailer_signature, CRLF
            ))
            .await?;
            last_signature = trailer_signature;
        }
        dst.write_utf8(CRLF).await?;
        dst.close();
        Ok(SigningOutput::new(total, last_signature))
    }

    async fn write_chunk(
        &mut self,
        dst: &ByteChannel,
        chunk: &[u8],
    ) -> Result<(), ChunkedEncodingError> {
        let signature = self.signer.sign_chunk(chunk);
        dst.write_utf8(&format!(
            "{:x}{}{}{}",
            chunk.len(),
            CHUNK_SIGNATURE_BEGIN,
            signature,
            CRLF
        ))
        .await?;
        dst.write_fully(chunk).await?;
        dst.write_utf8(CRLF).await?;
        Ok(())
    }
}

/// Framed length of one signed chunk carrying `len` payload bytes.
fn signed_chunk_length(len: u64) -> u64 {
    let hex_len = {
        let mut digits = 1;
        let mut value = len;
        while value >= 16 {
            value /= 16;
            digits += 1;
        }
        digits
    };
    hex_len
        + CHUNK_SIGNATURE_BEGIN.len() as u64
        + SIGNATURE_LENGTH
        + CRLF.len() as u64
        + len
        + CRLF.len() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_time::test_parsers::parse_date_time;
    use crate::http_request::SigningSettings;
    use aws_clientrt_auth::Credentials;
    use pretty_assertions::assert_eq;

    fn test_credentials() -> Credentials {
        Credentials::from_keys("ANOTREAL", "notrealrnrELgWzOk3IfjzDKtFBhDby", None)
    }

    fn test_params(credentials: &Credentials) -> SigningParams<'_> {
        SigningParams::builder()
            .credentials(credentials)
            .region("us-east-1")
            .name("s3")
            .time(parse_date_time("20150830T123600Z").unwrap())
            .settings(SigningSettings::default())
            .build()
            .unwrap()
    }

    const SEED_SIGNATURE: &str =
        "106e2a8a18243abcf37539882f36619c00e2dfc72633413f02d3b74544bfeb8e";

    #[test]
    fn eligibility() {
        assert!(is_eligible(MIN_STREAMING_BODY_SIZE, Some("aws-chunked")));
        assert!(is_eligible(
            2 * MIN_STREAMING_BODY_SIZE,
            Some("gzip, aws-chunked")
        ));
        assert!(!is_eligible(MIN_STREAMING_BODY_SIZE - 1, Some("aws-chunked")));
        assert!(!is_eligible(MIN_STREAMING_BODY_SIZE, Some("gzip")));
        assert!(!is_eligible(MIN_STREAMING_BODY_SIZE, None));
    }

    #[test]
    fn chunk_signature_chains_from_the_seed() {
        let credentials = test_credentials();
        let params = test_params(&credentials);
        let chunk = vec![0x7au8; CHUNK_SIZE];

        let mut signer = ChunkSigner::new(&params, SEED_SIGNATURE);
        let first = signer.sign_chunk(&chunk);

        // recompute by hand
        let expected_sts = format!(
            "AWS4-HMAC-SHA256-PAYLOAD\n\
             20150830T123600Z\n\
             20150830/us-east-1/s3/aws4_request\n\
             {}\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n\
             {}",
            SEED_SIGNATURE,
            sha256_hex_string(&chunk),
        );
        let key = generate_signing_key(
            "notrealrnrELgWzOk3IfjzDKtFBhDby",
            parse_date_time("20150830T123600Z").unwrap(),
            "us-east-1",
            "s3",
        );
        let expected = calculate_signature(&key, expected_sts.as_bytes());
        assert_eq!(expected, first);
        assert_eq!(64, first.len());
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));

        // the zero-length terminal chunk chains off the first signature
        let second = signer.sign_chunk(b"");
        let terminal_sts = format!(
            "AWS4-HMAC-SHA256-PAYLOAD\n\
             20150830T123600Z\n\
             20150830/us-east-1/s3/aws4_request\n\
             {}\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            first,
        );
        assert_eq!(calculate_signature(&key, terminal_sts.as_bytes()), second);
    }

    #[tokio::test]
    async fn encoded_body_reassembles_to_the_original() {
        let credentials = test_credentials();
        let params = test_params(&credentials);
        let payload: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();

        let encoder =
            AwsChunkedEncoder::new(ChunkSigner::new(&params, SEED_SIGNATURE)).with_chunk_size(1024);
        let predicted_length = encoder.encoded_length(payload.len() as u64);

        let mut source = Source::from_bytes(payload.clone());
        let dst = ByteChannel::with_capacity(64 * 1024);
        let consumed = encoder.encode(&mut source, &dst).await.unwrap();
        assert_eq!(payload.len() as u64, *consumed.output());

        let encoded = dst.read_all().await.unwrap();
        assert_eq!(predicted_length, encoded.len() as u64);

        // walk the frames: payload must reassemble exactly
        let mut reassembled = Vec::new();
        let mut rest = &encoded[..];
        loop {
            let header_end = rest.windows(2).position(|w| w == b"\r\n").unwrap();
            let header = std::str::from_utf8(&rest[..header_end]).unwrap();
            let (len_hex, signature) = header.split_once(";chunk-signature=").unwrap();
            assert_eq!(64, signature.len());
            let len = usize::from_str_radix(len_hex, 16).unwrap();
            rest = &rest[header_end + 2..];
            if len == 0 {
                break;
            }
            reassembled.extend_from_slice(&rest[..len]);
            rest = &rest[len..];
            assert_eq!(b"\r\n", &rest[..2]);
            rest = &rest[2..];
        }
        assert_eq!(payload, reassembled);
        // no trailers declared: the encoding ends right after the terminal chunk
        assert_eq!(b"\r\n", rest);
    }

    #[tokio::test]
    async fn trailer_section_is_signed_and_terminated() {
        let credentials = test_credentials();
        let params = test_params(&credentials);

        let encoder = AwsChunkedEncoder::new(ChunkSigner::new(&params, SEED_SIGNATURE))
            .with_chunk_size(1024)
            .with_trailer("x-amz-checksum-crc32c", "wdBDMA==");
        assert_eq!(
            Some("x-amz-checksum-crc32c".to_string()),
            encoder.trailer_header_value()
        );
        let predicted_length = encoder.encoded_length(100);

        let mut source = Source::from_bytes(vec![1u8; 100]);
        let dst = ByteChannel::with_capacity(64 * 1024);
        encoder.encode(&mut source, &dst).await.unwrap();
        let encoded = dst.read_all().await.unwrap();
        assert_eq!(predicted_length, encoded.len() as u64);

        let text = String::from_utf8(encoded).unwrap();
        assert!(text.contains("x-amz-checksum-crc32c:wdBDMA==\r\n"));
        let trailer_line = text
            .lines()
            .find(|line| line.starts_with("x-amz-trailer-signature:"))
            .unwrap();
        let signature = trailer_line.trim_start_matches("x-amz-trailer-signature:");
        assert_eq!(64, signature.len());
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn canonical_trailers_sort_and_normalize() {
        let trailers = vec![
            ("X-Amz-B".to_string(), " two ".to_string()),
            ("x-amz-a".to_string(), "one".to_string()),
        ];
        assert_eq!("x-amz-a:one\nx-amz-b:two\n", canonical_trailers(&trailers));
    }

    #[test]
    fn streaming_source_can_be_encoded() {
        // channel-backed sources work the same way; exercised via tokio
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        rt.block_on(async {
            let credentials = test_credentials();
            let params = test_params(&credentials);
            let body = ByteChannel::with_capacity(256);
            let producer = {
                let body = body.clone();
                tokio::spawn(async move {
                    body.write_fully(&[9u8; 700]).await.unwrap();
                    body.close();
                })
            };
            let mut source = Source::from_channel(body);
            let dst = ByteChannel::with_capacity(64 * 1024);
            let encoder = AwsChunkedEncoder::new(ChunkSigner::new(&params, SEED_SIGNATURE))
                .with_chunk_size(512);
            let consumed = encoder.encode(&mut source, &dst).await.unwrap();
            producer.await.unwrap();
            assert_eq!(700, *consumed.output());
            let encoded = dst.read_all().await.unwrap();
            // 512-byte chunk + 188-byte chunk + terminal chunk
            assert!(encoded.starts_with(b"200;chunk-signature="));
        });
    }
}
