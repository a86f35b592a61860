/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// HTTP-specific signing settings.
#[non_exhaustive]
pub struct SigningSettings {
    /// The signing algorithm.
    pub algorithm: SigningAlgorithm,

    /// Where (and how) the signature is placed.
    pub signature_type: SignatureType,

    /// How long a presigned request stays valid. Required when signing via
    /// query parameters.
    pub expires_in: Option<Duration>,

    /// Whether to remove dot segments from the URI path before signing.
    pub uri_path_normalization_mode: UriPathNormalizationMode,

    /// Whether to percent-encode the URI path a second time. Most services
    /// expect double encoding; S3-style services do not.
    pub uri_encoding: UriEncoding,

    /// Whether the session token participates in the signature. Excluded
    /// tokens are still attached to the request, just unsigned.
    pub session_token_mode: SessionTokenMode,

    /// Whether to add an `x-amz-content-sha256` header carrying the payload
    /// hash.
    pub payload_checksum_kind: PayloadChecksumKind,

    /// How the payload hash line of the canonical request is produced.
    pub hash_specification: HashSpecification,

    /// Additional headers to leave out of the signature.
    pub excluded_headers: Option<Vec<Cow<'static, str>>>,

    /// Caller-supplied predicate consulted (on top of the internal denylist)
    /// for every header.
    pub should_sign_header: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl fmt::Debug for SigningSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSettings")
            .field("algorithm", &self.algorithm)
            .field("signature_type", &self.signature_type)
            .field("expires_in", &self.expires_in)
            .field(
                "uri_path_normalization_mode",
                &self.uri_path_normalization_mode,
            )
            .field("uri_encoding", &self.uri_encoding)
            .field("session_token_mode", &self.session_token_mode)
            .field("payload_checksum_kind", &self.payload_checksum_kind)
            .field("hash_specification", &self.hash_specification)
            .field("excluded_headers", &self.excluded_headers)
            .field(
                "should_sign_header",
                &self.should_sign_header.as_ref().map(|_| "<predicate>"),
            )
            .finish()
    }
}

impl Default for SigningSettings {
    fn default() -> Self {
        Self {
            algorithm: SigningAlgorithm::SigV4,
            signature_type: SignatureType::Headers,
            expires_in: None,
            uri_path_normalization_mode: UriPathNormalizationMode::Enabled,
            uri_encoding: UriEncoding::Double,
            session_token_mode: SessionTokenMode::Include,
            payload_checksum_kind: PayloadChecksumKind::NoHeader,
            hash_specification: HashSpecification::CalculateFromPayload,
            excluded_headers: None,
            should_sign_header: None,
        }
    }
}

/// The signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SigningAlgorithm {
    /// Symmetric HMAC-SHA256 signing (`AWS4-HMAC-SHA256`).
    SigV4,
    /// Asymmetric ECDSA signing (`AWS4-ECDSA-P256-SHA256`); requires the
    /// asymmetric signer, which this crate does not ship.
    SigV4Asymmetric,
}

/// The kind of signature to produce, which also determines its placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SignatureType {
    /// Sign the request and place the signature in the headers.
    Headers,
    /// Sign the request and place the signature in the query string
    /// (presigning).
    QueryParams,
    /// Header-signed request whose body is rewritten into signed
    /// `aws-chunked` chunks.
    Chunk,
    /// Like [`Chunk`](SignatureType::Chunk), with signed trailing headers.
    ChunkTrailer,
    /// Per-message event stream signature; produced by the event signer,
    /// not by this one.
    Event,
}

/// Whether to percent-encode the URI path one extra time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriEncoding {
    /// Encode the path once.
    Single,
    /// Encode the path twice.
    Double,
}

/// Whether dot segments are removed from the URI path before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriPathNormalizationMode {
    /// Remove dot segments.
    Enabled,
    /// Sign the path as given.
    Disabled,
}

/// Whether the session token participates in the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTokenMode {
    /// The token is signed with the rest of the request.
    Include,
    /// The token is attached to the request without being signed.
    Exclude,
}

/// Whether the payload hash is also surfaced as a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadChecksumKind {
    /// Add `x-amz-content-sha256` with the payload hash.
    XAmzSha256,
    /// The hash only appears inside the canonical request.
    NoHeader,
}

/// The payload hash line of the canonical request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HashSpecification {
    /// Hash the request body.
    CalculateFromPayload,
    /// The well-known `UNSIGNED-PAYLOAD` marker.
    UnsignedPayload,
    /// The hash of an empty body.
    EmptyBody,
    /// Streaming `aws-chunked` body with signed chunks.
    StreamingAws4HmacSha256Payload,
    /// Streaming `aws-chunked` body with signed chunks and trailers.
    StreamingAws4HmacSha256PayloadWithTrailers,
    /// A hash computed ahead of time, lowercase hex.
    Precalculated(String),
}
