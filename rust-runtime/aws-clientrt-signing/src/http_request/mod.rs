/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Utilities to sign HTTP requests.
//!
//! ```
//! use aws_clientrt_auth::Credentials;
//! use aws_clientrt_signing::http_request::{sign, SignableRequest, SigningParams, SigningSettings};
//! use std::time::SystemTime;
//!
//! let credentials = Credentials::from_keys("AKIDEXAMPLE", "secret", None);
//! let params = SigningParams::builder()
//!     .credentials(&credentials)
//!     .region("us-east-1")
//!     .name("exampleservice")
//!     .time(SystemTime::UNIX_EPOCH)
//!     .settings(SigningSettings::default())
//!     .build()
//!     .expect("all required fields were set");
//! let request = SignableRequest::new(
//!     "GET",
//!     "https://some-endpoint.us-east-1.amazonaws.com/",
//!     std::iter::empty(),
//!     b"",
//! )
//! .expect("the request is valid");
//! let (instructions, signature) = sign(request, &params).unwrap().into_parts();
//! # let _ = (instructions, signature);
//! ```

mod canonical_request;
mod error;
mod settings;
mod sign;
mod url_escape;

pub use error::SigningError;
pub use settings::{
    HashSpecification, PayloadChecksumKind, SessionTokenMode, SignatureType, SigningAlgorithm,
    SigningSettings, UriEncoding, UriPathNormalizationMode,
};
pub use sign::{sign, Header, SignableRequest, SigningInstructions};

/// Signing parameters for HTTP requests.
pub type SigningParams<'a> = crate::SigningParams<'a, SigningSettings>;
