/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! SigV4 signing for HTTP requests: canonical request construction, the
//! signature chain, header and query placement, and the `aws-chunked`
//! streaming body signer with trailing-header support.

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    rust_2018_idioms,
    unreachable_pub
)]

use aws_clientrt_auth::Credentials;
use std::time::SystemTime;

pub mod chunked;
pub mod http_request;
pub mod sign;

mod date_time;

/// Parameters to use when signing.
#[derive(Debug)]
#[non_exhaustive]
pub struct SigningParams<'a, S> {
    /// The credentials to sign with.
    pub(crate) credentials: &'a Credentials,
    /// Region to sign for.
    pub(crate) region: &'a str,
    /// Service name to sign for.
    pub(crate) name: &'a str,
    /// Timestamp to use in the signature. Injected rather than read from the
    /// system clock so signing is deterministic under test.
    pub(crate) time: SystemTime,
    /// Additional signing settings.
    pub(crate) settings: S,
}

impl<'a, S> SigningParams<'a, S> {
    /// Returns the region that will be used to sign
    pub fn region(&self) -> &str {
        self.region
    }

    /// Returns the signing name that will be used to sign
    pub fn name(&self) -> &str {
        self.name
    }

    /// Returns the signing settings
    pub fn settings(&self) -> &S {
        &self.settings
    }
}

impl<'a, S: Default> SigningParams<'a, S> {
    /// Returns a builder that can create new `SigningParams`.
    pub fn builder() -> signing_params::Builder<'a, S> {
        Default::default()
    }
}

/// Builder and error for creating [`SigningParams`]
pub mod signing_params {
    use super::{Credentials, SigningParams};
    use std::error::Error;
    use std::fmt;
    use std::time::SystemTime;

    /// [`SigningParams`] builder error
    #[derive(Debug)]
    pub struct BuildError {
        reason: &'static str,
    }

    impl BuildError {
        fn new(reason: &'static str) -> Self {
            Self { reason }
        }
    }

    impl fmt::Display for BuildError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.reason)
        }
    }

    impl Error for BuildError {}

    /// Builder that can create new [`SigningParams`]
    #[derive(Debug, Default)]
    pub struct Builder<'a, S> {
        credentials: Option<&'a Credentials>,
        region: Option<&'a str>,
        name: Option<&'a str>,
        time: Option<SystemTime>,
        settings: Option<S>,
    }

    impl<'a, S> Builder<'a, S> {
        /// Sets the credentials (required)
        pub fn credentials(mut self, credentials: &'a Credentials) -> Self {
            self.credentials = Some(credentials);
            self
        }
        /// Sets the region (required)
        pub fn region(mut self, region: &'a str) -> Self {
            self.region = Some(region);
            self
        }
        /// Sets the signing name (required)
        pub fn name(mut self, name: &'a str) -> Self {
            self.name = Some(name);
            self
        }
        /// Sets the time to be used in the signature (required)
        pub fn time(mut self, time: SystemTime) -> Self {
            self.time = Some(time);
            self
        }
        /// Sets additional signing settings (required)
        pub fn settings(mut self, settings: S) -> Self {
            self.settings = Some(settings);
            self
        }
        /// Builds an instance of [`SigningParams`]. Will yield a
        /// [`BuildError`] if a required argument was not given.
        pub fn build(self) -> Result<SigningParams<'a, S>, BuildError> {
            Ok(SigningParams {
                credentials: self
                    .credentials
                    .ok_or_else(|| BuildError::new("credentials are required"))?,
                region: self
                    .region
                    .ok_or_else(|| BuildError::new("region is required"))?,
                name: self
                    .name
                    .ok_or_else(|| BuildError::new("name is required"))?,
                time: self
                    .time
                    .ok_or_else(|| BuildError::new("time is required"))?,
                settings: self
                    .settings
                    .ok_or_else(|| BuildError::new("settings are required"))?,
            })
        }
    }
}

/// Container for the signed output and the signature.
#[derive(Debug)]
pub struct SigningOutput<T> {
    output: T,
    signature: String,
}

impl<T> SigningOutput<T> {
    /// Creates a new [`SigningOutput`]
    pub fn new(output: T, signature: String) -> Self {
        Self { output, signature }
    }

    /// Returns the signed output
    pub fn output(&self) -> &T {
        &self.output
    }

    /// Returns the signature as a lowercase hex string
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Decomposes the `SigningOutput` into a tuple of the signed output and
    /// the signature
    pub fn into_parts(self) -> (T, String) {
        (self.output, self.signature)
    }
}
