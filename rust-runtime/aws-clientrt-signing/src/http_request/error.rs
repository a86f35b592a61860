/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::error::Error as StdError;
use std::fmt;

/// Failure to sign an HTTP request.
#[derive(Debug)]
#[non_exhaustive]
pub enum SigningError {
    /// The request URI could not be parsed or has no authority to derive a
    /// `host` header from.
    InvalidUri {
        /// What was wrong with the URI.
        message: String,
    },
    /// The requested signature type is not produced by this signer.
    UnsupportedSignatureType {
        /// The offending signature type, for the error message.
        signature_type: &'static str,
    },
    /// Query signing requires an expiration but none was configured.
    MissingExpiry,
}

impl fmt::Display for SigningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningError::InvalidUri { message } => {
                write!(f, "request URI cannot be signed: {}", message)
            }
            SigningError::UnsupportedSignatureType { signature_type } => write!(
                f,
                "{} signatures are not produced by the HTTP request signer",
                signature_type
            ),
            SigningError::MissingExpiry => {
                write!(f, "signing via query parameters requires an expiration")
            }
        }
    }
}

impl StdError for SigningError {}
