/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The credentials-provider capability.

use crate::Credentials;
use std::error::Error as StdError;
use std::fmt;
use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future returned by credential providers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of resolving credentials.
pub type CredentialsResult = Result<Credentials, CredentialsError>;

/// Failure to resolve credentials.
#[derive(Debug)]
#[non_exhaustive]
pub enum CredentialsError {
    /// The provider had no credentials to return.
    CredentialsNotLoaded,
    /// The provider was closed and can no longer resolve credentials.
    ProviderClosed,
    /// Every provider in a chain failed. Each attempted provider is listed
    /// with the failure it produced.
    ProviderChainExhausted {
        /// `(provider name, failure)` in attempt order.
        attempted: Vec<(String, CredentialsError)>,
    },
    /// The provider failed in a provider-specific way.
    Unhandled(Box<dyn StdError + Send + Sync + 'static>),
}

impl fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsError::CredentialsNotLoaded => {
                write!(f, "the provider could not provide credentials or required configuration was not set")
            }
            CredentialsError::ProviderClosed => {
                write!(f, "the credentials provider was closed")
            }
            CredentialsError::ProviderChainExhausted { attempted } => {
                write!(f, "no provider in the chain provided credentials.")?;
                for (name, error) in attempted {
                    write!(f, "\n  {}: {}", name, error)?;
                }
                Ok(())
            }
            CredentialsError::Unhandled(err) => write!(f, "{}", err),
        }
    }
}

impl StdError for CredentialsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CredentialsError::Unhandled(err) => Some(err.as_ref() as _),
            _ => None,
        }
    }
}

/// An asynchronous credentials provider.
///
/// `resolve` may complete immediately (static credentials), perform I/O
/// (instance metadata, SSO), or suspend on a shared refresh (the caching
/// provider).
pub trait ProvideCredentials: Send + Sync {
    /// Resolves credentials for a request.
    fn provide_credentials(&self) -> BoxFuture<'_, CredentialsResult>;
}

/// A shared credentials provider.
pub type SharedCredentialsProvider = Arc<dyn ProvideCredentials>;

impl ProvideCredentials for Credentials {
    fn provide_credentials(&self) -> BoxFuture<'_, CredentialsResult> {
        Box::pin(future::ready(Ok(self.clone())))
    }
}

/// Returns a provider backed by a function that produces a future.
///
/// ```
/// use aws_clientrt_auth::provider::provide_credentials_fn;
/// use aws_clientrt_auth::Credentials;
///
/// let provider = provide_credentials_fn(|| async {
///     // An async process to retrieve credentials would go here:
///     Ok(Credentials::from_keys("example", "example", None))
/// });
/// ```
pub fn provide_credentials_fn<F, Fut>(f: F) -> ProvideCredentialsFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = CredentialsResult> + Send + 'static,
{
    ProvideCredentialsFn { f }
}

/// A [`ProvideCredentials`] implemented by a closure. See
/// [`provide_credentials_fn`].
#[derive(Clone)]
pub struct ProvideCredentialsFn<F> {
    f: F,
}

impl<F, Fut> ProvideCredentials for ProvideCredentialsFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = CredentialsResult> + Send + 'static,
{
    fn provide_credentials(&self) -> BoxFuture<'_, CredentialsResult> {
        Box::pin((self.f)())
    }
}
