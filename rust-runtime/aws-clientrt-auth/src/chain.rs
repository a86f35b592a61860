/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Credentials provider that falls back through a series of providers.

use crate::provider::{BoxFuture, CredentialsError, CredentialsResult, ProvideCredentials};
use std::borrow::Cow;
use tracing::Instrument;

/// Credentials provider that checks a series of inner providers.
///
/// Each provider is checked in turn: the first one to return credentials
/// wins and later providers are never consulted. When every provider fails,
/// the error lists each attempted provider together with the failure it
/// produced.
///
/// ## Example
/// ```
/// use aws_clientrt_auth::chain::CredentialsProviderChain;
/// use aws_clientrt_auth::Credentials;
///
/// let provider = CredentialsProviderChain::first_try(
///     "Static",
///     Credentials::from_keys("someaccesskeyid", "somesecret", None),
/// )
/// .or_else("Fallback", Credentials::from_keys("fallbackkey", "fallbacksecret", None));
/// ```
pub struct CredentialsProviderChain {
    providers: Vec<(Cow<'static, str>, Box<dyn ProvideCredentials>)>,
}

impl std::fmt::Debug for CredentialsProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|(name, _)| name.as_ref()).collect();
        f.debug_struct("CredentialsProviderChain")
            .field("providers", &names)
            .finish()
    }
}

impl CredentialsProviderChain {
    /// Creates a chain with its first provider.
    pub fn first_try(
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        CredentialsProviderChain {
            providers: vec![(name.into(), Box::new(provider))],
        }
    }

    /// Appends a fallback provider.
    pub fn or_else(
        mut self,
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        self.providers.push((name.into(), Box::new(provider)));
        self
    }

    async fn credentials(&self) -> CredentialsResult {
        let mut attempted = Vec::with_capacity(self.providers.len());
        for (name, provider) in &self.providers {
            let span = tracing::info_span!("load_credentials", provider = %name);
            match provider.provide_credentials().instrument(span).await {
                Ok(credentials) => {
                    tracing::info!(provider = %name, "loaded credentials");
                    return Ok(credentials);
                }
                Err(err) => {
                    tracing::info!(provider = %name, error = %err, "provider in chain did not provide credentials");
                    attempted.push((name.to_string(), err));
                }
            }
        }
        Err(CredentialsError::ProviderChainExhausted { attempted })
    }
}

impl ProvideCredentials for CredentialsProviderChain {
    fn provide_credentials(&self) -> BoxFuture<'_, CredentialsResult> {
        Box::pin(self.credentials())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Credentials;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fail;

    impl ProvideCredentials for Fail {
        fn provide_credentials(&self) -> BoxFuture<'_, CredentialsResult> {
            Box::pin(std::future::ready(Err(
                CredentialsError::CredentialsNotLoaded,
            )))
        }
    }

    struct Succeed {
        access_key_id: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl ProvideCredentials for Succeed {
        fn provide_credentials(&self) -> BoxFuture<'_, CredentialsResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let creds = Credentials::from_keys(self.access_key_id, "secret", None);
            Box::pin(std::future::ready(Ok(creds)))
        }
    }

    #[tokio::test]
    async fn first_success_wins_and_stops_the_chain() {
        let x_calls = Arc::new(AtomicUsize::new(0));
        let y_calls = Arc::new(AtomicUsize::new(0));
        let chain = CredentialsProviderChain::first_try("Fail", Fail)
            .or_else(
                "X",
                Succeed {
                    access_key_id: "akid-x",
                    calls: x_calls.clone(),
                },
            )
            .or_else(
                "Y",
                Succeed {
                    access_key_id: "akid-y",
                    calls: y_calls.clone(),
                },
            );

        let credentials = chain.provide_credentials().await.unwrap();
        assert_eq!("akid-x", credentials.access_key_id());
        assert_eq!(1, x_calls.load(Ordering::SeqCst));
        assert_eq!(0, y_calls.load(Ordering::SeqCst), "Y must never be called");
    }

    #[tokio::test]
    async fn exhausted_chain_reports_every_attempt() {
        let chain = CredentialsProviderChain::first_try("Environment", Fail)
            .or_else("Profile", Fail);
        let err = chain.provide_credentials().await.unwrap_err();
        match &err {
            CredentialsError::ProviderChainExhausted { attempted } => {
                assert_eq!(2, attempted.len());
                assert_eq!("Environment", attempted[0].0);
                assert_eq!("Profile", attempted[1].0);
            }
            other => panic!("unexpected error {:?}", other),
        }
        let message = err.to_string();
        assert!(message.contains("Environment"));
        assert!(message.contains("Profile"));
    }
}
