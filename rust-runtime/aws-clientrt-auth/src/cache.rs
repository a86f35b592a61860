/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Lazily-caching credentials provider.

use crate::provider::{
    BoxFuture, CredentialsError, CredentialsResult, ProvideCredentials, SharedCredentialsProvider,
};
use crate::Credentials;
use aws_clientrt_async::time::{SharedTimeSource, SystemTimeSource, TimeSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use tracing::{trace_span, Instrument};

const DEFAULT_EXPIRE_AFTER: Duration = Duration::from_secs(15 * 60);
const DEFAULT_REFRESH_BUFFER: Duration = Duration::from_secs(10);

/// Caches the credentials an inner provider resolves until they are about to
/// expire.
///
/// Cached credentials stay valid until
/// `min(credentials.expiration, fill_time + expire_after) - refresh_buffer`.
/// Concurrent callers during a refresh share one in-flight refresh: the
/// refresh lock serializes them and everyone observes the freshly cached
/// value. [`close`](LazyCachingCredentialsProvider::close) evicts the cache;
/// resolution fails afterwards.
pub struct LazyCachingCredentialsProvider {
    source: SharedCredentialsProvider,
    time_source: SharedTimeSource,
    expire_after: Duration,
    refresh_buffer: Duration,
    cache: RwLock<Option<(Credentials, SystemTime)>>,
    refresh_lock: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

impl std::fmt::Debug for LazyCachingCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyCachingCredentialsProvider")
            .field("expire_after", &self.expire_after)
            .field("refresh_buffer", &self.refresh_buffer)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl LazyCachingCredentialsProvider {
    /// Returns a new builder.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Evicts the cached credentials. Subsequent resolution fails with
    /// [`CredentialsError::ProviderClosed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        *self.cache.write().unwrap() = None;
    }

    fn cached(&self, now: SystemTime) -> Option<Credentials> {
        let cache = self.cache.read().unwrap();
        match &*cache {
            Some((credentials, expires_at)) => {
                let stale_at = *expires_at - self.refresh_buffer;
                if now < stale_at {
                    Some(credentials.clone())
                } else {
                    None
                }
            }
            None => None,
        }
    }

    async fn resolve(&self) -> CredentialsResult {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CredentialsError::ProviderClosed);
        }
        let now = self.time_source.now();
        if let Some(credentials) = self.cached(now) {
            return Ok(credentials);
        }

        // one refresh at a time; later callers re-check the cache and pick
        // up the refreshed value without touching the source again
        let _refresh = self.refresh_lock.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(CredentialsError::ProviderClosed);
        }
        let now = self.time_source.now();
        if let Some(credentials) = self.cached(now) {
            return Ok(credentials);
        }

        let span = trace_span!("lazy_refresh_credentials");
        let credentials = self
            .source
            .provide_credentials()
            .instrument(span)
            .await?;
        let expires_at = match credentials.expiration() {
            Some(expiration) => expiration.min(now + self.expire_after),
            None => now + self.expire_after,
        };
        *self.cache.write().unwrap() = Some((credentials.clone(), expires_at));
        Ok(credentials)
    }
}

impl ProvideCredentials for LazyCachingCredentialsProvider {
    fn provide_credentials(&self) -> BoxFuture<'_, CredentialsResult> {
        Box::pin(self.resolve())
    }
}

/// Builder for [`LazyCachingCredentialsProvider`].
#[derive(Default)]
pub struct Builder {
    source: Option<SharedCredentialsProvider>,
    time_source: Option<SharedTimeSource>,
    expire_after: Option<Duration>,
    refresh_buffer: Option<Duration>,
}

impl Builder {
    /// Returns a new, empty builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// The provider to cache credentials from (required).
    pub fn source(mut self, source: impl ProvideCredentials + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// The time source consulted for expiration checks. Defaults to the
    /// system clock.
    pub fn time_source(mut self, time_source: impl TimeSource + 'static) -> Self {
        self.time_source = Some(Arc::new(time_source));
        self
    }

    /// (Optional) How long credentials without an expiration stay cached.
    /// Defaults to 15 minutes, and caps the lifetime of credentials that
    /// expire later than that.
    pub fn expire_after(mut self, expire_after: Duration) -> Self {
        self.expire_after = Some(expire_after);
        self
    }

    /// (Optional) Amount of time before the actual expiration where the
    /// credentials already count as stale. Defaults to 10 seconds.
    pub fn refresh_buffer(mut self, refresh_buffer: Duration) -> Self {
        self.refresh_buffer = Some(refresh_buffer);
        self
    }

    /// Creates the provider.
    ///
    /// # Panics
    ///
    /// Panics when no source provider was given.
    pub fn build(self) -> LazyCachingCredentialsProvider {
        LazyCachingCredentialsProvider {
            source: self.source.expect("a source provider is required"),
            time_source: self
                .time_source
                .unwrap_or_else(|| Arc::new(SystemTimeSource::new())),
            expire_after: self.expire_after.unwrap_or(DEFAULT_EXPIRE_AFTER),
            refresh_buffer: self.refresh_buffer.unwrap_or(DEFAULT_REFRESH_BUFFER),
            cache: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_clientrt_async::time::ManualTimeSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn epoch_secs(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn credentials(expiration_secs: u64) -> Credentials {
        Credentials::new(
            "test",
            "test",
            None,
            Some(epoch_secs(expiration_secs)),
            "test",
        )
    }

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        results: Mutex<Vec<CredentialsResult>>,
    }

    impl ProvideCredentials for CountingProvider {
        fn provide_credentials(&self) -> BoxFuture<'_, CredentialsResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.results.lock().unwrap().remove(0);
            Box::pin(std::future::ready(next))
        }
    }

    fn cached_provider(
        time_source: ManualTimeSource,
        results: Vec<CredentialsResult>,
    ) -> (LazyCachingCredentialsProvider, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = LazyCachingCredentialsProvider::builder()
            .source(CountingProvider {
                calls: calls.clone(),
                results: Mutex::new(results),
            })
            .time_source(time_source)
            .build();
        (provider, calls)
    }

    #[tokio::test]
    async fn source_called_once_until_stale() {
        let time = ManualTimeSource::new(epoch_secs(100));
        let (provider, calls) =
            cached_provider(time.clone(), vec![Ok(credentials(1000)), Ok(credentials(2000))]);

        for _ in 0..10 {
            let creds = provider.provide_credentials().await.unwrap();
            assert_eq!(Some(epoch_secs(1000)), creds.expiration());
        }
        assert_eq!(1, calls.load(Ordering::SeqCst));

        // just before the expire_after window (minus the refresh buffer)
        // lapses the cache still serves
        time.set_time(epoch_secs(100 + 15 * 60 - 11));
        provider.provide_credentials().await.unwrap();
        assert_eq!(1, calls.load(Ordering::SeqCst));

        // once inside the refresh buffer the source is consulted again
        time.set_time(epoch_secs(100 + 15 * 60 - 10));
        let creds = provider.provide_credentials().await.unwrap();
        assert_eq!(Some(epoch_secs(2000)), creds.expiration());
        assert_eq!(2, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn credential_expiration_bounds_the_cache() {
        let time = ManualTimeSource::new(epoch_secs(100));
        let (provider, calls) =
            cached_provider(time.clone(), vec![Ok(credentials(160)), Ok(credentials(2000))]);

        provider.provide_credentials().await.unwrap();
        assert_eq!(1, calls.load(Ordering::SeqCst));

        // expiration (160) minus the 10s refresh buffer arrives before the
        // 15 minute default
        time.set_time(epoch_secs(150));
        provider.provide_credentials().await.unwrap();
        assert_eq!(2, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let time = ManualTimeSource::new(epoch_secs(0));
        let (provider, calls) = cached_provider(time, vec![Ok(credentials(10_000))]);
        let provider = Arc::new(provider);

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let provider = provider.clone();
            tasks.push(tokio::spawn(async move {
                provider.provide_credentials().await.unwrap()
            }));
        }
        for task in tasks {
            assert_eq!(Some(epoch_secs(10_000)), task.await.unwrap().expiration());
        }
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn refresh_failure_propagates() {
        let time = ManualTimeSource::new(epoch_secs(0));
        let (provider, _) = cached_provider(
            time,
            vec![Err(CredentialsError::CredentialsNotLoaded)],
        );
        assert!(provider.provide_credentials().await.is_err());
    }

    #[tokio::test]
    async fn close_evicts_and_poisons() {
        let time = ManualTimeSource::new(epoch_secs(0));
        let (provider, _) = cached_provider(time, vec![Ok(credentials(10_000))]);

        provider.provide_credentials().await.unwrap();
        provider.close();
        assert!(matches!(
            provider.provide_credentials().await,
            Err(CredentialsError::ProviderClosed)
        ));
    }
}
