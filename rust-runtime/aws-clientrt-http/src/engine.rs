/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The injected HTTP engine capability.
//!
//! The runtime never talks to the network itself: a concrete engine (hyper,
//! a test double, ...) is injected behind [`HttpEngine`] and performs the
//! actual round trip.

use crate::body::SdkBody;
use aws_clientrt_types::error::BoxError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future returned by the engine.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Capability to exchange one HTTP request for a response.
pub trait HttpEngine: Send + Sync {
    /// Dispatches `request` and resolves with the response.
    fn round_trip(
        &self,
        request: http::Request<SdkBody>,
    ) -> BoxFuture<'_, Result<http::Response<SdkBody>, BoxError>>;
}

/// A shared reference to an engine.
pub type SharedHttpEngine = Arc<dyn HttpEngine>;

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResponseEngine;

    impl HttpEngine for FixedResponseEngine {
        fn round_trip(
            &self,
            _request: http::Request<SdkBody>,
        ) -> BoxFuture<'_, Result<http::Response<SdkBody>, BoxError>> {
            Box::pin(async {
                Ok(http::Response::builder()
                    .status(200)
                    .body(SdkBody::from("ok"))
                    .expect("valid response"))
            })
        }
    }

    #[tokio::test]
    async fn engines_are_object_safe() {
        let engine: SharedHttpEngine = Arc::new(FixedResponseEngine);
        let request = http::Request::builder()
            .uri("https://example.com/")
            .body(SdkBody::empty())
            .unwrap();
        let response = engine.round_trip(request).await.unwrap();
        assert_eq!(200, response.status());
    }
}
