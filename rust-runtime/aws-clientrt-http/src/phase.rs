/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Ordered middleware phases.
//!
//! A [`Phase`] holds three buckets of interceptors: `Before`, `Default`,
//! and `After`. Within a bucket, interceptors run in registration order;
//! across buckets, `Before` runs outermost and `After` innermost, wrapped
//! around a terminal [`Handler`]. An interceptor receives the request and a
//! [`Next`] continuation, and may short-circuit by not invoking it.

use aws_clientrt_types::error::BoxError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future returned by handlers and interceptors.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Terminal step of a phase: turns the fully-decorated request into a
/// response (typically by handing it to the HTTP engine).
pub trait Handler<Req, Resp>: Send + Sync {
    /// Handles the request.
    fn call(&self, request: Req) -> BoxFuture<'_, Result<Resp, BoxError>>;
}

/// Creates a [`Handler`] from a function. See [`handler_fn`].
pub struct HandlerFn<F> {
    f: F,
}

/// Returns a handler backed by a function that produces a future.
pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn { f }
}

impl<Req, Resp, F, Fut> Handler<Req, Resp> for HandlerFn<F>
where
    F: Fn(Req) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resp, BoxError>> + Send + 'static,
{
    fn call(&self, request: Req) -> BoxFuture<'_, Result<Resp, BoxError>> {
        Box::pin((self.f)(request))
    }
}

/// A middleware step.
///
/// Implementations decide whether and how to continue: call
/// `next.call(request)` to proceed inward, or produce a response directly to
/// short-circuit the rest of the phase.
pub trait Interceptor<Req, Resp>: Send + Sync {
    /// Intercepts the request on its way to the handler.
    fn intercept<'a>(
        &'a self,
        request: Req,
        next: Next<'a, Req, Resp>,
    ) -> BoxFuture<'a, Result<Resp, BoxError>>;
}

/// The continuation handed to an interceptor: the rest of the chain plus the
/// terminal handler.
pub struct Next<'a, Req, Resp> {
    interceptors: &'a [Arc<dyn Interceptor<Req, Resp>>],
    handler: &'a dyn Handler<Req, Resp>,
}

impl<'a, Req, Resp> Next<'a, Req, Resp> {
    /// Passes the request to the next interceptor (or the handler).
    pub fn call(self, request: Req) -> BoxFuture<'a, Result<Resp, BoxError>> {
        match self.interceptors.split_first() {
            Some((head, rest)) => head.intercept(
                request,
                Next {
                    interceptors: rest,
                    handler: self.handler,
                },
            ),
            None => self.handler.call(request),
        }
    }
}

/// Relative position of an interceptor within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Outermost bucket.
    Before,
    /// The main bucket, in registration order.
    Default,
    /// Innermost bucket, closest to the handler.
    After,
}

/// An ordered collection of interceptors around a terminal handler.
pub struct Phase<Req, Resp> {
    before: Vec<Arc<dyn Interceptor<Req, Resp>>>,
    default: Vec<Arc<dyn Interceptor<Req, Resp>>>,
    after: Vec<Arc<dyn Interceptor<Req, Resp>>>,
}

impl<Req, Resp> Default for Phase<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Resp> Phase<Req, Resp> {
    /// Creates an empty phase.
    pub fn new() -> Self {
        Phase {
            before: Vec::new(),
            default: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Registers an interceptor in the `Default` bucket.
    pub fn register(&mut self, interceptor: impl Interceptor<Req, Resp> + 'static) {
        self.register_ordered(Order::Default, interceptor);
    }

    /// Registers an interceptor in a specific bucket. Insertion order within
    /// a bucket is preserved.
    pub fn register_ordered(
        &mut self,
        order: Order,
        interceptor: impl Interceptor<Req, Resp> + 'static,
    ) {
        let interceptor = Arc::new(interceptor);
        match order {
            Order::Before => self.before.push(interceptor),
            Order::Default => self.default.push(interceptor),
            Order::After => self.after.push(interceptor),
        }
    }

    /// Runs the request through every interceptor
    /// (`Before`, then `Default`, then `After`) around `handler`.
    pub async fn run(
        &self,
        request: Req,
        handler: &dyn Handler<Req, Resp>,
    ) -> Result<Resp, BoxError> {
        tracing::trace!(
            before = self.before.len(),
            default = self.default.len(),
            after = self.after.len(),
            "running phase"
        );
        let chain: Vec<Arc<dyn Interceptor<Req, Resp>>> = self
            .before
            .iter()
            .chain(self.default.iter())
            .chain(self.after.iter())
            .cloned()
            .collect();
        Next {
            interceptors: &chain,
            handler,
        }
        .call(request)
        .await
    }
}

impl<Req, Resp> std::fmt::Debug for Phase<Req, Resp> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Phase")
            .field("before", &self.before.len())
            .field("default", &self.default.len())
            .field("after", &self.after.len())
            .finish()
    }
}

/// Interceptor that rewrites the request before passing it on.
pub struct MapRequest<F> {
    f: F,
}

/// Returns an interceptor that maps the request. A failed mapping
/// short-circuits the phase.
pub fn map_request<F>(f: F) -> MapRequest<F> {
    MapRequest { f }
}

impl<Req, Resp, F> Interceptor<Req, Resp> for MapRequest<F>
where
    F: Fn(Req) -> Result<Req, BoxError> + Send + Sync,
    Resp: Send,
{
    fn intercept<'a>(
        &'a self,
        request: Req,
        next: Next<'a, Req, Resp>,
    ) -> BoxFuture<'a, Result<Resp, BoxError>> {
        match (self.f)(request) {
            Ok(request) => next.call(request),
            Err(err) => Box::pin(std::future::ready(Err(err))),
        }
    }
}

/// Interceptor that rewrites the response on its way out.
pub struct MapResponse<F> {
    f: F,
}

/// Returns an interceptor that maps the response.
pub fn map_response<F>(f: F) -> MapResponse<F> {
    MapResponse { f }
}

impl<Req, Resp, F> Interceptor<Req, Resp> for MapResponse<F>
where
    Req: Send + 'static,
    Resp: 'static,
    F: Fn(Resp) -> Result<Resp, BoxError> + Send + Sync,
{
    fn intercept<'a>(
        &'a self,
        request: Req,
        next: Next<'a, Req, Resp>,
    ) -> BoxFuture<'a, Result<Resp, BoxError>> {
        Box::pin(async move {
            let response = next.call(request).await?;
            (self.f)(response)
        })
    }
}
