/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Credentials for request signing, and the machinery to resolve them:
//! the [`ProvideCredentials`](provider::ProvideCredentials) capability, a
//! lazily-caching provider with expiration and a refresh buffer, and a
//! fallback chain that tries providers in order.

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod cache;
pub mod chain;
pub mod provider;

mod credentials_impl;

pub use credentials_impl::Credentials;
