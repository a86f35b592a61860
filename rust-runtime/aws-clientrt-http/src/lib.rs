/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Core HTTP primitives for the client runtime: the [`SdkBody`](body::SdkBody)
//! request/response body, the injected [`HttpEngine`](engine::HttpEngine)
//! capability, and the ordered middleware [`Phase`](phase::Phase).

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod body;
pub mod engine;
pub mod phase;

pub use body::SdkBody;
pub use engine::{HttpEngine, SharedHttpEngine};
pub use phase::Phase;
