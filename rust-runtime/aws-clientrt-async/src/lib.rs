/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Runtime-agnostic async support for the client runtime.
//!
//! Currently this is home to the time source abstraction. Components that
//! need the current time (the signer, the credentials cache) take a
//! [`time::TimeSource`] as a dependency instead of reading the system clock,
//! which keeps them deterministic under test.

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod time;
