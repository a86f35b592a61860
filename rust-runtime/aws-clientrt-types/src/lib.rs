/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Core value types shared by the client runtime crates: timestamps, blobs,
//! documents, error metadata, and the typed property bag.

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod base64;
pub mod date_time;
pub mod error;
pub mod property_bag;

mod blob;
mod document;

pub use blob::Blob;
pub use date_time::{DateTime, Format};
pub use document::{Document, Number};
