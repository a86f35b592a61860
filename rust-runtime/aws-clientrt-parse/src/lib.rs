/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Text parsing toolkit for the client runtime.
//!
//! [`combinators`] is a tiny parser-combinator library over `(&str, usize)`
//! pairs; [`datetime`] builds the ISO-8601, RFC-5322, and epoch timestamp
//! parsers on top of it. Parsers report failures through `Result` values
//! rather than unwinding, and `alt` backtracks on both match failures and
//! incomplete input.

pub mod combinators;
pub mod datetime;

pub use combinators::{PResult, ParseError};
pub use datetime::{parse_epoch, parse_iso8601, parse_rfc5322, ParsedDatetime};
