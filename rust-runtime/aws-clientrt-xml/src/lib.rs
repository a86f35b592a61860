/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! XML tokenization and writing for the runtime protocols.
//!
//! [`decode`] is a pull lexer over a pre-loaded document: elements,
//! attributes, text, CDATA, character references, and namespaces, with
//! bounded lookahead and subtree readers. [`encode`] is the matching writer.
//! [`dom`] builds an arena-backed tree for callers that want random access.

pub mod decode;
pub mod dom;
pub mod encode;
pub mod escape;
mod unescape;
