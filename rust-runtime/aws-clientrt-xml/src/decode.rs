/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Pull lexer over a pre-loaded XML document.
//!
//! [`XmlTokenReader`] tokenizes a document into begin/end element pairs,
//! text, and a terminal end-of-document marker. Namespace declarations are
//! resolved and stripped from the attribute map; character references are
//! decoded in text and attribute values; CDATA content is preserved
//! literally. Comments and processing instructions are parsed and ignored.
//!
//! Whitespace-only text between child elements is dropped. It is preserved
//! when it is the only child of an element, so `<a> </a>` round-trips.

use crate::unescape::unescape;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt;

const XML_NS_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// Failure while tokenizing or decoding a document.
///
/// Carries the byte offset of the failure and a short snippet of the
/// surrounding document with a caret pointing at the offending position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDecodeError {
    message: String,
    position: Option<usize>,
    context: Option<String>,
}

impl XmlDecodeError {
    /// Creates an error without position information.
    pub fn custom(message: impl Into<String>) -> Self {
        XmlDecodeError {
            message: message.into(),
            position: None,
            context: None,
        }
    }

    /// Creates an error pointing at `position` within `input`.
    pub fn at(message: impl Into<String>, input: &str, position: usize) -> Self {
        XmlDecodeError {
            message: message.into(),
            position: Some(position),
            context: Some(context_snippet(input, position)),
        }
    }

    /// Byte offset of the failure, when known.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// The failure message without the snippet.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for XmlDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.position, &self.context) {
            (Some(position), Some(context)) => {
                write!(f, "{} at offset {}\n{}", self.message, position, context)
            }
            _ => write!(f, "{}", self.message),
        }
    }
}

impl StdError for XmlDecodeError {}

/// Renders a two-line snippet: the surrounding characters and a caret line.
fn context_snippet(input: &str, position: usize) -> String {
    const WINDOW: usize = 24;
    let position = position.min(input.len());
    let before: String = {
        let mut chars: Vec<char> = input[..position].chars().rev().take(WINDOW).collect();
        chars.reverse();
        chars.into_iter().collect()
    };
    let after: String = input[position..].chars().take(WINDOW).collect();
    let sanitize =
        |s: &str| -> String { s.chars().map(|c| if c.is_control() { ' ' } else { c }).collect() };
    let caret_offset = before.chars().count();
    format!(
        "{}{}\n{}^",
        sanitize(&before),
        sanitize(&after),
        " ".repeat(caret_offset)
    )
}

/// A qualified name: local part, resolved namespace URI, and the prefix as
/// written in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName<'inp> {
    /// Local part of the name.
    pub local: &'inp str,
    /// Resolved namespace URI, when the name is in a namespace.
    pub namespace: Option<Cow<'inp, str>>,
    /// Prefix as written, when one was used.
    pub prefix: Option<&'inp str>,
}

impl<'inp> QName<'inp> {
    /// A name with no namespace, mostly for tests and matching.
    pub fn unqualified(local: &'inp str) -> Self {
        QName {
            local,
            namespace: None,
            prefix: None,
        }
    }

    /// True when local part and namespace match, ignoring the prefix.
    pub fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == namespace
    }
}

/// An attribute with a resolved name and a decoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr<'inp> {
    /// Attribute name. Unprefixed attributes have no namespace.
    pub name: QName<'inp>,
    /// Attribute value with character references decoded.
    pub value: Cow<'inp, str>,
}

/// A namespace declared on an element via `xmlns` or `xmlns:prefix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace<'inp> {
    /// The namespace URI.
    pub uri: Cow<'inp, str>,
    /// The bound prefix; `None` for the default namespace.
    pub prefix: Option<&'inp str>,
}

/// A token produced by [`XmlTokenReader`].
///
/// Depth starts at 1 for the root element. A self-closing tag produces a
/// `BeginElement` immediately followed by its `EndElement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlToken<'inp> {
    /// Start of an element.
    BeginElement {
        /// Nesting depth of the element.
        depth: usize,
        /// Resolved element name.
        name: QName<'inp>,
        /// Attributes, with namespace declarations stripped out.
        attributes: Vec<Attr<'inp>>,
        /// Namespaces declared on this element.
        ns_declarations: Vec<Namespace<'inp>>,
    },
    /// End of an element, at the same depth as its begin token.
    EndElement {
        /// Nesting depth of the element.
        depth: usize,
        /// Resolved element name.
        name: QName<'inp>,
    },
    /// Character data, including decoded references and literal CDATA.
    Text {
        /// Depth of the containing element.
        depth: usize,
        /// The decoded text.
        text: Cow<'inp, str>,
    },
    /// The document is exhausted. Returned for every subsequent pull.
    EndDocument,
}

impl XmlToken<'_> {
    /// Depth of the element this token belongs to (the containing element
    /// for text), or `0` at document level.
    fn containing_depth(&self) -> usize {
        match self {
            XmlToken::BeginElement { depth, .. } => *depth,
            XmlToken::Text { depth, .. } => *depth,
            XmlToken::EndElement { depth, .. } => depth - 1,
            XmlToken::EndDocument => 0,
        }
    }
}

struct OpenElement<'inp> {
    prefix: Option<&'inp str>,
    local: &'inp str,
    name: QName<'inp>,
    has_children: bool,
}

/// Where a subtree reader starts relative to the reader position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtreeStart {
    /// The subtree of the element the reader is currently inside.
    Current,
    /// The subtree of the next child element.
    Child,
}

/// Pull-mode XML lexer.
pub struct XmlTokenReader<'inp> {
    input: &'inp str,
    pos: usize,
    queue: VecDeque<XmlToken<'inp>>,
    stack: Vec<OpenElement<'inp>>,
    ns_scopes: Vec<Vec<(Option<&'inp str>, Cow<'inp, str>)>>,
    seen_root: bool,
    done: bool,
    /// Containing depth of the last token handed out, for `skip_current`
    /// and subtree readers.
    last: Option<XmlToken<'inp>>,
}

impl<'inp> XmlTokenReader<'inp> {
    /// Creates a reader over a complete document.
    pub fn new(input: &'inp str) -> Self {
        XmlTokenReader {
            input,
            pos: 0,
            queue: VecDeque::new(),
            stack: Vec::new(),
            ns_scopes: Vec::new(),
            seen_root: false,
            done: false,
            last: None,
        }
    }

    /// Pulls the next token.
    pub fn next_token(&mut self) -> Result<XmlToken<'inp>, XmlDecodeError> {
        let token = self.pull()?;
        self.last = Some(token.clone());
        Ok(token)
    }

    fn pull(&mut self) -> Result<XmlToken<'inp>, XmlDecodeError> {
        if self.queue.is_empty() {
            self.fill_one()?;
        }
        Ok(self.queue.pop_front().unwrap_or(XmlToken::EndDocument))
    }

    /// Looks ahead `lookahead` tokens (1 = the next token) without consuming.
    pub fn peek(&mut self, lookahead: usize) -> Result<XmlToken<'inp>, XmlDecodeError> {
        if lookahead == 0 {
            return Err(XmlDecodeError::custom("peek lookahead must be at least 1"));
        }
        while self.queue.len() < lookahead && !self.done {
            self.fill_one()?;
        }
        Ok(self
            .queue
            .get(lookahead - 1)
            .cloned()
            .unwrap_or(XmlToken::EndDocument))
    }

    /// Consumes the next token; when it begins an element, consumes through
    /// the matching end token.
    pub fn skip_next(&mut self) -> Result<(), XmlDecodeError> {
        let token = self.next_token()?;
        if let XmlToken::BeginElement { depth, .. } = token {
            self.skip_until_end_at(depth)?;
        }
        Ok(())
    }

    /// When the last-returned token began an element, consumes through the
    /// matching end token. Otherwise does nothing.
    pub fn skip_current(&mut self) -> Result<(), XmlDecodeError> {
        if let Some(XmlToken::BeginElement { depth, .. }) = &self.last {
            let depth = *depth;
            self.skip_until_end_at(depth)?;
        }
        Ok(())
    }

    fn skip_until_end_at(&mut self, depth: usize) -> Result<(), XmlDecodeError> {
        loop {
            match self.next_token()? {
                XmlToken::EndElement { depth: d, .. } if d == depth => return Ok(()),
                XmlToken::EndDocument => {
                    return Err(XmlDecodeError::custom(
                        "document ended while skipping an element",
                    ))
                }
                _ => {}
            }
        }
    }

    /// Returns a reader restricted to a subtree. The terminal end-element
    /// token is yielded, then the subtree reader reports `None`.
    pub fn subtree_reader(
        &mut self,
        start: SubtreeStart,
    ) -> Result<XmlSubtreeReader<'_, 'inp>, XmlDecodeError> {
        let current_depth = match &self.last {
            Some(token) => token.containing_depth(),
            None => 0,
        };
        let terminal_depth = match start {
            SubtreeStart::Current => {
                if current_depth == 0 {
                    return Err(XmlDecodeError::custom(
                        "reader is not positioned inside an element",
                    ));
                }
                current_depth
            }
            SubtreeStart::Child => current_depth + 1,
        };
        Ok(XmlSubtreeReader {
            reader: self,
            terminal_depth,
            done: false,
        })
    }

    fn fill_one(&mut self) -> Result<(), XmlDecodeError> {
        while self.queue.is_empty() && !self.done {
            if self.stack.is_empty() {
                self.skip_whitespace();
                if self.pos == self.input.len() {
                    if !self.seen_root {
                        return Err(XmlDecodeError::at(
                            "document has no root element",
                            self.input,
                            self.pos,
                        ));
                    }
                    self.queue.push_back(XmlToken::EndDocument);
                    self.done = true;
                    return Ok(());
                }
                if !self.remaining().starts_with('<') {
                    return Err(XmlDecodeError::at(
                        "unexpected text outside of the root element",
                        self.input,
                        self.pos,
                    ));
                }
                self.lex_markup()?;
            } else if self.pos == self.input.len() {
                return Err(XmlDecodeError::at(
                    format!(
                        "unexpected end of document inside `{}`",
                        self.stack.last().map(|el| el.local).unwrap_or_default()
                    ),
                    self.input,
                    self.pos,
                ));
            } else if self.remaining().starts_with('<') {
                self.lex_markup()?;
            } else {
                self.lex_text()?;
            }
        }
        Ok(())
    }

    fn remaining(&self) -> &'inp str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        self.pos += self
            .remaining()
            .find(|c: char| !c.is_ascii_whitespace())
            .unwrap_or_else(|| self.remaining().len());
    }

    fn lex_text(&mut self) -> Result<(), XmlDecodeError> {
        let start = self.pos;
        self.pos += self
            .remaining()
            .find('<')
            .unwrap_or_else(|| self.remaining().len());
        let raw = &self.input[start..self.pos];
        let decoded = unescape(raw)
            .map_err(|err| XmlDecodeError::at(err.message(), self.input, start))?;
        let depth = self.stack.len();
        if decoded.trim().is_empty() {
            // only-child whitespace is significant; whitespace between
            // children is not
            let top = self.stack.last().expect("lex_text runs inside an element");
            let only_child = !top.has_children && self.remaining().starts_with("</");
            if !only_child {
                return Ok(());
            }
        } else {
            self.mark_has_children();
        }
        self.queue.push_back(XmlToken::Text {
            depth,
            text: decoded,
        });
        Ok(())
    }

    fn mark_has_children(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            top.has_children = true;
        }
    }

    fn lex_markup(&mut self) -> Result<(), XmlDecodeError> {
        let rest = self.remaining();
        if let Some(after) = rest.strip_prefix("<!--") {
            let end = after.find("-->").ok_or_else(|| {
                XmlDecodeError::at("unterminated comment", self.input, self.pos)
            })?;
            self.pos += 4 + end + 3;
            Ok(())
        } else if let Some(after) = rest.strip_prefix("<![CDATA[") {
            if self.stack.is_empty() {
                return Err(XmlDecodeError::at(
                    "CDATA section outside of the root element",
                    self.input,
                    self.pos,
                ));
            }
            let end = after.find("]]>").ok_or_else(|| {
                XmlDecodeError::at("unterminated CDATA section", self.input, self.pos)
            })?;
            let text = &after[..end];
            self.pos += 9 + end + 3;
            self.mark_has_children();
            self.queue.push_back(XmlToken::Text {
                depth: self.stack.len(),
                text: Cow::Borrowed(text),
            });
            Ok(())
        } else if rest.starts_with("<!") {
            self.skip_declaration()
        } else if rest.starts_with("<?") {
            let end = rest.find("?>").ok_or_else(|| {
                XmlDecodeError::at(
                    "unterminated processing instruction",
                    self.input,
                    self.pos,
                )
            })?;
            self.pos += end + 2;
            Ok(())
        } else if rest.starts_with("</") {
            self.lex_end_tag()
        } else {
            self.lex_start_tag()
        }
    }

    /// Skips `<!DOCTYPE …>` including a bracketed internal subset.
    fn skip_declaration(&mut self) -> Result<(), XmlDecodeError> {
        let start = self.pos;
        let mut bracket_depth = 0usize;
        for (offset, c) in self.remaining().char_indices() {
            match c {
                '[' => bracket_depth += 1,
                ']' => bracket_depth = bracket_depth.saturating_sub(1),
                '>' if bracket_depth == 0 => {
                    self.pos += offset + 1;
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(XmlDecodeError::at(
            "unterminated markup declaration",
            self.input,
            start,
        ))
    }

    fn lex_end_tag(&mut self) -> Result<(), XmlDecodeError> {
        let tag_start = self.pos;
        self.pos += 2;
        let (prefix, local) = self.parse_name()?;
        self.skip_whitespace();
        if !self.remaining().starts_with('>') {
            return Err(XmlDecodeError::at(
                "malformed end tag",
                self.input,
                self.pos,
            ));
        }
        self.pos += 1;
        let entry = self.stack.pop().ok_or_else(|| {
            XmlDecodeError::at("end tag with no open element", self.input, tag_start)
        })?;
        if entry.prefix != prefix || entry.local != local {
            return Err(XmlDecodeError::at(
                format!(
                    "mismatched end tag: expected `</{}>`, found `</{}>`",
                    display_name(entry.prefix, entry.local),
                    display_name(prefix, local)
                ),
                self.input,
                tag_start,
            ));
        }
        let depth = self.stack.len() + 1;
        self.ns_scopes.pop();
        self.queue.push_back(XmlToken::EndElement {
            depth,
            name: entry.name,
        });
        Ok(())
    }

    fn lex_start_tag(&mut self) -> Result<(), XmlDecodeError> {
        let tag_start = self.pos;
        if self.stack.is_empty() && self.seen_root {
            return Err(XmlDecodeError::at(
                "document contains multiple root elements",
                self.input,
                tag_start,
            ));
        }
        self.pos += 1;
        let (prefix, local) = self.parse_name()?;

        let mut raw_attrs: Vec<(Option<&'inp str>, &'inp str, Cow<'inp, str>)> = Vec::new();
        let self_closing = loop {
            self.skip_whitespace();
            let rest = self.remaining();
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }
            if rest.is_empty() {
                return Err(XmlDecodeError::at(
                    "unexpected end of document inside a start tag",
                    self.input,
                    self.pos,
                ));
            }
            let (attr_prefix, attr_local) = self.parse_name()?;
            self.skip_whitespace();
            if !self.remaining().starts_with('=') {
                return Err(XmlDecodeError::at(
                    "expected `=` after attribute name",
                    self.input,
                    self.pos,
                ));
            }
            self.pos += 1;
            self.skip_whitespace();
            let quote = match self.remaining().chars().next() {
                Some(q @ ('"' | '\'')) => q,
                _ => {
                    return Err(XmlDecodeError::at(
                        "attribute value must be quoted",
                        self.input,
                        self.pos,
                    ))
                }
            };
            self.pos += 1;
            let value_start = self.pos;
            let value_len = self.remaining().find(quote).ok_or_else(|| {
                XmlDecodeError::at("unterminated attribute value", self.input, value_start)
            })?;
            let raw_value = &self.input[value_start..value_start + value_len];
            self.pos = value_start + value_len + 1;
            let value = unescape(raw_value)
                .map_err(|err| XmlDecodeError::at(err.message(), self.input, value_start))?;
            raw_attrs.push((attr_prefix, attr_local, value));
        };

        // split off namespace declarations and open a new resolution scope
        let mut ns_declarations: Vec<Namespace<'inp>> = Vec::new();
        let mut scope: Vec<(Option<&'inp str>, Cow<'inp, str>)> = Vec::new();
        let mut attrs_raw: Vec<(Option<&'inp str>, &'inp str, Cow<'inp, str>)> = Vec::new();
        for (attr_prefix, attr_local, value) in raw_attrs {
            match (attr_prefix, attr_local) {
                (None, "xmlns") => {
                    scope.push((None, value.clone()));
                    ns_declarations.push(Namespace {
                        uri: value,
                        prefix: None,
                    });
                }
                (Some("xmlns"), bound_prefix) => {
                    scope.push((Some(bound_prefix), value.clone()));
                    ns_declarations.push(Namespace {
                        uri: value,
                        prefix: Some(bound_prefix),
                    });
                }
                _ => attrs_raw.push((attr_prefix, attr_local, value)),
            }
        }
        self.ns_scopes.push(scope);

        let name = QName {
            local,
            namespace: match prefix {
                Some(p) => Some(self.resolve_prefix(p).ok_or_else(|| {
                    XmlDecodeError::at(
                        format!("unbound namespace prefix `{}`", p),
                        self.input,
                        tag_start,
                    )
                })?),
                None => self.resolve_default_namespace(),
            },
            prefix,
        };
        let mut attributes = Vec::with_capacity(attrs_raw.len());
        for (attr_prefix, attr_local, value) in attrs_raw {
            let namespace = match attr_prefix {
                Some(p) => Some(self.resolve_prefix(p).ok_or_else(|| {
                    XmlDecodeError::at(
                        format!("unbound namespace prefix `{}`", p),
                        self.input,
                        tag_start,
                    )
                })?),
                // unprefixed attributes are in no namespace
                None => None,
            };
            attributes.push(Attr {
                name: QName {
                    local: attr_local,
                    namespace,
                    prefix: attr_prefix,
                },
                value,
            });
        }

        self.mark_has_children();
        self.seen_root = true;
        self.stack.push(OpenElement {
            prefix,
            local,
            name: name.clone(),
            has_children: false,
        });
        let depth = self.stack.len();
        self.queue.push_back(XmlToken::BeginElement {
            depth,
            name: name.clone(),
            attributes,
            ns_declarations,
        });
        if self_closing {
            self.queue.push_back(XmlToken::EndElement { depth, name });
            self.stack.pop();
            self.ns_scopes.pop();
        }
        Ok(())
    }

    fn parse_name(&mut self) -> Result<(Option<&'inp str>, &'inp str), XmlDecodeError> {
        let start = self.pos;
        let len = self
            .remaining()
            .find(|c: char| {
                c.is_ascii_whitespace() || matches!(c, '=' | '>' | '/' | '<' | '"' | '\'' | '&')
            })
            .unwrap_or_else(|| self.remaining().len());
        if len == 0 {
            return Err(XmlDecodeError::at("expected a name", self.input, start));
        }
        let name = &self.input[start..start + len];
        self.pos += len;
        match name.split_once(':') {
            Some((prefix, local)) => {
                if prefix.is_empty() || local.is_empty() || local.contains(':') {
                    return Err(XmlDecodeError::at(
                        format!("malformed qualified name `{}`", name),
                        self.input,
                        start,
                    ));
                }
                Ok((Some(prefix), local))
            }
            None => Ok((None, name)),
        }
    }

    fn resolve_prefix(&self, prefix: &str) -> Option<Cow<'inp, str>> {
        if prefix == "xml" {
            return Some(Cow::Borrowed(XML_NS_URI));
        }
        for scope in self.ns_scopes.iter().rev() {
            for (bound, uri) in scope.iter().rev() {
                if bound.as_deref() == Some(prefix) {
                    return Some(uri.clone());
                }
            }
        }
        None
    }

    fn resolve_default_namespace(&self) -> Option<Cow<'inp, str>> {
        for scope in self.ns_scopes.iter().rev() {
            for (bound, uri) in scope.iter().rev() {
                if bound.is_none() {
                    return Some(uri.clone());
                }
            }
        }
        None
    }
}

impl fmt::Debug for XmlTokenReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlTokenReader")
            .field("pos", &self.pos)
            .field("depth", &self.stack.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}

fn display_name(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

/// A reader restricted to a single subtree of the parent reader.
#[derive(Debug)]
pub struct XmlSubtreeReader<'a, 'inp> {
    reader: &'a mut XmlTokenReader<'inp>,
    terminal_depth: usize,
    done: bool,
}

impl<'inp> XmlSubtreeReader<'_, 'inp> {
    /// Pulls the next token of the subtree; `None` once the subtree ended.
    pub fn next_token(&mut self) -> Result<Option<XmlToken<'inp>>, XmlDecodeError> {
        if self.done {
            return Ok(None);
        }
        match self.reader.peek(1)? {
            XmlToken::EndDocument => {
                self.done = true;
                Ok(None)
            }
            // the end of an enclosing element: the subtree is over, leave
            // the token for the parent reader
            XmlToken::EndElement { depth, .. } if depth < self.terminal_depth => {
                self.done = true;
                Ok(None)
            }
            XmlToken::EndElement { depth, .. } if depth == self.terminal_depth => {
                self.done = true;
                Ok(Some(self.reader.next_token()?))
            }
            _ => Ok(Some(self.reader.next_token()?)),
        }
    }
}
