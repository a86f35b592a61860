/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! XML writer with scoped element guards.
//!
//! ```
//! use aws_clientrt_xml::encode::XmlWriter;
//! let mut out = String::new();
//! let mut writer = XmlWriter::new(&mut out);
//! let mut root = writer.start_element("Hello");
//! root.attribute("attr", "1 < 2");
//! let mut scope = root.finish();
//! scope.text("contents");
//! scope.finish();
//! assert_eq!("<Hello attr=\"1 &lt; 2\">contents</Hello>", out);
//! ```

use crate::escape::escape;

/// Writes a document into a target string.
#[derive(Debug)]
pub struct XmlWriter<'a> {
    doc: &'a mut String,
}

impl<'a> XmlWriter<'a> {
    /// Creates a writer appending to `doc`.
    pub fn new(doc: &'a mut String) -> Self {
        XmlWriter { doc }
    }

    /// Opens the root element.
    pub fn start_element<'b>(&'b mut self, name: &str) -> ElementWriter<'b> {
        ElementWriter::new(self.doc, name.to_string())
    }
}

/// Writes the start tag of an element: attributes and namespaces, then
/// [`finish`](ElementWriter::finish) to move on to the element contents.
#[derive(Debug)]
pub struct ElementWriter<'a> {
    doc: &'a mut String,
    name: String,
}

impl<'a> ElementWriter<'a> {
    fn new(doc: &'a mut String, name: String) -> Self {
        doc.push('<');
        doc.push_str(&name);
        ElementWriter { doc, name }
    }

    /// Writes an attribute.
    pub fn attribute(&mut self, key: &str, value: &str) -> &mut Self {
        self.doc.push(' ');
        self.doc.push_str(key);
        self.doc.push_str("=\"");
        self.doc.push_str(&escape(value));
        self.doc.push('"');
        self
    }

    /// Declares a namespace on this element (`xmlns` or `xmlns:prefix`).
    pub fn namespace(&mut self, uri: &str, prefix: Option<&str>) -> &mut Self {
        match prefix {
            Some(prefix) => {
                self.doc.push_str(" xmlns:");
                self.doc.push_str(prefix);
            }
            None => self.doc.push_str(" xmlns"),
        }
        self.doc.push_str("=\"");
        self.doc.push_str(&escape(uri));
        self.doc.push('"');
        self
    }

    /// Closes the start tag and returns the scope for the element contents.
    pub fn finish(self) -> ElementScope<'a> {
        self.doc.push('>');
        ElementScope {
            doc: self.doc,
            name: self.name,
        }
    }
}

/// Contents of an open element. Dropping the scope without calling
/// [`finish`](ElementScope::finish) leaves the document unterminated, so
/// always finish scopes on the happy path.
#[derive(Debug)]
pub struct ElementScope<'a> {
    doc: &'a mut String,
    name: String,
}

impl<'a> ElementScope<'a> {
    /// Writes escaped character data.
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.doc.push_str(&escape(text));
        self
    }

    /// Opens a child element.
    pub fn start_element<'b>(&'b mut self, name: &str) -> ElementWriter<'b> {
        ElementWriter::new(self.doc, name.to_string())
    }

    /// Writes the end tag.
    pub fn finish(self) {
        self.doc.push_str("</");
        self.doc.push_str(&self.name);
        self.doc.push('>');
    }
}

#[cfg(test)]
mod tests {
    use super::XmlWriter;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_elements_with_namespaces() {
        let mut out = String::new();
        let mut writer = XmlWriter::new(&mut out);
        let mut root = writer.start_element("a");
        root.namespace("u", Some("x"));
        let mut root = root.finish();
        let child = root.start_element("x:b");
        let mut child = child.finish();
        child.text("hi");
        child.finish();
        root.finish();
        assert_eq!(r#"<a xmlns:x="u"><x:b>hi</x:b></a>"#, out);
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let mut out = String::new();
        let mut writer = XmlWriter::new(&mut out);
        let mut el = writer.start_element("v");
        el.attribute("q", "a\"b");
        let mut el = el.finish();
        el.text("1 < 2 & 3");
        el.finish();
        assert_eq!(r#"<v q="a&quot;b">1 &lt; 2 &amp; 3</v>"#, out);
    }
}
