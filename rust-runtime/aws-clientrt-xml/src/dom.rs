/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Arena-backed DOM built by draining the pull lexer.
//!
//! Nodes live in a flat arena and refer to each other through [`NodeId`]
//! indices; a node's `parent` is an `Option<NodeId>`, never an owning
//! reference, so the tree has no reference cycles to manage.

use crate::decode::{XmlDecodeError, XmlToken, XmlTokenReader};

/// Index of a node in its [`XmlDocument`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// An element node.
#[derive(Debug)]
pub struct XmlNode {
    /// Local name of the element.
    pub local: String,
    /// Resolved namespace URI, if any.
    pub namespace: Option<String>,
    /// Attribute pairs (local name, decoded value).
    pub attributes: Vec<(String, String)>,
    /// Concatenated character data directly inside this element.
    pub text: String,
    /// Child element ids in document order.
    pub children: Vec<NodeId>,
    /// Parent element id; `None` for the root.
    pub parent: Option<NodeId>,
}

/// A parsed document: a node arena plus the root id.
#[derive(Debug)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    root: NodeId,
}

impl XmlDocument {
    /// Parses a complete document into a tree.
    pub fn parse(input: &str) -> Result<Self, XmlDecodeError> {
        let mut reader = XmlTokenReader::new(input);
        let mut nodes: Vec<XmlNode> = Vec::new();
        let mut open: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;

        loop {
            match reader.next_token()? {
                XmlToken::BeginElement {
                    name, attributes, ..
                } => {
                    let id = NodeId(nodes.len());
                    let parent = open.last().copied();
                    nodes.push(XmlNode {
                        local: name.local.to_string(),
                        namespace: name.namespace.as_deref().map(str::to_string),
                        attributes: attributes
                            .into_iter()
                            .map(|attr| (attr.name.local.to_string(), attr.value.into_owned()))
                            .collect(),
                        text: String::new(),
                        children: Vec::new(),
                        parent,
                    });
                    if let Some(parent) = parent {
                        nodes[parent.0].children.push(id);
                    } else {
                        root = Some(id);
                    }
                    open.push(id);
                }
                XmlToken::EndElement { .. } => {
                    open.pop();
                }
                XmlToken::Text { text, .. } => {
                    if let Some(current) = open.last() {
                        nodes[current.0].text.push_str(&text);
                    }
                }
                XmlToken::EndDocument => break,
            }
        }

        let root = root.ok_or_else(|| XmlDecodeError::custom("document has no root element"))?;
        Ok(XmlDocument { nodes, root })
    }

    /// The root element id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrows a node.
    pub fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id.0]
    }

    /// Iterates over the child elements of `id`.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &XmlNode)> {
        self.nodes[id.0]
            .children
            .iter()
            .map(move |child| (*child, &self.nodes[child.0]))
    }

    /// Finds the first direct child with the given local name.
    pub fn child_named(&self, id: NodeId, local: &str) -> Option<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].local == local)
    }
}

#[cfg(test)]
mod tests {
    use super::XmlDocument;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_tree_with_parent_links() {
        let doc = XmlDocument::parse(
            r#"<order id="17"><item>book</item><item>pen</item><note>rush &amp; ship</note></order>"#,
        )
        .unwrap();

        let root = doc.root();
        assert_eq!("order", doc.node(root).local);
        assert_eq!(None, doc.node(root).parent);
        assert_eq!(
            vec![("id".to_string(), "17".to_string())],
            doc.node(root).attributes
        );
        assert_eq!(3, doc.node(root).children.len());

        let note = doc.child_named(root, "note").unwrap();
        assert_eq!("rush & ship", doc.node(note).text);
        assert_eq!(Some(root), doc.node(note).parent);

        let items: Vec<&str> = doc
            .children(root)
            .filter(|(_, node)| node.local == "item")
            .map(|(_, node)| node.text.as_str())
            .collect();
        assert_eq!(vec!["book", "pen"], items);
    }

    #[test]
    fn malformed_document_surfaces_lexer_error() {
        assert!(XmlDocument::parse("<a><b></a>").is_err());
    }
}
