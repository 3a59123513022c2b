use crate::document::Document;
use crate::error::DomError;
use crate::types::{NodeData, NodeRef};
use core_types::Namespace;
use std::sync::Arc;

/// Owned, self-contained copy of a subtree.
///
/// Used to compare documents structurally and to seed fixtures; the arena
/// [`Document`] stays the working representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Document {
        doctype: Option<String>,
        children: Vec<Node>,
    },
    Element {
        name: Arc<str>,
        namespace: Namespace,
        attributes: Vec<(Arc<str>, String)>,
        children: Vec<Node>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

impl Node {
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document { children, .. } | Node::Element { children, .. } => children,
            Node::Text { .. } | Node::Comment { .. } => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Document { children, .. } | Node::Element { children, .. } => Some(children),
            _ => None,
        }
    }
}

impl Document {
    /// Copy the subtree rooted at `node` out of the arena.
    pub fn to_node(&self, node: NodeRef) -> Option<Node> {
        let children = || {
            self.children(node)
                .iter()
                .filter_map(|c| self.to_node(*c))
                .collect::<Vec<_>>()
        };
        let out = match self.data(node)? {
            NodeData::Document { doctype } => Node::Document {
                doctype: doctype.clone(),
                children: children(),
            },
            NodeData::Element(element) => Node::Element {
                name: Arc::clone(&element.name),
                namespace: element.namespace,
                attributes: element.attributes.clone(),
                children: children(),
            },
            NodeData::Text(text) => Node::Text { text: text.clone() },
            NodeData::Comment(text) => Node::Comment { text: text.clone() },
        };
        Some(out)
    }

    /// Copy of the whole document.
    pub fn to_tree(&self) -> Node {
        self.to_node(self.root()).unwrap_or(Node::Document {
            doctype: None,
            children: Vec::new(),
        })
    }

    /// Build a document from an owned tree. A non-document root is appended
    /// under a fresh document node.
    pub fn from_node(node: &Node) -> Result<Document, DomError> {
        match node {
            Node::Document { doctype, children } => {
                let mut doc = Document::with_doctype(doctype.clone());
                let root = doc.root();
                for child in children {
                    let created = doc.import(child)?;
                    doc.append_child(root, created)?;
                }
                Ok(doc)
            }
            other => {
                let mut doc = Document::new();
                let root = doc.root();
                let created = doc.import(other)?;
                doc.append_child(root, created)?;
                Ok(doc)
            }
        }
    }

    /// Create a detached copy of `node` inside this document.
    pub fn import(&mut self, node: &Node) -> Result<NodeRef, DomError> {
        let created = match node {
            Node::Document { .. } => {
                return Err(DomError::Hierarchy {
                    parent: self.root(),
                    child: self.root(),
                });
            }
            Node::Element {
                name,
                namespace,
                attributes,
                ..
            } => {
                let element = self.create_element_ns(name, *namespace);
                for (key, value) in attributes {
                    self.set_attribute(element, key, value)?;
                }
                element
            }
            Node::Text { text } => self.create_text(text),
            Node::Comment { text } => self.create_comment(text),
        };
        for child in node.children() {
            let child_ref = self.import(child)?;
            self.append_child(created, child_ref)?;
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_import_preserves_structure() {
        let tree = Node::Document {
            doctype: Some("html".to_string()),
            children: vec![Node::Element {
                name: Arc::from("div"),
                namespace: Namespace::Html,
                attributes: vec![(Arc::from("id"), "a".to_string())],
                children: vec![
                    Node::Text {
                        text: "x".to_string(),
                    },
                    Node::Comment {
                        text: "c".to_string(),
                    },
                ],
            }],
        };
        let doc = Document::from_node(&tree).unwrap();
        assert_eq!(doc.to_tree(), tree);
        assert_eq!(doc.doctype(), Some("html"));
    }
}
