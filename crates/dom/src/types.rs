use core_types::Namespace;
use std::fmt;
use std::sync::Arc;

/// Opaque handle to one node slot of a [`Document`](crate::Document).
///
/// Handles are cheap to copy and compare. The generation makes a handle to a
/// released slot distinguishable from the node that later reuses that slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeRef {
    pub(crate) const DANGLING: NodeRef = NodeRef {
        index: u32::MAX,
        generation: u32::MAX,
    };

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}v{}", self.index, self.generation)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    pub name: Arc<str>,
    pub namespace: Namespace,
    /// Insertion-ordered; names are unique.
    pub attributes: Vec<(Arc<str>, String)>,
}

impl ElementData {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_html(&self, name: &str) -> bool {
        self.namespace == Namespace::Html && self.name.eq_ignore_ascii_case(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document { doctype: Option<String> },
    Element(ElementData),
    Text(String),
    Comment(String),
}

impl NodeData {
    pub fn allows_children(&self) -> bool {
        matches!(self, NodeData::Document { .. } | NodeData::Element(_))
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match self {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Character data of a text or comment leaf.
    pub fn leaf_text(&self) -> Option<&str> {
        match self {
            NodeData::Text(text) | NodeData::Comment(text) => Some(text),
            _ => None,
        }
    }
}
