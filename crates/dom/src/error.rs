use crate::types::NodeRef;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomError {
    /// The handle does not name a live node (never allocated, or released).
    StaleNode(NodeRef),
    /// The parent is a leaf and cannot hold children.
    LeafParent(NodeRef),
    /// The insertion would make a node its own ancestor, or move the document node.
    Hierarchy { parent: NodeRef, child: NodeRef },
    /// `child` is not a child of `parent`.
    NotAChild { parent: NodeRef, child: NodeRef },
    /// The operation does not apply to this kind of node.
    WrongNodeKind(NodeRef),
    /// Only detached, non-root subtrees can be released.
    StillAttached(NodeRef),
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomError::StaleNode(node) => write!(f, "stale node handle {node}"),
            DomError::LeafParent(node) => write!(f, "node {node} cannot have children"),
            DomError::Hierarchy { parent, child } => {
                write!(f, "inserting {child} into {parent} would break the hierarchy")
            }
            DomError::NotAChild { parent, child } => {
                write!(f, "{child} is not a child of {parent}")
            }
            DomError::WrongNodeKind(node) => write!(f, "wrong node kind for {node}"),
            DomError::StillAttached(node) => write!(f, "node {node} is still attached"),
        }
    }
}

impl std::error::Error for DomError {}
