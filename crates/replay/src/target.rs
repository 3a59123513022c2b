//! The target tree seam: everything the applier needs from the tree it
//! rebuilds.

use core_types::Namespace;
use dom::{Document, DomError, NodeData, NodeRef};
use std::fmt;
use std::hash::Hash;

/// Mutation primitives of a tree that diff batches are applied to.
///
/// Handles must stay comparable after the node is freed so that stale
/// registry entries can be told apart from live ones via [`is_alive`].
///
/// [`is_alive`]: TreeMutator::is_alive
pub trait TreeMutator {
    type Handle: Copy + Eq + Hash + fmt::Debug;
    type Error: std::error::Error;

    /// The document node; never freed.
    fn root(&self) -> Self::Handle;
    fn is_alive(&self, node: Self::Handle) -> bool;
    fn parent_of(&self, node: Self::Handle) -> Option<Self::Handle>;
    fn is_element(&self, node: Self::Handle) -> bool;
    /// Text or comment.
    fn is_leaf(&self, node: Self::Handle) -> bool;

    fn create_element(&mut self, tag: &str, namespace: Namespace) -> Self::Handle;
    fn create_text(&mut self, value: &str) -> Self::Handle;
    fn create_comment(&mut self, value: &str) -> Self::Handle;

    fn set_attribute(&mut self, node: Self::Handle, key: &str, value: &str) -> Result<(), Self::Error>;
    fn remove_attribute(&mut self, node: Self::Handle, key: &str) -> Result<(), Self::Error>;
    /// Insert before `before`, or append when it is `None`. Moves attached nodes.
    fn insert_before(
        &mut self,
        parent: Self::Handle,
        child: Self::Handle,
        before: Option<Self::Handle>,
    ) -> Result<(), Self::Error>;
    fn remove_child(&mut self, parent: Self::Handle, child: Self::Handle) -> Result<(), Self::Error>;
    fn set_text_content(&mut self, node: Self::Handle, value: &str) -> Result<(), Self::Error>;
    fn set_leaf_text(&mut self, node: Self::Handle, value: &str) -> Result<(), Self::Error>;

    /// Free a detached subtree and return every handle that went stale.
    fn release(&mut self, node: Self::Handle) -> Result<Vec<Self::Handle>, Self::Error>;
    /// Drop everything below the root.
    fn clear(&mut self);
}

impl TreeMutator for Document {
    type Handle = NodeRef;
    type Error = DomError;

    fn root(&self) -> NodeRef {
        Document::root(self)
    }

    fn is_alive(&self, node: NodeRef) -> bool {
        Document::is_alive(self, node)
    }

    fn parent_of(&self, node: NodeRef) -> Option<NodeRef> {
        self.parent(node)
    }

    fn is_element(&self, node: NodeRef) -> bool {
        self.element(node).is_some()
    }

    fn is_leaf(&self, node: NodeRef) -> bool {
        matches!(self.data(node), Some(NodeData::Text(_) | NodeData::Comment(_)))
    }

    fn create_element(&mut self, tag: &str, namespace: Namespace) -> NodeRef {
        self.create_element_ns(tag, namespace)
    }

    fn create_text(&mut self, value: &str) -> NodeRef {
        Document::create_text(self, value)
    }

    fn create_comment(&mut self, value: &str) -> NodeRef {
        Document::create_comment(self, value)
    }

    fn set_attribute(&mut self, node: NodeRef, key: &str, value: &str) -> Result<(), DomError> {
        Document::set_attribute(self, node, key, value)
    }

    fn remove_attribute(&mut self, node: NodeRef, key: &str) -> Result<(), DomError> {
        Document::remove_attribute(self, node, key).map(|_| ())
    }

    fn insert_before(
        &mut self,
        parent: NodeRef,
        child: NodeRef,
        before: Option<NodeRef>,
    ) -> Result<(), DomError> {
        Document::insert_before(self, parent, child, before)
    }

    fn remove_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<(), DomError> {
        Document::remove_child(self, parent, child)
    }

    fn set_text_content(&mut self, node: NodeRef, value: &str) -> Result<(), DomError> {
        Document::set_text_content(self, node, value)
    }

    fn set_leaf_text(&mut self, node: NodeRef, value: &str) -> Result<(), DomError> {
        self.set_text(node, value)
    }

    fn release(&mut self, node: NodeRef) -> Result<Vec<NodeRef>, DomError> {
        Document::release(self, node)
    }

    fn clear(&mut self) {
        Document::clear(self)
    }
}
