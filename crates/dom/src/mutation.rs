//! Low-level change notifications.
//!
//! While a [`Document`](crate::Document) is observed it queues one record per
//! primitive mutation, in the order they happen. A mutation is recorded when
//! the mutated parent (structural changes) or node (attribute and character
//! data changes) is connected to the document at that moment, or sits in a
//! subtree removed from it since the records were last taken. That is the
//! scope a subtree observer on the document root sees, transient observers
//! included.

use crate::types::NodeRef;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRecord {
    ChildAdded {
        parent: NodeRef,
        node: NodeRef,
    },
    ChildRemoved {
        parent: NodeRef,
        node: NodeRef,
    },
    Attribute {
        node: NodeRef,
        name: Arc<str>,
        old_value: Option<String>,
    },
    CharacterData {
        node: NodeRef,
        old_value: String,
    },
}

impl MutationRecord {
    pub fn node(&self) -> NodeRef {
        match self {
            MutationRecord::ChildAdded { node, .. }
            | MutationRecord::ChildRemoved { node, .. }
            | MutationRecord::Attribute { node, .. }
            | MutationRecord::CharacterData { node, .. } => *node,
        }
    }
}
