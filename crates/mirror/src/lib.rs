//! Mirror protocol: node identity and the records exchanged between the
//! capture side and the replay side.
//!
//! Invariants:
//! - Ids are session-scoped; one [`Registry`] per tracked tree.
//! - A serialized subtree only carries ids the target does not know yet; known
//!   nodes are referenced by id (`moved`, `AddedNode::Existing`).
//! - Within one [`DiffBatch`] a node id appears in at most one of the structural
//!   lists (`removed`, `moved`, `added`).
//! - Batches are applied in the order they were produced.

mod batch;
mod record;
mod registry;

pub use crate::batch::{
    AddedNode, Addition, AttributeChange, DiffBatch, Move, Recording, Removal, TextChange,
    diff_from_empty,
};
pub use crate::record::{ElementFlags, SerializedNode, Walk};
pub use crate::registry::{Registry, RegistryError};
pub use core_types::NodeId;
