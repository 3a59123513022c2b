//! Arena-backed document tree.
//!
//! The same [`Document`] type serves both ends of the mirror pipeline: on the
//! capture side it is the live tree whose mutations are observed, on the replay
//! side it is the target tree rebuilt from diff batches.
//!
//! Nodes are addressed by [`NodeRef`] handles (slot index + generation). A handle
//! whose slot has been released is stale and every query on it reports "absent".

mod document;
#[cfg(any(test, feature = "dom-snapshot"))]
pub mod dom_snapshot;
mod error;
pub mod markup;
mod mutation;
mod node;
mod types;

pub use crate::document::{Descendants, Document};
pub use crate::error::DomError;
pub use crate::markup::{parse_document, parse_fragment};
pub use crate::mutation::MutationRecord;
pub use crate::node::Node;
pub use crate::types::{ElementData, NodeData, NodeRef};
pub use core_types::Namespace;
