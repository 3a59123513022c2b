//! Bidirectional node ↔ id mapping shared by capture and replay.
//!
//! The registry is an arena: a dense `id → slot` table plus a `node → id`
//! back-reference map. Ids are handed out monotonically and never recycled;
//! `forget` only empties the slot. Detecting stale *node handles* is the tree's
//! job (see `dom::NodeRef` generations), so a forgotten id simply reads as
//! "not materialized".

use core_types::NodeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// `NodeId::INVALID` can never be bound.
    InvalidId,
    /// The id already names a different node.
    IdAlreadyBound { id: NodeId },
    /// The node is already known under another id.
    NodeAlreadyBound { existing: NodeId, requested: NodeId },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::InvalidId => f.write_str("the invalid node id cannot be bound"),
            RegistryError::IdAlreadyBound { id } => {
                write!(f, "node id {id} is already bound to another node")
            }
            RegistryError::NodeAlreadyBound { existing, requested } => {
                write!(f, "node is already bound to {existing}, cannot bind it to {requested}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

#[derive(Clone, Debug)]
pub struct Registry<N> {
    /// Indexed by id; slot 0 is the reserved invalid id.
    slots: Vec<Option<N>>,
    ids: HashMap<N, NodeId>,
    next: u32,
}

impl<N> Registry<N>
where
    N: Copy + Eq + Hash + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            slots: vec![None],
            ids: HashMap::new(),
            next: NodeId::FIRST.0,
        }
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The id the next `assign` will hand out.
    pub fn peek_next_id(&self) -> NodeId {
        NodeId(self.next)
    }

    /// Bind `node` to a fresh id, or return the id it already has.
    pub fn assign(&mut self, node: N) -> NodeId {
        if let Some(id) = self.ids.get(&node) {
            return *id;
        }
        let id = NodeId(self.next);
        self.next = self.next.saturating_add(1);
        self.store(id, node);
        id
    }

    pub fn id_of(&self, node: N) -> Option<NodeId> {
        self.ids.get(&node).copied()
    }

    pub fn node_of(&self, id: NodeId) -> Option<N> {
        self.slots.get(id.index()).copied().flatten()
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        self.node_of(id).is_some()
    }

    /// Bind an externally allocated id. Binding the same pair twice is a no-op;
    /// any other overlap is reported instead of overwritten.
    pub fn bind(&mut self, id: NodeId, node: N) -> Result<(), RegistryError> {
        if !id.is_valid() {
            return Err(RegistryError::InvalidId);
        }
        match self.node_of(id) {
            Some(existing) if existing == node => return Ok(()),
            Some(_) => return Err(RegistryError::IdAlreadyBound { id }),
            None => {}
        }
        if let Some(existing) = self.id_of(node) {
            return Err(RegistryError::NodeAlreadyBound {
                existing,
                requested: id,
            });
        }
        self.store(id, node);
        Ok(())
    }

    /// Point `id` at `node`, dropping whatever either of them was bound to.
    /// Returns the node `id` previously named.
    pub fn rebind(&mut self, id: NodeId, node: N) -> Option<N> {
        if !id.is_valid() {
            debug_assert!(false, "rebind of the invalid node id");
            return None;
        }
        let previous = self.forget(id);
        if let Some(old_id) = self.id_of(node) {
            self.forget(old_id);
        }
        self.store(id, node);
        previous
    }

    /// Live bindings in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, N)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|node| (NodeId(index as u32), *node)))
    }

    /// Drop the binding for `id`. The numeric value stays retired.
    pub fn forget(&mut self, id: NodeId) -> Option<N> {
        let node = self.slots.get_mut(id.index())?.take()?;
        if self.ids.get(&node) == Some(&id) {
            self.ids.remove(&node);
        }
        Some(node)
    }

    /// Forget everything; the next session starts again at id 1.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.slots.push(None);
        self.ids.clear();
        self.next = NodeId::FIRST.0;
    }

    fn store(&mut self, id: NodeId, node: N) {
        let index = id.index();
        if self.slots.len() <= index {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(node);
        self.ids.insert(node, id);
        // Ids bound from outside still advance the counter so `assign` never collides.
        if let Some(after) = id.0.checked_add(1) {
            self.next = self.next.max(after);
        }
    }
}

impl<N> Default for Registry<N>
where
    N: Copy + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
