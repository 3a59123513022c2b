//! Reduces one flush worth of mutation records to a [`DiffBatch`].
//!
//! Records are classified against the tree as it stands at flush time, so the
//! batch only describes the net effect of the interval:
//! - a node seen for the first time is *added*; its subtree travels with it
//! - a node that already has an id and was re-inserted is *moved*
//! - a removal stands only when the node did not end up back in the tree
//! - a node added and removed within the interval leaves no trace

use crate::config::CaptureConfig;
use crate::normalize::{is_blank, is_ignorable, keeps_attribute};
use crate::snapshot::Snapshotter;
use core_types::NodeId;
use dom::{Document, MutationRecord, NodeData, NodeRef};
use mirror::{
    AddedNode, Addition, AttributeChange, DiffBatch, Move, Registry, Removal, TextChange,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct MutationBatcher<'a> {
    registry: &'a mut Registry<NodeRef>,
    config: &'a CaptureConfig,
}

/// Classification state for one flush.
#[derive(Default)]
struct Pending {
    added: Vec<NodeRef>,
    added_set: HashSet<NodeRef>,
    moved: Vec<NodeRef>,
    moved_set: HashSet<NodeRef>,
    /// `(parent id, node id)` pairs a known node was inserted under.
    move_keys: HashSet<(NodeId, NodeId)>,
    removed: Vec<Removal>,
    removed_seen: HashSet<NodeRef>,
    /// Nodes whose removal stands.
    detached: Vec<NodeRef>,
    attrs: Vec<(NodeRef, Arc<str>)>,
    attr_old: HashMap<(NodeRef, Arc<str>), Option<String>>,
    texts: Vec<NodeRef>,
    text_old: HashMap<NodeRef, String>,
}

impl<'a> MutationBatcher<'a> {
    pub fn new(registry: &'a mut Registry<NodeRef>, config: &'a CaptureConfig) -> Self {
        Self { registry, config }
    }

    pub fn flush(&mut self, doc: &Document, records: &[MutationRecord]) -> DiffBatch {
        let mut pending = Pending::default();
        self.collect_additions(doc, records, &mut pending);
        self.collect_removals(doc, records, &mut pending);
        self.collect_values(doc, records, &mut pending);

        let mut batch = DiffBatch {
            removed: std::mem::take(&mut pending.removed),
            ..DiffBatch::default()
        };
        self.emit_additions(doc, &mut pending, &mut batch);
        self.emit_moves(doc, &pending, &mut batch);
        self.emit_attributes(doc, &pending, &mut batch);
        self.emit_texts(doc, &pending, &mut batch);
        self.retire_detached(doc, &pending);

        log::debug!(
            target: "capture.batcher",
            "flush of {} records: {} removed, {} moved, {} added, {} attrs, {} texts",
            records.len(),
            batch.removed.len(),
            batch.moved.len(),
            batch.added.len(),
            batch.attrs.len(),
            batch.texts.len()
        );
        batch
    }

    /// Walk every inserted node depth-first. Unknown nodes get an id right away;
    /// known nodes become move candidates when they were inserted explicitly, sit
    /// directly under a new node, or were removed from elsewhere in this flush.
    fn collect_additions(&mut self, doc: &Document, records: &[MutationRecord], pending: &mut Pending) {
        let removed_nodes: HashSet<NodeRef> = records
            .iter()
            .filter_map(|record| match record {
                MutationRecord::ChildRemoved { node, .. } => Some(*node),
                _ => None,
            })
            .collect();

        for record in records {
            let MutationRecord::ChildAdded { parent, node } = record else {
                continue;
            };
            log::trace!(target: "capture.batcher", "child added {node} under {parent}");
            let mut stack = vec![(*node, *parent, true)];
            while let Some((node, parent, placed)) = stack.pop() {
                if !doc.is_alive(node) || pending.added_set.contains(&node) {
                    continue;
                }
                let known = self.registry.id_of(node);
                if known.is_none() && is_ignorable(doc, node, self.config) {
                    continue;
                }
                match known {
                    Some(id) => {
                        if placed || removed_nodes.contains(&node) {
                            if pending.moved_set.insert(node) {
                                pending.moved.push(node);
                            }
                            if let Some(parent_id) = self.registry.id_of(parent) {
                                pending.move_keys.insert((parent_id, id));
                            }
                        }
                        for child in doc.children(node).iter().rev() {
                            stack.push((*child, node, false));
                        }
                    }
                    None => {
                        self.registry.assign(node);
                        pending.added_set.insert(node);
                        pending.added.push(node);
                        for child in doc.children(node).iter().rev() {
                            stack.push((*child, node, true));
                        }
                    }
                }
            }
        }
    }

    fn collect_removals(&mut self, doc: &Document, records: &[MutationRecord], pending: &mut Pending) {
        for record in records {
            let MutationRecord::ChildRemoved { parent, node } = record else {
                continue;
            };
            let (parent, node) = (*parent, *node);
            log::trace!(target: "capture.batcher", "child removed {node} from {parent}");

            if pending.added_set.contains(&node) {
                if !doc.is_connected(node) {
                    self.drop_transient(doc, node, pending);
                }
                continue;
            }
            let Some(id) = self.registry.id_of(node) else {
                continue;
            };
            if !pending.removed_seen.insert(node) {
                continue;
            }
            if pending.moved_set.contains(&node) && doc.is_connected(node) {
                let current = doc.parent(node).and_then(|p| self.registry.id_of(p));
                if current.is_some_and(|parent_id| pending.move_keys.contains(&(parent_id, id))) {
                    continue;
                }
            }
            let Some(parent_id) = self.registry.id_of(parent) else {
                continue;
            };
            pending.removed.push(Removal { parent_id, id });
            pending.detached.push(node);
            pending.moved_set.remove(&node);
        }
    }

    /// Forget a node added and detached again within this flush, with every new
    /// node below it.
    fn drop_transient(&mut self, doc: &Document, node: NodeRef, pending: &mut Pending) {
        log::trace!(target: "capture.batcher", "transient node {node}");
        for n in doc.descendants(node) {
            if !pending.added_set.remove(&n) {
                continue;
            }
            if let Some(id) = self.registry.id_of(n) {
                self.registry.forget(id);
            }
        }
    }

    fn collect_values(&mut self, doc: &Document, records: &[MutationRecord], pending: &mut Pending) {
        for record in records {
            match record {
                MutationRecord::Attribute {
                    node,
                    name,
                    old_value,
                } => {
                    if !keeps_attribute(self.config, name) {
                        continue;
                    }
                    let key = (*node, Arc::clone(name));
                    if !pending.attr_old.contains_key(&key) {
                        pending.attrs.push(key.clone());
                        pending.attr_old.insert(key, old_value.clone());
                    }
                }
                MutationRecord::CharacterData { node, old_value } => {
                    if !pending.text_old.contains_key(node) {
                        pending.texts.push(*node);
                        pending.text_old.insert(*node, old_value.clone());
                    }
                    self.promote_text(doc, *node, pending);
                }
                MutationRecord::ChildAdded { .. } | MutationRecord::ChildRemoved { .. } => {}
            }
        }
    }

    /// Blank text is never tracked; once it gains content it is announced as a
    /// fresh addition.
    fn promote_text(&mut self, doc: &Document, node: NodeRef, pending: &mut Pending) {
        if self.registry.id_of(node).is_some() || pending.added_set.contains(&node) {
            return;
        }
        let Some(NodeData::Text(text)) = doc.data(node) else {
            return;
        };
        let parent_tracked = doc
            .parent(node)
            .is_some_and(|p| self.registry.id_of(p).is_some());
        if is_blank(text) || !parent_tracked || !doc.is_connected(node) {
            return;
        }
        log::trace!(target: "capture.batcher", "blank text {node} gained content");
        self.registry.assign(node);
        pending.added_set.insert(node);
        pending.added.push(node);
    }

    fn emit_additions(&mut self, doc: &Document, pending: &mut Pending, batch: &mut DiffBatch) {
        for node in std::mem::take(&mut pending.added) {
            if !pending.added_set.contains(&node) {
                continue;
            }
            let parent = doc.parent(node).filter(|_| doc.is_connected(node));
            if parent.is_some_and(|p| pending.added_set.contains(&p)) {
                // Serialized as part of its new ancestor.
                continue;
            }
            let parent_id = parent.and_then(|p| self.registry.id_of(p));
            let Some(parent_id) = parent_id else {
                log::trace!(target: "capture.batcher", "added node {node} has no tracked parent");
                self.drop_transient(doc, node, pending);
                continue;
            };
            let next_id = self.next_tracked_sibling(doc, node);
            let added_set = &pending.added_set;
            let record = Snapshotter::new(&mut *self.registry, self.config)
                .snapshot_subtree(doc, node, |child| !added_set.contains(&child));
            if let Some(record) = record {
                batch.added.push(Addition {
                    parent_id,
                    next_id,
                    node: AddedNode::Subtree(record),
                });
            }
        }
    }

    fn emit_moves(&self, doc: &Document, pending: &Pending, batch: &mut DiffBatch) {
        for node in &pending.moved {
            if !pending.moved_set.contains(node) || !doc.is_connected(*node) {
                continue;
            }
            let Some(id) = self.registry.id_of(*node) else {
                continue;
            };
            let Some(parent_id) = doc.parent(*node).and_then(|p| self.registry.id_of(p)) else {
                continue;
            };
            batch.moved.push(Move {
                id,
                parent_id,
                next_id: self.next_tracked_sibling(doc, *node),
            });
        }
    }

    fn emit_attributes(&self, doc: &Document, pending: &Pending, batch: &mut DiffBatch) {
        for key in &pending.attrs {
            let (node, name) = key;
            if pending.added_set.contains(node) || !doc.is_connected(*node) {
                continue;
            }
            let Some(id) = self.registry.id_of(*node) else {
                continue;
            };
            let before = pending.attr_old.get(key).cloned().flatten();
            let after = doc.attribute(*node, name).map(str::to_string);
            if before != after {
                batch.attrs.push(AttributeChange {
                    id,
                    key: name.to_string(),
                    value: after,
                });
            }
        }
    }

    fn emit_texts(&self, doc: &Document, pending: &Pending, batch: &mut DiffBatch) {
        for node in &pending.texts {
            if pending.added_set.contains(node) || !doc.is_connected(*node) {
                continue;
            }
            let Some(id) = self.registry.id_of(*node) else {
                continue;
            };
            let Some(parent_id) = doc.parent(*node).and_then(|p| self.registry.id_of(p)) else {
                continue;
            };
            let Some(value) = doc.text(*node) else {
                continue;
            };
            if pending.text_old.get(node).map(String::as_str) != Some(value) {
                batch.texts.push(TextChange {
                    id,
                    parent_id,
                    value: value.to_string(),
                });
            }
        }
    }

    /// Once a removal stands, every binding whose node is no longer connected
    /// is retired; a later re-insertion is a fresh addition. Nodes can leave a
    /// removed subtree while detached, so the sweep covers the whole registry.
    fn retire_detached(&mut self, doc: &Document, pending: &Pending) {
        if pending.detached.is_empty() {
            return;
        }
        let connected: HashSet<NodeRef> = doc.descendants(doc.root()).collect();
        let stale: Vec<NodeId> = self
            .registry
            .iter()
            .filter(|(_, node)| !connected.contains(node))
            .map(|(id, _)| id)
            .collect();
        log::trace!(target: "capture.batcher", "retiring {} detached ids", stale.len());
        for id in stale {
            self.registry.forget(id);
        }
    }

    fn next_tracked_sibling(&self, doc: &Document, node: NodeRef) -> Option<NodeId> {
        doc.following_siblings(node)
            .iter()
            .find_map(|sibling| self.registry.id_of(*sibling))
    }
}
