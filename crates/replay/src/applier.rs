//! Applies one [`DiffBatch`] to a target tree.
//!
//! Removals go first, then moves and additions share a FIFO worklist: an item
//! whose parent or next sibling is not in place yet is requeued behind the
//! others, so records may reference nodes that appear later in the batch.
//! Attribute and text changes run last, against the settled structure.

use crate::config::ReplayConfig;
use crate::error::ApplyError;
use crate::target::TreeMutator;
use core_types::{Namespace, NodeId};
use mirror::{AddedNode, DiffBatch, Registry, SerializedNode};
use std::collections::{HashSet, VecDeque};
use std::ops::AddAssign;

/// Requeues allowed for a worklist of `items` entries: `n * (n + 1) / 2`.
///
/// Enough for any valid ordering, since each pass over the queue places at
/// least one item when the batch is consistent.
pub fn retry_budget(items: usize) -> usize {
    items.saturating_mul(items.saturating_add(1)) / 2
}

/// Highest node id a batch may introduce. New ids follow the registry's next
/// id, with room for the nodes the batch carries and for the configured gap.
pub(crate) fn id_ceiling<N>(registry: &Registry<N>, config: &ReplayConfig, carried: usize) -> u64
where
    N: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    u64::from(registry.peek_next_id().0)
        .saturating_add(u64::from(config.max_id_gap))
        .saturating_add(carried as u64)
}

/// What happened to a batch. Unresolvable records are counted, not errors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub removed: usize,
    pub inserted: usize,
    /// Worklist items given up on: unresolvable, rejected by the tree, or left
    /// over when the requeue budget ran out.
    pub dropped: usize,
    pub requeues: usize,
    /// Removals, attribute and text changes whose target did not resolve.
    pub skipped: usize,
    pub attrs: usize,
    pub texts: usize,
    /// Nodes freed from the target after being removed.
    pub released: usize,
}

impl AddAssign for ApplyReport {
    fn add_assign(&mut self, other: ApplyReport) {
        self.removed += other.removed;
        self.inserted += other.inserted;
        self.dropped += other.dropped;
        self.requeues += other.requeues;
        self.skipped += other.skipped;
        self.attrs += other.attrs;
        self.texts += other.texts;
        self.released += other.released;
    }
}

enum Payload<'b> {
    Existing(NodeId),
    Subtree(&'b SerializedNode),
}

struct Item<'b> {
    parent_id: NodeId,
    next_id: Option<NodeId>,
    payload: Payload<'b>,
}

impl Item<'_> {
    fn id(&self) -> NodeId {
        match self.payload {
            Payload::Existing(id) => id,
            Payload::Subtree(node) => node.id(),
        }
    }
}

enum Step {
    Inserted,
    Blocked,
    Dropped,
}

pub struct Applier<'a, T: TreeMutator> {
    tree: &'a mut T,
    registry: &'a mut Registry<T::Handle>,
    config: &'a ReplayConfig,
}

impl<'a, T: TreeMutator> Applier<'a, T> {
    pub fn new(tree: &'a mut T, registry: &'a mut Registry<T::Handle>, config: &'a ReplayConfig) -> Self {
        Self {
            tree,
            registry,
            config,
        }
    }

    /// Apply `batch`. Identity violations do not stop the batch; they are
    /// reported once everything else has been applied.
    pub fn apply(&mut self, batch: &DiffBatch) -> Result<ApplyReport, ApplyError> {
        let mut report = ApplyReport::default();
        let mut violations = Vec::new();

        let detached = self.apply_removals(batch, &mut report);
        self.apply_insertions(batch, &mut report, &mut violations);
        self.apply_attributes(batch, &mut report);
        self.apply_texts(batch, &mut report);
        if self.config.release_removed {
            self.release_detached(detached, &mut report);
        }

        log::debug!(target: "replay.apply", "applied batch of {} records: {report:?}", batch.len());
        if violations.is_empty() {
            Ok(report)
        } else {
            log::warn!(target: "replay.apply", "{} identity violation(s) in batch", violations.len());
            Err(ApplyError::IdentityViolation { report, violations })
        }
    }

    fn resolve(&self, id: NodeId) -> Option<T::Handle> {
        self.registry
            .node_of(id)
            .filter(|node| self.tree.is_alive(*node))
    }

    fn apply_removals(&mut self, batch: &DiffBatch, report: &mut ApplyReport) -> Vec<T::Handle> {
        let mut detached = Vec::new();
        for removal in &batch.removed {
            let parent = self.resolve(removal.parent_id);
            let child = self.resolve(removal.id);
            let (Some(parent), Some(child)) = (parent, child) else {
                log::trace!(target: "replay.apply", "removal of {} from {} does not resolve", removal.id, removal.parent_id);
                report.skipped += 1;
                continue;
            };
            if self.tree.parent_of(child) != Some(parent) {
                log::trace!(target: "replay.apply", "{} is no longer a child of {}", removal.id, removal.parent_id);
                report.skipped += 1;
                continue;
            }
            match self.tree.remove_child(parent, child) {
                Ok(()) => {
                    report.removed += 1;
                    detached.push(child);
                }
                Err(err) => {
                    log::warn!(target: "replay.apply", "removal of {} failed: {err}", removal.id);
                    report.skipped += 1;
                }
            }
        }
        detached
    }

    fn apply_insertions(&mut self, batch: &DiffBatch, report: &mut ApplyReport, violations: &mut Vec<NodeId>) {
        let moved = batch.moved.iter().map(|m| Item {
            parent_id: m.parent_id,
            next_id: m.next_id,
            payload: Payload::Existing(m.id),
        });
        let added = batch.added.iter().map(|a| Item {
            parent_id: a.parent_id,
            next_id: a.next_id,
            payload: match &a.node {
                AddedNode::Existing(id) => Payload::Existing(*id),
                AddedNode::Subtree(node) => Payload::Subtree(node),
            },
        });
        let mut queue: VecDeque<Item<'_>> = moved.chain(added).collect();
        let mut pending: HashSet<NodeId> = queue.iter().map(Item::id).collect();
        let carried = batch
            .added
            .iter()
            .map(|a| match &a.node {
                AddedNode::Subtree(node) => node.node_count(),
                AddedNode::Existing(_) => 0,
            })
            .sum();
        let ceiling = id_ceiling(&*self.registry, self.config, carried);
        let budget = self
            .config
            .max_requeues
            .unwrap_or_else(|| retry_budget(queue.len()));

        while let Some(item) = queue.pop_front() {
            match self.place(&item, &pending, ceiling, violations) {
                Step::Inserted => {
                    pending.remove(&item.id());
                    report.inserted += 1;
                }
                Step::Dropped => {
                    pending.remove(&item.id());
                    report.dropped += 1;
                }
                Step::Blocked if report.requeues >= budget => {
                    let remaining = queue.len() + 1;
                    log::warn!(
                        target: "replay.apply",
                        "requeue budget of {budget} exhausted, dropping {remaining} unresolved item(s)"
                    );
                    report.dropped += remaining;
                    queue.clear();
                }
                Step::Blocked => {
                    log::trace!(target: "replay.apply", "requeue {} under {}", item.id(), item.parent_id);
                    report.requeues += 1;
                    queue.push_back(item);
                }
            }
        }
    }

    fn place(
        &mut self,
        item: &Item<'_>,
        pending: &HashSet<NodeId>,
        ceiling: u64,
        violations: &mut Vec<NodeId>,
    ) -> Step {
        let Some(parent) = self.resolve(item.parent_id) else {
            return Step::Blocked;
        };
        let before = match item.next_id {
            None => None,
            Some(next) if pending.contains(&next) => return Step::Blocked,
            Some(next) => {
                let sibling = self
                    .resolve(next)
                    .filter(|node| self.tree.parent_of(*node) == Some(parent));
                match sibling {
                    Some(node) => Some(node),
                    None => return Step::Blocked,
                }
            }
        };

        match item.payload {
            Payload::Existing(id) => {
                let Some(node) = self.resolve(id) else {
                    log::warn!(target: "replay.apply", "moved node {id} is unknown");
                    return Step::Dropped;
                };
                if self.contains(node, parent) {
                    // The parent still sits inside the node; a later move frees it.
                    return Step::Blocked;
                }
                match self.tree.insert_before(parent, node, before) {
                    Ok(()) => Step::Inserted,
                    Err(err) => {
                        log::warn!(target: "replay.apply", "cannot move {id} under {}: {err}", item.parent_id);
                        Step::Dropped
                    }
                }
            }
            Payload::Subtree(record) => {
                let clashes = self.bound_ids(record, ceiling);
                if !clashes.is_empty() {
                    log::warn!(target: "replay.apply", "subtree {} reuses bound ids {clashes:?}", record.id());
                    violations.extend(clashes);
                    return Step::Dropped;
                }
                let Some(root) = self.materialize(record) else {
                    return Step::Dropped;
                };
                match self.tree.insert_before(parent, root, before) {
                    Ok(()) => Step::Inserted,
                    Err(err) => {
                        log::warn!(target: "replay.apply", "cannot insert {} under {}: {err}", record.id(), item.parent_id);
                        self.discard(root);
                        Step::Dropped
                    }
                }
            }
        }
    }

    /// `true` when `node` is `ancestor` or lies below it.
    fn contains(&self, ancestor: T::Handle, node: T::Handle) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.tree.parent_of(n);
        }
        false
    }

    /// Ids in `record` that are invalid, out of range, repeated, or already
    /// name a live node.
    fn bound_ids(&self, record: &SerializedNode, ceiling: u64) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        record
            .walk()
            .map(SerializedNode::id)
            .filter(|id| {
                !id.is_valid()
                    || u64::from(id.0) > ceiling
                    || !seen.insert(*id)
                    || self.resolve(*id).is_some()
            })
            .collect()
    }

    /// Build the subtree detached, top-down, binding every id on the way.
    fn materialize(&mut self, record: &SerializedNode) -> Option<T::Handle> {
        let root = self.create(record)?;
        let mut stack = vec![(record, root)];
        while let Some((node, handle)) = stack.pop() {
            for child in node.children() {
                let Some(created) = self.create(child) else {
                    continue;
                };
                if let Err(err) = self.tree.insert_before(handle, created, None) {
                    log::warn!(target: "replay.apply", "cannot attach {} while building: {err}", child.id());
                    self.discard(created);
                    continue;
                }
                stack.push((child, created));
            }
        }
        Some(root)
    }

    fn create(&mut self, record: &SerializedNode) -> Option<T::Handle> {
        let handle = match record {
            SerializedNode::Element {
                tag,
                attributes,
                flags,
                ..
            } => {
                let namespace = if flags.svg {
                    Namespace::Svg
                } else {
                    Namespace::Html
                };
                let element = self.tree.create_element(tag, namespace);
                for (key, value) in attributes {
                    if let Err(err) = self.tree.set_attribute(element, key, value) {
                        log::warn!(target: "replay.apply", "attribute {key} on {}: {err}", record.id());
                    }
                }
                element
            }
            SerializedNode::Text { value, .. } => self.tree.create_text(value),
            SerializedNode::Comment { value, .. } => self.tree.create_comment(value),
            SerializedNode::Document { id, .. } => {
                log::warn!(target: "replay.apply", "document record {id} cannot be inserted");
                return None;
            }
        };
        self.registry.rebind(record.id(), handle);
        Some(handle)
    }

    /// Free a detached subtree and retire the ids bound to it.
    fn discard(&mut self, node: T::Handle) -> usize {
        match self.tree.release(node) {
            Ok(handles) => {
                for handle in &handles {
                    if let Some(id) = self.registry.id_of(*handle) {
                        self.registry.forget(id);
                    }
                }
                handles.len()
            }
            Err(err) => {
                log::warn!(target: "replay.apply", "cannot release {node:?}: {err}");
                0
            }
        }
    }

    fn apply_attributes(&mut self, batch: &DiffBatch, report: &mut ApplyReport) {
        for change in &batch.attrs {
            let element = self
                .resolve(change.id)
                .filter(|node| self.tree.is_element(*node));
            let Some(element) = element else {
                log::trace!(target: "replay.apply", "attribute target {} does not resolve", change.id);
                report.skipped += 1;
                continue;
            };
            let result = match &change.value {
                Some(value) => self.tree.set_attribute(element, &change.key, value),
                None => self.tree.remove_attribute(element, &change.key),
            };
            match result {
                Ok(()) => report.attrs += 1,
                Err(err) => {
                    log::warn!(target: "replay.apply", "attribute {} on {}: {err}", change.key, change.id);
                    report.skipped += 1;
                }
            }
        }
    }

    fn apply_texts(&mut self, batch: &DiffBatch, report: &mut ApplyReport) {
        for change in &batch.texts {
            let result = match self.resolve(change.id) {
                Some(node) if self.tree.is_leaf(node) => self.tree.set_leaf_text(node, &change.value),
                _ => match self.resolve(change.parent_id) {
                    Some(parent) => self.tree.set_text_content(parent, &change.value),
                    None => {
                        log::trace!(target: "replay.apply", "text target {} does not resolve", change.id);
                        report.skipped += 1;
                        continue;
                    }
                },
            };
            match result {
                Ok(()) => report.texts += 1,
                Err(err) => {
                    log::warn!(target: "replay.apply", "text of {}: {err}", change.id);
                    report.skipped += 1;
                }
            }
        }
    }

    fn release_detached(&mut self, detached: Vec<T::Handle>, report: &mut ApplyReport) {
        let root = self.tree.root();
        for node in detached {
            if node == root || !self.tree.is_alive(node) || self.tree.parent_of(node).is_some() {
                continue;
            }
            report.released += self.discard(node);
        }
    }
}
