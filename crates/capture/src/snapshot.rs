//! Serialization of live subtrees into [`SerializedNode`] records.

use crate::config::CaptureConfig;
use crate::normalize::{is_ignorable, is_svg_element, keeps_attribute, serialized_tag};
use dom::{Document, NodeData, NodeRef};
use mirror::{ElementFlags, Registry, SerializedNode};
use std::collections::BTreeMap;

/// Walks a live subtree and serializes it, assigning ids on the way.
pub struct Snapshotter<'a> {
    registry: &'a mut Registry<NodeRef>,
    config: &'a CaptureConfig,
}

/// A container whose children are still being serialized.
struct Frame {
    record: SerializedNode,
    /// Remaining children, last child first.
    pending: Vec<NodeRef>,
}

impl<'a> Snapshotter<'a> {
    pub fn new(registry: &'a mut Registry<NodeRef>, config: &'a CaptureConfig) -> Self {
        Self { registry, config }
    }

    /// Serialize the subtree rooted at `root`. A handle that does not resolve
    /// yields an empty document record carrying the invalid id.
    pub fn snapshot(&mut self, doc: &Document, root: NodeRef) -> SerializedNode {
        self.snapshot_subtree(doc, root, |_| false)
            .unwrap_or_else(|| {
                log::debug!(target: "capture.snapshot", "snapshot of stale node {root}");
                SerializedNode::empty_document()
            })
    }

    /// Serialize `root` and its descendants, leaving out every child for which
    /// `skip` returns `true` (together with its subtree).
    pub fn snapshot_subtree<F>(
        &mut self,
        doc: &Document,
        root: NodeRef,
        skip: F,
    ) -> Option<SerializedNode>
    where
        F: Fn(NodeRef) -> bool,
    {
        let mut stack = match self.open(doc, root, false)? {
            Opened::Leaf(record) => return Some(record),
            Opened::Container(frame) => vec![frame],
        };
        loop {
            let top = stack.last_mut()?;
            let Some(child) = top.pending.pop() else {
                let done = stack.pop()?;
                match stack.last_mut() {
                    Some(parent) => push_child(&mut parent.record, done.record),
                    None => return Some(done.record),
                }
                continue;
            };
            if skip(child) {
                continue;
            }
            match self.open(doc, child, true) {
                Some(Opened::Leaf(record)) => {
                    if let Some(parent) = stack.last_mut() {
                        push_child(&mut parent.record, record);
                    }
                }
                Some(Opened::Container(frame)) => stack.push(frame),
                None => {}
            }
        }
    }

    fn open(
        &mut self,
        doc: &Document,
        node: NodeRef,
        may_drop: bool,
    ) -> Option<Opened> {
        if may_drop && is_ignorable(doc, node, self.config) {
            return None;
        }
        let data = doc.data(node)?;
        let id = self.registry.assign(node);
        log::trace!(target: "capture.snapshot", "serialize {node} as {id}");
        let pending = || doc.children(node).iter().rev().copied().collect::<Vec<_>>();
        let opened = match data {
            NodeData::Document { .. } => Opened::Container(Frame {
                record: SerializedNode::Document {
                    id,
                    children: Vec::new(),
                },
                pending: pending(),
            }),
            NodeData::Element(element) => {
                let svg = is_svg_element(element);
                let (tag, inert) = serialized_tag(element, self.config);
                let attributes: BTreeMap<String, String> = element
                    .attributes
                    .iter()
                    .filter(|(key, _)| keeps_attribute(self.config, key))
                    .map(|(key, value)| (key.to_string(), value.clone()))
                    .collect();
                Opened::Container(Frame {
                    record: SerializedNode::Element {
                        id,
                        tag,
                        attributes,
                        children: Vec::new(),
                        flags: ElementFlags { svg, inert },
                    },
                    pending: pending(),
                })
            }
            NodeData::Text(text) => Opened::Leaf(SerializedNode::Text {
                id,
                value: text.clone(),
            }),
            NodeData::Comment(text) => Opened::Leaf(SerializedNode::Comment {
                id,
                value: text.clone(),
            }),
        };
        Some(opened)
    }
}

enum Opened {
    Leaf(SerializedNode),
    Container(Frame),
}

fn push_child(parent: &mut SerializedNode, child: SerializedNode) {
    if let Some(children) = parent.children_mut() {
        children.push(child);
    }
}
