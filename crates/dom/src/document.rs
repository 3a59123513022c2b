use crate::error::DomError;
use crate::mutation::MutationRecord;
use crate::types::{ElementData, NodeData, NodeRef};
use core_types::Namespace;
use std::collections::HashSet;
use std::sync::Arc;

struct Slot {
    generation: u32,
    record: Option<NodeRecord>,
}

struct NodeRecord {
    data: NodeData,
    parent: Option<NodeRef>,
    children: Vec<NodeRef>,
}

/// Records queued since the last drain, plus the roots of subtrees removed
/// in that window. Those subtrees stay observed until the queue is drained.
#[derive(Default)]
struct Observer {
    records: Vec<MutationRecord>,
    transient: HashSet<NodeRef>,
}

/// A mutable document tree stored in a generational arena.
///
/// Invariants:
/// - The document node is created with the document and is never released.
/// - A node has at most one parent; parent/children links are kept symmetric.
/// - Detached nodes stay alive until [`Document::release`] frees their subtree.
/// - Released slots are reused with a bumped generation, so old handles go stale.
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeRef,
    observer: Option<Observer>,
}

impl Document {
    pub fn new() -> Self {
        Self::with_doctype(None)
    }

    pub fn with_doctype(doctype: Option<String>) -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeRef::DANGLING,
            observer: None,
        };
        doc.root = doc.alloc(NodeData::Document { doctype });
        doc
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub fn doctype(&self) -> Option<&str> {
        match self.data(self.root) {
            Some(NodeData::Document { doctype }) => doctype.as_deref(),
            _ => None,
        }
    }

    /// Number of live nodes, the document node included.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    /// Start queueing mutation records. Idempotent.
    pub fn observe(&mut self) {
        self.observer.get_or_insert_with(Observer::default);
    }

    /// Stop observing and return whatever was still queued.
    pub fn disconnect(&mut self) -> Vec<MutationRecord> {
        self.observer
            .take()
            .map(|observer| observer.records)
            .unwrap_or_default()
    }

    pub fn is_observed(&self) -> bool {
        self.observer.is_some()
    }

    /// Drain the queued records; this is the flush boundary.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        match self.observer.as_mut() {
            Some(observer) => {
                observer.transient.clear();
                std::mem::take(&mut observer.records)
            }
            None => Vec::new(),
        }
    }

    /// Whether mutations of `target` are recorded: it is connected, or lies in a
    /// subtree removed since the last drain.
    fn observes(&self, target: NodeRef) -> bool {
        let Some(observer) = self.observer.as_ref() else {
            return false;
        };
        let mut current = Some(target);
        while let Some(node) = current {
            if node == self.root || observer.transient.contains(&node) {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Queue `record` when `target` (the mutated parent or node) is observed.
    fn notify(&mut self, target: NodeRef, record: MutationRecord) {
        if !self.observes(target) {
            return;
        }
        if let Some(observer) = self.observer.as_mut() {
            if let MutationRecord::ChildRemoved { node, .. } = &record {
                observer.transient.insert(*node);
            }
            observer.records.push(record);
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    fn record(&self, node: NodeRef) -> Option<&NodeRecord> {
        let slot = self.slots.get(node.index as usize)?;
        if slot.generation != node.generation {
            return None;
        }
        slot.record.as_ref()
    }

    fn record_mut(&mut self, node: NodeRef) -> Option<&mut NodeRecord> {
        let slot = self.slots.get_mut(node.index as usize)?;
        if slot.generation != node.generation {
            return None;
        }
        slot.record.as_mut()
    }

    fn live(&self, node: NodeRef) -> Result<&NodeRecord, DomError> {
        self.record(node).ok_or(DomError::StaleNode(node))
    }

    pub fn is_alive(&self, node: NodeRef) -> bool {
        self.record(node).is_some()
    }

    pub fn data(&self, node: NodeRef) -> Option<&NodeData> {
        self.record(node).map(|r| &r.data)
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.record(node).and_then(|r| r.parent)
    }

    /// Children in order; empty for leaves and stale handles.
    pub fn children(&self, node: NodeRef) -> &[NodeRef] {
        self.record(node).map(|r| r.children.as_slice()).unwrap_or(&[])
    }

    pub fn next_sibling(&self, node: NodeRef) -> Option<NodeRef> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == node)?;
        siblings.get(pos + 1).copied()
    }

    /// Siblings that follow `node`, nearest first.
    pub fn following_siblings(&self, node: NodeRef) -> &[NodeRef] {
        let Some(parent) = self.parent(node) else {
            return &[];
        };
        let siblings = self.children(parent);
        match siblings.iter().position(|c| *c == node) {
            Some(pos) => &siblings[pos + 1..],
            None => &[],
        }
    }

    /// `true` when `node` is an inclusive descendant of `ancestor`.
    pub fn contains(&self, ancestor: NodeRef, node: NodeRef) -> bool {
        if !self.is_alive(ancestor) {
            return false;
        }
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// `true` when the node hangs (transitively) off the document node.
    pub fn is_connected(&self, node: NodeRef) -> bool {
        self.contains(self.root, node)
    }

    pub fn element(&self, node: NodeRef) -> Option<&ElementData> {
        self.data(node).and_then(NodeData::as_element)
    }

    pub fn tag_name(&self, node: NodeRef) -> Option<&str> {
        self.element(node).map(|e| e.name.as_ref())
    }

    pub fn attribute(&self, node: NodeRef, name: &str) -> Option<&str> {
        self.element(node).and_then(|e| e.attribute(name))
    }

    /// Character data of a text or comment node.
    pub fn text(&self, node: NodeRef) -> Option<&str> {
        self.data(node).and_then(NodeData::leaf_text)
    }

    /// Concatenated descendant text, like `textContent`.
    pub fn text_content(&self, node: NodeRef) -> String {
        let mut out = String::new();
        for n in self.descendants(node) {
            if let Some(NodeData::Text(text)) = self.data(n) {
                out.push_str(text);
            }
        }
        out
    }

    /// Pre-order walk of the inclusive subtree rooted at `node`.
    pub fn descendants(&self, node: NodeRef) -> Descendants<'_> {
        let stack = if self.is_alive(node) {
            vec![node]
        } else {
            Vec::new()
        };
        Descendants { doc: self, stack }
    }

    // ---------------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------------

    fn alloc(&mut self, data: NodeData) -> NodeRef {
        let record = NodeRecord {
            data,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(record);
            NodeRef {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                record: Some(record),
            });
            NodeRef {
                index,
                generation: 0,
            }
        }
    }

    /// Create a detached HTML element; the name is canonicalized to lowercase.
    pub fn create_element(&mut self, name: &str) -> NodeRef {
        self.create_element_ns(name, Namespace::Html)
    }

    pub fn create_element_ns(&mut self, name: &str, namespace: Namespace) -> NodeRef {
        self.alloc(NodeData::Element(ElementData {
            name: Arc::from(namespace.canonical_name(name)),
            namespace,
            attributes: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeRef {
        self.alloc(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeRef {
        self.alloc(NodeData::Comment(text.to_string()))
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    pub fn append_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference`, or append when `reference`
    /// is `None`. A child that already has a parent is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeRef,
        child: NodeRef,
        reference: Option<NodeRef>,
    ) -> Result<(), DomError> {
        if !self.live(parent)?.data.allows_children() {
            return Err(DomError::LeafParent(parent));
        }
        if matches!(self.live(child)?.data, NodeData::Document { .. })
            || self.contains(child, parent)
        {
            return Err(DomError::Hierarchy { parent, child });
        }
        let mut reference = reference;
        if let Some(before) = reference {
            if self.live(before)?.parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: before,
                });
            }
            if before == child {
                reference = self.next_sibling(child);
            }
        }

        self.detach(child)?;

        let Some(parent_record) = self.record_mut(parent) else {
            return Err(DomError::StaleNode(parent));
        };
        let pos = match reference {
            Some(before) => parent_record
                .children
                .iter()
                .position(|c| *c == before)
                .unwrap_or(parent_record.children.len()),
            None => parent_record.children.len(),
        };
        parent_record.children.insert(pos, child);
        if let Some(child_record) = self.record_mut(child) {
            child_record.parent = Some(parent);
        }
        self.notify(
            parent,
            MutationRecord::ChildAdded {
                parent,
                node: child,
            },
        );
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<(), DomError> {
        self.live(parent)?;
        if self.live(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child)
    }

    /// Remove the node from its parent, if it has one.
    pub fn detach(&mut self, node: NodeRef) -> Result<(), DomError> {
        let Some(parent) = self.live(node)?.parent else {
            return Ok(());
        };
        if let Some(parent_record) = self.record_mut(parent) {
            parent_record.children.retain(|c| *c != node);
        }
        if let Some(record) = self.record_mut(node) {
            record.parent = None;
        }
        self.notify(parent, MutationRecord::ChildRemoved { parent, node });
        Ok(())
    }

    /// Free a detached subtree. Returns the released handles, which are stale
    /// from now on.
    pub fn release(&mut self, node: NodeRef) -> Result<Vec<NodeRef>, DomError> {
        if node == self.root {
            return Err(DomError::Hierarchy {
                parent: node,
                child: node,
            });
        }
        if self.live(node)?.parent.is_some() {
            return Err(DomError::StillAttached(node));
        }
        let released: Vec<NodeRef> = self.descendants(node).collect();
        for n in &released {
            let slot = &mut self.slots[n.index as usize];
            slot.record = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(n.index);
        }
        Ok(released)
    }

    /// Remove and release every child of the document node.
    pub fn clear(&mut self) {
        let children = self.children(self.root).to_vec();
        for child in children {
            if self.detach(child).is_ok() {
                let _ = self.release(child);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Content
    // ---------------------------------------------------------------------

    pub fn set_attribute(&mut self, node: NodeRef, name: &str, value: &str) -> Result<(), DomError> {
        let name = self.attribute_name(node, name)?;
        let Some(NodeData::Element(element)) = self.record_mut(node).map(|r| &mut r.data) else {
            return Err(DomError::StaleNode(node));
        };
        let old_value = match element.attributes.iter_mut().find(|(k, _)| k.as_ref() == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value.to_string())),
            None => {
                element
                    .attributes
                    .push((Arc::from(name.as_str()), value.to_string()));
                None
            }
        };
        self.notify(
            node,
            MutationRecord::Attribute {
                node,
                name: Arc::from(name),
                old_value,
            },
        );
        Ok(())
    }

    /// Returns the removed value, or `None` when the attribute was not present.
    pub fn remove_attribute(&mut self, node: NodeRef, name: &str) -> Result<Option<String>, DomError> {
        let name = self.attribute_name(node, name)?;
        let Some(NodeData::Element(element)) = self.record_mut(node).map(|r| &mut r.data) else {
            return Err(DomError::StaleNode(node));
        };
        let Some(pos) = element.attributes.iter().position(|(k, _)| k.as_ref() == name) else {
            return Ok(None);
        };
        let (key, old) = element.attributes.remove(pos);
        self.notify(
            node,
            MutationRecord::Attribute {
                node,
                name: key,
                old_value: Some(old.clone()),
            },
        );
        Ok(Some(old))
    }

    /// Attribute names on HTML elements are ASCII-case-insensitive.
    fn attribute_name(&self, node: NodeRef, name: &str) -> Result<String, DomError> {
        match self.element(node) {
            Some(element) if element.namespace == Namespace::Html => Ok(name.to_ascii_lowercase()),
            Some(_) => Ok(name.to_string()),
            None => Err(self.kind_error(node)),
        }
    }

    /// Replace the character data of a text or comment node.
    pub fn set_text(&mut self, node: NodeRef, text: &str) -> Result<(), DomError> {
        if self.text(node).is_none() {
            return Err(self.kind_error(node));
        }
        let old_value = match self.record_mut(node).map(|r| &mut r.data) {
            Some(NodeData::Text(existing)) | Some(NodeData::Comment(existing)) => {
                std::mem::replace(existing, text.to_string())
            }
            _ => return Err(DomError::StaleNode(node)),
        };
        self.notify(node, MutationRecord::CharacterData { node, old_value });
        Ok(())
    }

    /// `textContent` setter: leaves get their data replaced, containers lose all
    /// children and receive one text node (none for an empty string).
    pub fn set_text_content(&mut self, node: NodeRef, text: &str) -> Result<(), DomError> {
        if !self.live(node)?.data.allows_children() {
            return self.set_text(node, text);
        }
        let children = self.children(node).to_vec();
        for child in children {
            self.detach(child)?;
        }
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(node, text_node)?;
        }
        Ok(())
    }

    fn kind_error(&self, node: NodeRef) -> DomError {
        if self.is_alive(node) {
            DomError::WrongNodeKind(node)
        } else {
            DomError::StaleNode(node)
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterative pre-order traversal; see [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeRef>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(node).iter().rev().copied());
        Some(node)
    }
}
