use crate::record::SerializedNode;
use core_types::NodeId;
use serde::{Deserialize, Serialize};

/// `id` was detached from `parent_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Removal {
    pub parent_id: NodeId,
    pub id: NodeId,
}

/// A node the consumer already has now lives under `parent_id`, before
/// `next_id` (or last when `next_id` is `None`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub id: NodeId,
    pub parent_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_id: Option<NodeId>,
}

/// Payload of an [`Addition`]: a full subtree for new nodes, a bare id for
/// nodes the consumer already holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddedNode {
    Subtree(SerializedNode),
    Existing(NodeId),
}

impl AddedNode {
    /// Id of the node this payload inserts.
    pub fn id(&self) -> NodeId {
        match self {
            AddedNode::Subtree(node) => node.id(),
            AddedNode::Existing(id) => *id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Addition {
    pub parent_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_id: Option<NodeId>,
    pub node: AddedNode,
}

/// Final value of one attribute; `None` means it was removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub id: NodeId,
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChange {
    pub id: NodeId,
    pub parent_id: NodeId,
    pub value: String,
}

/// Everything that changed between two flushes, reduced to its net effect.
///
/// The consumer applies the lists in field order: removals, then moves and
/// additions together, then attributes, then text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffBatch {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<Removal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub moved: Vec<Move>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<Addition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<AttributeChange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub texts: Vec<TextChange>,
}

impl DiffBatch {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of records across all lists.
    pub fn len(&self) -> usize {
        self.removed.len() + self.moved.len() + self.added.len() + self.attrs.len() + self.texts.len()
    }
}

/// An initial snapshot followed by the batches captured after it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub snapshot: SerializedNode,
    #[serde(default)]
    pub batches: Vec<DiffBatch>,
}

/// The batch that builds `snapshot` on top of an empty document whose root is
/// already bound to the snapshot's document id. Non-document records produce
/// an empty batch since they carry no parent to attach to.
pub fn diff_from_empty(snapshot: &SerializedNode) -> DiffBatch {
    let SerializedNode::Document { id, children } = snapshot else {
        return DiffBatch::default();
    };
    DiffBatch {
        added: children
            .iter()
            .map(|child| Addition {
                parent_id: *id,
                next_id: None,
                node: AddedNode::Subtree(child.clone()),
            })
            .collect(),
        ..DiffBatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_lists_are_omitted() {
        let batch = DiffBatch {
            removed: vec![Removal {
                parent_id: NodeId(1),
                id: NodeId(4),
            }],
            ..DiffBatch::default()
        };
        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({ "removed": [{ "parentId": 1, "id": 4 }] })
        );
        let back: DiffBatch = serde_json::from_value(json!({})).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn added_node_accepts_subtree_or_bare_id() {
        let batch: DiffBatch = serde_json::from_value(json!({
            "added": [
                { "parentId": 1, "node": 7 },
                { "parentId": 1, "nextId": 7, "node": { "type": "text", "id": 8, "value": "hi" } }
            ]
        }))
        .unwrap();
        assert_eq!(batch.added[0].node, AddedNode::Existing(NodeId(7)));
        assert_eq!(batch.added[0].next_id, None);
        assert_eq!(batch.added[1].next_id, Some(NodeId(7)));
        assert_eq!(batch.added[1].node.id(), NodeId(8));
    }

    #[test]
    fn attribute_removal_is_an_explicit_null() {
        let change = AttributeChange {
            id: NodeId(3),
            key: "class".to_string(),
            value: None,
        };
        assert_eq!(
            serde_json::to_value(&change).unwrap(),
            json!({ "id": 3, "key": "class", "value": null })
        );
    }

    #[test]
    fn diff_from_empty_appends_document_children_in_order() {
        let snapshot = SerializedNode::Document {
            id: NodeId(1),
            children: vec![
                SerializedNode::Comment {
                    id: NodeId(2),
                    value: "a".to_string(),
                },
                SerializedNode::Text {
                    id: NodeId(3),
                    value: "b".to_string(),
                },
            ],
        };
        let batch = diff_from_empty(&snapshot);
        assert_eq!(batch.len(), 2);
        assert!(batch.added.iter().all(|a| a.parent_id == NodeId(1) && a.next_id.is_none()));
        let ids: Vec<_> = batch.added.iter().map(|a| a.node.id()).collect();
        assert_eq!(ids, vec![NodeId(2), NodeId(3)]);

        let leaf = SerializedNode::Text {
            id: NodeId(5),
            value: String::new(),
        };
        assert!(diff_from_empty(&leaf).is_empty());
    }
}
