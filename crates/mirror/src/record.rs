use core_types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extra per-element facts the consumer needs to rebuild the node faithfully.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementFlags {
    /// Lives in the SVG namespace; the tag keeps its case.
    #[serde(skip_serializing_if = "is_false")]
    pub svg: bool,
    /// Script-bearing element rewritten to an inert tag on capture.
    #[serde(skip_serializing_if = "is_false")]
    pub inert: bool,
}

impl ElementFlags {
    pub fn is_empty(&self) -> bool {
        !self.svg && !self.inert
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Wire form of one node and, for containers, its subtree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SerializedNode {
    Document {
        id: NodeId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<SerializedNode>,
    },
    Element {
        id: NodeId,
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<SerializedNode>,
        #[serde(default, skip_serializing_if = "ElementFlags::is_empty")]
        flags: ElementFlags,
    },
    Text {
        id: NodeId,
        value: String,
    },
    Comment {
        id: NodeId,
        value: String,
    },
}

impl SerializedNode {
    /// Degenerate record produced for a handle that no longer resolves.
    pub fn empty_document() -> Self {
        SerializedNode::Document {
            id: NodeId::INVALID,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            SerializedNode::Document { id, .. }
            | SerializedNode::Element { id, .. }
            | SerializedNode::Text { id, .. }
            | SerializedNode::Comment { id, .. } => *id,
        }
    }

    pub fn children(&self) -> &[SerializedNode] {
        match self {
            SerializedNode::Document { children, .. } | SerializedNode::Element { children, .. } => {
                children
            }
            SerializedNode::Text { .. } | SerializedNode::Comment { .. } => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<SerializedNode>> {
        match self {
            SerializedNode::Document { children, .. } | SerializedNode::Element { children, .. } => {
                Some(children)
            }
            SerializedNode::Text { .. } | SerializedNode::Comment { .. } => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            SerializedNode::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Pre-order walk over this record and everything below it.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Number of records in the subtree, this one included.
    pub fn node_count(&self) -> usize {
        self.walk().count()
    }
}

/// Iterator returned by [`SerializedNode::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a SerializedNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a SerializedNode;

    fn next(&mut self) -> Option<&'a SerializedNode> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SerializedNode {
        SerializedNode::Element {
            id: NodeId(2),
            tag: "div".to_string(),
            attributes: BTreeMap::from([("id".to_string(), "a".to_string())]),
            children: vec![
                SerializedNode::Text {
                    id: NodeId(3),
                    value: "x".to_string(),
                },
                SerializedNode::Comment {
                    id: NodeId(4),
                    value: "c".to_string(),
                },
            ],
            flags: ElementFlags::default(),
        }
    }

    #[test]
    fn element_wire_shape_omits_defaults() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "element",
                "id": 2,
                "tag": "div",
                "attributes": { "id": "a" },
                "children": [
                    { "type": "text", "id": 3, "value": "x" },
                    { "type": "comment", "id": 4, "value": "c" }
                ]
            })
        );
    }

    #[test]
    fn flags_are_read_back() {
        let node: SerializedNode = serde_json::from_value(json!({
            "type": "element",
            "id": 9,
            "tag": "linearGradient",
            "flags": { "svg": true }
        }))
        .unwrap();
        let SerializedNode::Element { flags, children, .. } = &node else {
            panic!("expected element, got {node:?}");
        };
        assert!(flags.svg);
        assert!(!flags.inert);
        assert!(children.is_empty());
    }

    #[test]
    fn walk_is_pre_order() {
        let ids: Vec<u32> = sample().walk().map(|n| n.id().0).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(sample().node_count(), 3);
    }
}
