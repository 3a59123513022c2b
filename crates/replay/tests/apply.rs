use core_types::NodeId;
use dom::Document;
use mirror::{
    AddedNode, Addition, AttributeChange, DiffBatch, ElementFlags, Move, Removal, SerializedNode,
    TextChange,
};
use replay::{ApplyError, ApplyReport, ReplayConfig, ReplaySession};
use std::collections::BTreeMap;

fn element(id: u32, tag: &str, children: Vec<SerializedNode>) -> SerializedNode {
    SerializedNode::Element {
        id: NodeId(id),
        tag: tag.to_string(),
        attributes: BTreeMap::new(),
        children,
        flags: ElementFlags::default(),
    }
}

fn text(id: u32, value: &str) -> SerializedNode {
    SerializedNode::Text {
        id: NodeId(id),
        value: value.to_string(),
    }
}

/// `#document(1) > ul(2) > li(3..)` with one text child per item.
fn loaded(items: &[&str], config: ReplayConfig) -> ReplaySession<Document> {
    let mut next = 3;
    let mut lis = Vec::new();
    for item in items {
        lis.push(element(next, "li", vec![text(next + 1, item)]));
        next += 2;
    }
    let snapshot = SerializedNode::Document {
        id: NodeId(1),
        children: vec![element(2, "ul", lis)],
    };
    let mut session = ReplaySession::new(Document::new(), config);
    session.load(&snapshot).unwrap();
    session
}

fn node(session: &ReplaySession<Document>, id: u32) -> dom::NodeRef {
    session.registry().node_of(NodeId(id)).expect("id is bound")
}

fn item_texts(session: &ReplaySession<Document>) -> Vec<String> {
    let doc = session.tree();
    let ul = node(session, 2);
    doc.children(ul).iter().map(|li| doc.text_content(*li)).collect()
}

fn add(parent: u32, next: Option<u32>, node: SerializedNode) -> Addition {
    Addition {
        parent_id: NodeId(parent),
        next_id: next.map(NodeId),
        node: AddedNode::Subtree(node),
    }
}

fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}

#[test]
fn load_binds_the_document_and_rebuilds_children() {
    let session = loaded(&["a", "b"], ReplayConfig::default());
    assert_eq!(session.registry().node_of(NodeId(1)), Some(session.tree().root()));
    assert_eq!(item_texts(&session), vec!["a", "b"]);
    assert_eq!(session.registry().len(), 6);
}

#[test]
fn load_rejects_a_non_document_snapshot() {
    let mut session = ReplaySession::new(Document::new(), ReplayConfig::default());
    let err = session.load(&text(4, "x")).unwrap_err();
    assert_eq!(err, ApplyError::NotADocument { found: NodeId(4) });
}

#[test]
fn forward_references_resolve_in_every_order() {
    // Final order under the ul: x(10) y(12) z(14), each pointing at the next,
    // and w(16) nested inside y.
    let additions = vec![
        add(2, Some(12), element(10, "li", vec![text(11, "x")])),
        add(2, Some(14), element(12, "li", vec![text(13, "y")])),
        add(2, None, element(14, "li", vec![text(15, "z")])),
        add(12, None, element(16, "b", vec![text(17, "!")])),
    ];
    for order in permutations(&[0, 1, 2, 3]) {
        let mut session = loaded(&[], ReplayConfig::default());
        let batch = DiffBatch {
            added: order.iter().map(|i| additions[*i].clone()).collect(),
            ..DiffBatch::default()
        };
        let report = session.apply(&batch).unwrap();
        assert_eq!(report.inserted, 4, "order {order:?}");
        assert_eq!(report.dropped, 0, "order {order:?}");
        assert_eq!(item_texts(&session), vec!["x", "y!", "z"], "order {order:?}");
    }
}

#[test]
fn a_single_dangling_item_is_retried_once() {
    let mut session = loaded(&["a"], ReplayConfig::default());
    let batch = DiffBatch {
        added: vec![add(99, None, text(20, "orphan"))],
        ..DiffBatch::default()
    };
    let report = session.apply(&batch).unwrap();
    assert_eq!(report.requeues, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.inserted, 0);
    assert_eq!(session.registry().node_of(NodeId(20)), None);
}

#[test]
fn an_unresolvable_next_sibling_drops_only_that_item() {
    let mut session = loaded(&["a"], ReplayConfig::default());
    let batch = DiffBatch {
        added: vec![
            add(2, Some(99), element(20, "li", vec![text(21, "lost")])),
            add(2, None, element(22, "li", vec![text(23, "kept")])),
        ],
        ..DiffBatch::default()
    };
    let report = session.apply(&batch).unwrap();
    assert_eq!(
        report,
        ApplyReport {
            inserted: 1,
            dropped: 1,
            requeues: 3,
            ..ApplyReport::default()
        }
    );
    assert_eq!(item_texts(&session), vec!["a", "kept"]);
    assert_eq!(session.registry().node_of(NodeId(20)), None);
}

#[test]
fn ids_far_past_the_registry_are_violations() {
    let mut session = loaded(&["a"], ReplayConfig::default());
    let batch = DiffBatch {
        added: vec![
            add(2, None, text(u32::MAX, "hostile")),
            add(2, None, element(20, "li", vec![text(21, "b")])),
        ],
        ..DiffBatch::default()
    };
    let (report, violations) = match session.apply(&batch) {
        Err(ApplyError::IdentityViolation { report, violations }) => (report, violations),
        other => panic!("expected an identity violation, got {other:?}"),
    };
    assert_eq!(violations, vec![NodeId(u32::MAX)]);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(item_texts(&session), vec!["a", "b"]);
    assert_eq!(session.registry().node_of(NodeId(u32::MAX)), None);

    // Later batches still apply.
    let report = session
        .apply(&DiffBatch {
            added: vec![add(2, None, element(22, "li", vec![]))],
            ..DiffBatch::default()
        })
        .unwrap();
    assert_eq!(report.inserted, 1);
}

#[test]
fn id_gap_is_configurable() {
    let config = ReplayConfig {
        max_id_gap: 4,
        ..ReplayConfig::default()
    };
    // Registry ends at id 4, so the next id is 5 and the ceiling 5 + 4 + 1.
    let mut session = loaded(&["a"], config);
    let near = DiffBatch {
        added: vec![add(2, None, text(10, "near"))],
        ..DiffBatch::default()
    };
    assert_eq!(session.apply(&near).unwrap().inserted, 1);
    let far = DiffBatch {
        added: vec![add(2, None, text(30, "far"))],
        ..DiffBatch::default()
    };
    assert!(matches!(
        session.apply(&far),
        Err(ApplyError::IdentityViolation { violations, .. }) if violations == vec![NodeId(30)]
    ));
}

#[test]
fn load_rejects_a_hostile_document_id() {
    let mut session = ReplaySession::new(Document::new(), ReplayConfig::default());
    let snapshot = SerializedNode::Document {
        id: NodeId(u32::MAX),
        children: vec![],
    };
    assert!(matches!(
        session.load(&snapshot),
        Err(ApplyError::IdentityViolation { violations, .. }) if violations == vec![NodeId(u32::MAX)]
    ));
    assert!(session.registry().is_empty());
}

#[test]
fn retry_budget_bounds_the_work_exactly() {
    let mut session = loaded(&[], ReplayConfig::default());
    let batch = DiffBatch {
        added: vec![
            add(99, None, element(20, "li", vec![])),
            add(2, None, element(21, "li", vec![text(22, "b")])),
            add(2, None, element(23, "li", vec![text(24, "c")])),
        ],
        ..DiffBatch::default()
    };
    let report = session.apply(&batch).unwrap();
    assert_eq!(
        report,
        ApplyReport {
            inserted: 2,
            dropped: 1,
            requeues: 6,
            ..ApplyReport::default()
        }
    );
    assert_eq!(item_texts(&session), vec!["b", "c"]);
}

#[test]
fn configured_requeue_limit_overrides_the_budget() {
    let config = ReplayConfig {
        max_requeues: Some(0),
        ..ReplayConfig::default()
    };
    let mut session = loaded(&[], config);
    let batch = DiffBatch {
        added: vec![
            add(2, Some(22), element(20, "li", vec![])),
            add(2, None, element(22, "li", vec![])),
        ],
        ..DiffBatch::default()
    };
    let report = session.apply(&batch).unwrap();
    assert_eq!(report.requeues, 0);
    assert_eq!(report.dropped, 2);
}

#[test]
fn moves_wait_for_a_sibling_that_is_still_moving() {
    // a b c  ->  c a b, shipped as "a before b" then "b last".
    let mut session = loaded(&["a", "b", "c"], ReplayConfig::default());
    let a = node(&session, 3);
    let batch = DiffBatch {
        moved: vec![
            Move {
                id: NodeId(3),
                parent_id: NodeId(2),
                next_id: Some(NodeId(5)),
            },
            Move {
                id: NodeId(5),
                parent_id: NodeId(2),
                next_id: None,
            },
        ],
        ..DiffBatch::default()
    };
    let report = session.apply(&batch).unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.requeues, 1);
    assert_eq!(item_texts(&session), vec!["c", "a", "b"]);
    assert_eq!(node(&session, 3), a, "moved node keeps its identity");
}

#[test]
fn nesting_swap_waits_for_the_parent_to_move_out() {
    // ul > li(3) > li(5) after the setup move; then swap so li(5) holds li(3).
    let mut session = loaded(&["a", "b"], ReplayConfig::default());
    session
        .apply(&DiffBatch {
            moved: vec![Move {
                id: NodeId(5),
                parent_id: NodeId(3),
                next_id: None,
            }],
            ..DiffBatch::default()
        })
        .unwrap();
    let batch = DiffBatch {
        moved: vec![
            Move {
                id: NodeId(3),
                parent_id: NodeId(5),
                next_id: None,
            },
            Move {
                id: NodeId(5),
                parent_id: NodeId(2),
                next_id: None,
            },
        ],
        ..DiffBatch::default()
    };
    let report = session.apply(&batch).unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.dropped, 0);
    let doc = session.tree();
    assert_eq!(doc.parent(node(&session, 5)), Some(node(&session, 2)));
    assert_eq!(doc.parent(node(&session, 3)), Some(node(&session, 5)));
}

#[test]
fn attribute_changes_are_idempotent() {
    let mut session = loaded(&["a"], ReplayConfig::default());
    let batch = DiffBatch {
        attrs: vec![
            AttributeChange {
                id: NodeId(3),
                key: "class".to_string(),
                value: Some("y".to_string()),
            },
            AttributeChange {
                id: NodeId(2),
                key: "hidden".to_string(),
                value: None,
            },
        ],
        ..DiffBatch::default()
    };
    session.apply(&batch).unwrap();
    let once = session.tree().to_tree();
    session.apply(&batch).unwrap();
    assert_eq!(session.tree().to_tree(), once);
    assert_eq!(session.tree().attribute(node(&session, 3), "class"), Some("y"));
}

#[test]
fn unresolved_records_are_skipped_not_errors() {
    let mut session = loaded(&["a"], ReplayConfig::default());
    let batch = DiffBatch {
        removed: vec![
            Removal {
                parent_id: NodeId(2),
                id: NodeId(77),
            },
            Removal {
                parent_id: NodeId(1),
                id: NodeId(3),
            },
        ],
        attrs: vec![AttributeChange {
            id: NodeId(4),
            key: "class".to_string(),
            value: Some("text nodes have no attributes".to_string()),
        }],
        texts: vec![TextChange {
            id: NodeId(88),
            parent_id: NodeId(89),
            value: "nowhere".to_string(),
        }],
        ..DiffBatch::default()
    };
    let report = session.apply(&batch).unwrap();
    assert_eq!(report.skipped, 4);
    assert_eq!(item_texts(&session), vec!["a"]);
}

#[test]
fn text_change_falls_back_to_parent_content() {
    let mut session = loaded(&["a", "b"], ReplayConfig::default());
    let batch = DiffBatch {
        texts: vec![
            TextChange {
                id: NodeId(4),
                parent_id: NodeId(3),
                value: "A".to_string(),
            },
            TextChange {
                id: NodeId(40),
                parent_id: NodeId(5),
                value: "B".to_string(),
            },
        ],
        ..DiffBatch::default()
    };
    let report = session.apply(&batch).unwrap();
    assert_eq!(report.texts, 2);
    assert_eq!(item_texts(&session), vec!["A", "B"]);
}

#[test]
fn removed_subtrees_are_released_and_forgotten() {
    let mut session = loaded(&["a", "b"], ReplayConfig::default());
    let li = node(&session, 3);
    let batch = DiffBatch {
        removed: vec![Removal {
            parent_id: NodeId(2),
            id: NodeId(3),
        }],
        ..DiffBatch::default()
    };
    let report = session.apply(&batch).unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(report.released, 2);
    assert!(!session.tree().is_alive(li));
    assert_eq!(session.registry().node_of(NodeId(3)), None);
    assert_eq!(session.registry().node_of(NodeId(4)), None);

    let mut keep = loaded(
        &["a"],
        ReplayConfig {
            release_removed: false,
            ..ReplayConfig::default()
        },
    );
    let report = keep.apply(&batch).unwrap();
    assert_eq!(report.released, 0);
    assert!(keep.tree().is_alive(node(&keep, 3)));
}

#[test]
fn reused_ids_are_reported_after_the_batch_completes() {
    let mut session = loaded(&["a"], ReplayConfig::default());
    let batch = DiffBatch {
        added: vec![
            add(2, None, element(3, "li", vec![])),
            add(2, None, element(30, "li", vec![text(31, "ok")])),
        ],
        attrs: vec![AttributeChange {
            id: NodeId(2),
            key: "class".to_string(),
            value: Some("done".to_string()),
        }],
        ..DiffBatch::default()
    };
    let Err(ApplyError::IdentityViolation { report, violations }) = session.apply(&batch) else {
        panic!("expected an identity violation");
    };
    assert_eq!(violations, vec![NodeId(3)]);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.attrs, 1);
    assert_eq!(item_texts(&session), vec!["a", "ok"]);
}

#[test]
fn svg_flag_selects_the_namespace() {
    let mut session = loaded(&[], ReplayConfig::default());
    let svg = SerializedNode::Element {
        id: NodeId(40),
        tag: "svg".to_string(),
        attributes: BTreeMap::from([("viewBox".to_string(), "0 0 1 1".to_string())]),
        children: vec![SerializedNode::Element {
            id: NodeId(41),
            tag: "linearGradient".to_string(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            flags: ElementFlags {
                svg: true,
                inert: false,
            },
        }],
        flags: ElementFlags {
            svg: true,
            inert: false,
        },
    };
    session
        .apply(&DiffBatch {
            added: vec![add(2, None, svg)],
            ..DiffBatch::default()
        })
        .unwrap();
    let doc = session.tree();
    let gradient = node(&session, 41);
    assert_eq!(doc.tag_name(gradient), Some("linearGradient"));
    assert_eq!(doc.element(gradient).map(|e| e.namespace), Some(dom::Namespace::Svg));
    assert_eq!(doc.attribute(node(&session, 40), "viewBox"), Some("0 0 1 1"));
}
