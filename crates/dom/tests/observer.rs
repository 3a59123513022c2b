use dom::dom_snapshot::{DomSnapshotOptions, assert_dom_eq};
use dom::{Document, MutationRecord, parse_document, parse_fragment};

#[test]
fn observer_records_structural_changes_in_order() {
    let mut doc = parse_document(r#"<div id="a"><span>x</span></div><div id="b"></div>"#);
    let root = doc.root();
    let a = doc.children(root)[0];
    let b = doc.children(root)[1];
    let span = doc.children(a)[0];

    doc.observe();
    doc.append_child(b, span).unwrap();
    let records = doc.take_records();

    assert_eq!(
        records,
        vec![
            MutationRecord::ChildRemoved {
                parent: a,
                node: span
            },
            MutationRecord::ChildAdded {
                parent: b,
                node: span
            },
        ]
    );
    assert!(doc.take_records().is_empty(), "take_records drains the queue");
}

#[test]
fn observer_ignores_mutations_on_detached_nodes() {
    let mut doc = parse_document("<main></main>");
    doc.observe();
    let nodes = parse_fragment(&mut doc, "<section><p>hi</p></section>");
    let section = nodes[0];
    doc.set_attribute(section, "class", "late").unwrap();
    assert!(doc.take_records().is_empty());

    let main = doc.children(doc.root())[0];
    doc.append_child(main, section).unwrap();
    let records = doc.take_records();
    assert_eq!(records.len(), 1);
    assert!(matches!(records[0], MutationRecord::ChildAdded { node, .. } if node == section));
}

#[test]
fn removed_subtrees_stay_observed_until_records_are_taken() {
    let mut doc = parse_document(r#"<div><p class="x">t</p></div>"#);
    let div = doc.children(doc.root())[0];
    let p = doc.children(div)[0];
    let text = doc.children(p)[0];
    doc.observe();

    doc.remove_child(div, p).unwrap();
    doc.set_attribute(p, "class", "z").unwrap();
    doc.set_text(text, "u").unwrap();
    doc.remove_child(p, text).unwrap();
    doc.set_text(text, "v").unwrap();
    let records = doc.take_records();
    assert_eq!(
        records,
        vec![
            MutationRecord::ChildRemoved { parent: div, node: p },
            MutationRecord::Attribute {
                node: p,
                name: "class".into(),
                old_value: Some("x".to_string()),
            },
            MutationRecord::CharacterData {
                node: text,
                old_value: "t".to_string(),
            },
            MutationRecord::ChildRemoved { parent: p, node: text },
            MutationRecord::CharacterData {
                node: text,
                old_value: "u".to_string(),
            },
        ]
    );

    // Once drained, the detached subtree is out of scope.
    doc.set_attribute(p, "class", "w").unwrap();
    assert!(doc.take_records().is_empty());
}

#[test]
fn observer_reports_old_values() {
    let mut doc = parse_document(r#"<p class="x">hello</p>"#);
    let p = doc.children(doc.root())[0];
    let text = doc.children(p)[0];
    doc.observe();
    doc.set_attribute(p, "class", "y").unwrap();
    doc.set_text(text, "bye").unwrap();
    let records = doc.disconnect();
    assert_eq!(
        records,
        vec![
            MutationRecord::Attribute {
                node: p,
                name: "class".into(),
                old_value: Some("x".to_string()),
            },
            MutationRecord::CharacterData {
                node: text,
                old_value: "hello".to_string(),
            },
        ]
    );
    assert!(!doc.is_observed());
}

#[test]
fn markup_roundtrips_through_owned_tree() {
    let doc = parse_document(r#"<ul><li class="a">1</li><li>2<!--c--></li></ul>"#);
    let tree = doc.to_tree();
    let rebuilt = Document::from_node(&tree).unwrap();
    assert_dom_eq(&tree, &rebuilt.to_tree(), DomSnapshotOptions::default());
}
