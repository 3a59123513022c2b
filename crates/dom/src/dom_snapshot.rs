use crate::Node;
use core_types::Namespace;
use std::fmt::{self, Write};
use std::sync::OnceLock;

/// Deterministic tree rendering and equality rules for mirror tests.
/// Not a public stable format; intended for test comparisons and CLI output.
///
/// Equivalence rules:
/// - Node kinds, element names and namespaces must match.
/// - Attribute sets must match; order is ignored when `sort_attributes` is set.
/// - Text and comment data must match exactly.
/// - Whitespace-only text nodes can be ignored by options (the capture side
///   drops them by default).
#[derive(Clone, Copy, Debug)]
pub struct DomSnapshotOptions {
    pub ignore_blank_text: bool,
    pub sort_attributes: bool,
}

impl Default for DomSnapshotOptions {
    fn default() -> Self {
        Self {
            ignore_blank_text: true,
            sort_attributes: true,
        }
    }
}

#[derive(Debug)]
pub struct DomSnapshot {
    lines: Vec<String>,
}

impl DomSnapshot {
    pub fn new(root: &Node, options: DomSnapshotOptions) -> Self {
        let normalized = normalize(root, &options);
        let mut lines = Vec::new();
        walk_snapshot(&normalized, 0, &mut lines);
        Self { lines }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for DomSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i != 0 {
                f.write_str("\n")?;
            }
            f.write_str(line)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct DomMismatch {
    path: String,
    detail: String,
    expected: String,
    actual: String,
    expected_node: Node,
    actual_node: Node,
    expected_subtree: OnceLock<String>,
    actual_subtree: OnceLock<String>,
}

impl fmt::Display for DomMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = DomSnapshotOptions {
            ignore_blank_text: false,
            sort_attributes: false,
        };
        let expected_subtree = self
            .expected_subtree
            .get_or_init(|| DomSnapshot::new(&self.expected_node, raw).render());
        let actual_subtree = self
            .actual_subtree
            .get_or_init(|| DomSnapshot::new(&self.actual_node, raw).render());
        writeln!(f, "DOM mismatch at {}: {}", self.path, self.detail)?;
        writeln!(f, "expected: {}", self.expected)?;
        writeln!(f, "actual:   {}", self.actual)?;
        writeln!(f, "expected subtree:\n{}", expected_subtree)?;
        writeln!(f, "actual subtree:\n{}", actual_subtree)?;
        Ok(())
    }
}

impl std::error::Error for DomMismatch {}

pub fn assert_dom_eq(expected: &Node, actual: &Node, options: DomSnapshotOptions) {
    if let Err(mismatch) = compare_dom(expected, actual, options) {
        panic!("{mismatch}");
    }
}

pub fn compare_dom(
    expected: &Node,
    actual: &Node,
    options: DomSnapshotOptions,
) -> Result<(), Box<DomMismatch>> {
    let expected = normalize(expected, &options);
    let actual = normalize(actual, &options);
    let mut path = vec![node_label(&expected)];
    compare_nodes(&expected, &actual, &mut path)
}

/// Apply the option rules up front so the comparison itself is plain equality.
fn normalize(node: &Node, options: &DomSnapshotOptions) -> Node {
    let children = |children: &[Node]| {
        children
            .iter()
            .filter(|c| {
                !(options.ignore_blank_text
                    && matches!(c, Node::Text { text } if text.trim().is_empty()))
            })
            .map(|c| normalize(c, options))
            .collect::<Vec<_>>()
    };
    match node {
        Node::Document { doctype, children: kids } => Node::Document {
            doctype: doctype.clone(),
            children: children(kids),
        },
        Node::Element {
            name,
            namespace,
            attributes,
            children: kids,
        } => {
            let mut attributes = attributes.clone();
            if options.sort_attributes {
                attributes.sort();
            }
            Node::Element {
                name: name.clone(),
                namespace: *namespace,
                attributes,
                children: children(kids),
            }
        }
        Node::Text { .. } | Node::Comment { .. } => node.clone(),
    }
}

fn compare_nodes(expected: &Node, actual: &Node, path: &mut Vec<String>) -> Result<(), Box<DomMismatch>> {
    match (expected, actual) {
        (
            Node::Document {
                doctype: expected_doctype,
                children: expected_children,
            },
            Node::Document {
                doctype: actual_doctype,
                children: actual_children,
            },
        ) => {
            if expected_doctype != actual_doctype {
                return Err(mismatch(path, "doctype", expected, actual));
            }
            compare_children(expected, actual, expected_children, actual_children, path)
        }
        (
            Node::Element {
                name: expected_name,
                namespace: expected_ns,
                attributes: expected_attrs,
                children: expected_children,
            },
            Node::Element {
                name: actual_name,
                namespace: actual_ns,
                attributes: actual_attrs,
                children: actual_children,
            },
        ) => {
            if expected_name != actual_name {
                return Err(mismatch(path, "element name", expected, actual));
            }
            if expected_ns != actual_ns {
                return Err(mismatch(path, "namespace", expected, actual));
            }
            if expected_attrs.len() != actual_attrs.len() {
                return Err(mismatch(path, "attribute count", expected, actual));
            }
            for (i, (exp, act)) in expected_attrs.iter().zip(actual_attrs.iter()).enumerate() {
                if exp.0 != act.0 {
                    let detail = format!("attribute name at index {i}");
                    return Err(mismatch(path, &detail, expected, actual));
                }
                if exp.1 != act.1 {
                    let detail = format!("attribute value at index {i}");
                    return Err(mismatch(path, &detail, expected, actual));
                }
            }
            compare_children(expected, actual, expected_children, actual_children, path)
        }
        (Node::Text { text: expected_text }, Node::Text { text: actual_text }) => {
            if expected_text != actual_text {
                return Err(mismatch(path, "text", expected, actual));
            }
            Ok(())
        }
        (Node::Comment { text: expected_text }, Node::Comment { text: actual_text }) => {
            if expected_text != actual_text {
                return Err(mismatch(path, "comment", expected, actual));
            }
            Ok(())
        }
        _ => Err(mismatch(path, "node kind", expected, actual)),
    }
}

fn compare_children(
    expected_parent: &Node,
    actual_parent: &Node,
    expected: &[Node],
    actual: &[Node],
    path: &mut Vec<String>,
) -> Result<(), Box<DomMismatch>> {
    if expected.len() != actual.len() {
        let detail = format!(
            "child count (expected {}, actual {})",
            expected.len(),
            actual.len()
        );
        return Err(mismatch(path, &detail, expected_parent, actual_parent));
    }
    for (idx, (exp, act)) in expected.iter().zip(actual.iter()).enumerate() {
        path.push(format!("{}[{}]", node_label(exp), idx));
        let result = compare_nodes(exp, act, path);
        path.pop();
        result?;
    }
    Ok(())
}

fn mismatch(path: &[String], detail: &str, expected: &Node, actual: &Node) -> Box<DomMismatch> {
    Box::new(DomMismatch {
        path: format!("/{}", path.join("/")),
        detail: detail.to_string(),
        expected: truncate_line(format_node_line(expected), 160),
        actual: truncate_line(format_node_line(actual), 160),
        expected_node: expected.clone(),
        actual_node: actual.clone(),
        expected_subtree: OnceLock::new(),
        actual_subtree: OnceLock::new(),
    })
}

fn node_label(node: &Node) -> String {
    match node {
        Node::Document { .. } => "#document".to_string(),
        Node::Element {
            name, attributes, ..
        } => {
            let mut label = String::from(name.as_ref());
            let find = |key: &str| {
                attributes
                    .iter()
                    .find(|(k, _)| k.as_ref() == key)
                    .map(|(_, v)| v.as_str())
                    .filter(|v| !v.is_empty())
            };
            if let Some(id_value) = find("id") {
                label.push('#');
                write_escaped(&mut label, id_value);
            } else if let Some(class_value) = find("class") {
                label.push_str(".class=");
                write_escaped(&mut label, class_value);
            }
            label
        }
        Node::Text { .. } => "#text".to_string(),
        Node::Comment { .. } => "#comment".to_string(),
    }
}

fn truncate_line(mut line: String, max_len: usize) -> String {
    if line.len() > max_len {
        let mut cut = max_len.saturating_sub(3);
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        line.truncate(cut);
        line.push_str("...");
    }
    line
}

fn walk_snapshot(node: &Node, depth: usize, out: &mut Vec<String>) {
    const INDENT_STEP: usize = 2;
    let mut line = " ".repeat(depth.saturating_mul(INDENT_STEP));
    write_node_line(&mut line, node);
    out.push(line);
    for child in node.children() {
        walk_snapshot(child, depth + 1, out);
    }
}

fn format_node_line(node: &Node) -> String {
    let mut line = String::new();
    write_node_line(&mut line, node);
    line
}

fn write_node_line(out: &mut String, node: &Node) {
    match node {
        Node::Document { doctype, .. } => {
            out.push_str("#document");
            if let Some(dt) = doctype {
                out.push_str(" doctype=\"");
                write_escaped(out, dt);
                out.push('"');
            }
        }
        Node::Element {
            name,
            namespace,
            attributes,
            ..
        } => {
            out.push('<');
            if *namespace == Namespace::Svg {
                out.push_str("svg:");
            }
            out.push_str(name);
            for (attr, value) in attributes {
                out.push(' ');
                out.push_str(attr);
                out.push_str("=\"");
                write_escaped(out, value);
                out.push('"');
            }
            out.push('>');
        }
        Node::Text { text } => {
            out.push('"');
            write_escaped(out, text);
            out.push('"');
        }
        Node::Comment { text } => {
            out.push_str("<!-- ");
            write_escaped(out, text);
            out.push_str(" -->");
        }
    }
}

fn write_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ if ch.is_ascii() => out.push(ch),
            _ => {
                let _ = write!(out, "\\u{{{:X}}}", ch as u32);
            }
        }
    }
}
