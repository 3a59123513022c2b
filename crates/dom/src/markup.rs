//! Small markup reader used to seed documents from fixtures.
//!
//! This is not an HTML5 parser: there is no error recovery beyond popping the
//! open-element stack to the matching end tag, and no implied elements.
//!
//! Supported:
//! - start/end tags with `[A-Za-z0-9:_-]` names, quoted/unquoted/boolean attributes,
//!   self-closing syntax and HTML void elements;
//! - comments and a leading doctype;
//! - raw text for `script` and `style`;
//! - the common named entities and numeric character references;
//! - foreign content: `<svg>` switches the namespace until it closes, and
//!   `foreignObject` switches back to HTML for its children.

use crate::document::Document;
use crate::types::{NodeData, NodeRef};
use core_types::Namespace;
use memchr::memchr;

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

/// Parse `input` into a fresh document.
pub fn parse_document(input: &str) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    let mut builder = Builder::new(&mut doc, Some((root, Namespace::Html)));
    builder.run(input);
    doc
}

/// Parse `input` into detached nodes of `doc`, returned in source order.
pub fn parse_fragment(doc: &mut Document, input: &str) -> Vec<NodeRef> {
    let mut builder = Builder::new(doc, None);
    builder.run(input);
    builder.top_level
}

struct Builder<'a> {
    doc: &'a mut Document,
    sink: Option<(NodeRef, Namespace)>,
    open: Vec<(NodeRef, Namespace)>,
    top_level: Vec<NodeRef>,
}

impl<'a> Builder<'a> {
    fn new(doc: &'a mut Document, sink: Option<(NodeRef, Namespace)>) -> Self {
        Self {
            doc,
            sink,
            open: Vec::new(),
            top_level: Vec::new(),
        }
    }

    fn current(&self) -> Option<(NodeRef, Namespace)> {
        self.open.last().copied().or(self.sink)
    }

    fn insert(&mut self, node: NodeRef) {
        match self.current() {
            Some((parent, _)) => {
                if let Err(err) = self.doc.append_child(parent, node) {
                    log::trace!(target: "dom.markup", "dropping node: {err}");
                }
            }
            None => self.top_level.push(node),
        }
    }

    fn run(&mut self, input: &str) {
        let bytes = input.as_bytes();
        let mut i = 0;
        // Slices are only cut at ASCII structural bytes, so they stay on char boundaries.
        while i < bytes.len() {
            if bytes[i] != b'<' {
                let end = memchr(b'<', &bytes[i..]).map_or(bytes.len(), |rel| i + rel);
                self.text(&decode_entities(&input[i..end]));
                i = end;
                continue;
            }
            if input[i..].starts_with(COMMENT_START) {
                let body_start = i + COMMENT_START.len();
                let (body_end, next) = match input[body_start..].find(COMMENT_END) {
                    Some(rel) => (body_start + rel, body_start + rel + COMMENT_END.len()),
                    None => (bytes.len(), bytes.len()),
                };
                let comment = self.doc.create_comment(&input[body_start..body_end]);
                self.insert(comment);
                i = next;
                continue;
            }
            if starts_with_ignore_ascii_case(&bytes[i..], b"<!doctype") {
                // Doctypes carry no structure the mirror cares about beyond the name.
                i = memchr(b'>', &bytes[i..]).map_or(bytes.len(), |rel| i + rel + 1);
                continue;
            }
            if bytes.get(i + 1) == Some(&b'/') {
                let name_end = scan_name(bytes, i + 2);
                self.end_tag(&input[i + 2..name_end]);
                i = memchr(b'>', &bytes[name_end..]).map_or(bytes.len(), |rel| name_end + rel + 1);
                continue;
            }
            let name_end = scan_name(bytes, i + 1);
            if name_end == i + 1 {
                // A lone '<' is text.
                self.text("<");
                i += 1;
                continue;
            }
            i = self.start_tag(input, i + 1, name_end);
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        // Merge with a preceding text sibling so fixtures read the way they look.
        if let Some((parent, _)) = self.current() {
            if let Some(&last) = self.doc.children(parent).last() {
                if let Some(NodeData::Text(existing)) = self.doc.data(last) {
                    let merged = format!("{existing}{text}");
                    if let Err(err) = self.doc.set_text(last, &merged) {
                        log::trace!(target: "dom.markup", "cannot merge text: {err}");
                    }
                    return;
                }
            }
        }
        let node = self.doc.create_text(text);
        self.insert(node);
    }

    /// Returns the index just past the tag (and past raw text for `script`/`style`).
    fn start_tag(&mut self, input: &str, name_start: usize, name_end: usize) -> usize {
        let bytes = input.as_bytes();
        let raw_name = &input[name_start..name_end];
        let parent_ns = self.current().map_or(Namespace::Html, |(_, ns)| ns);
        let namespace = if parent_ns == Namespace::Html && raw_name.eq_ignore_ascii_case("svg") {
            Namespace::Svg
        } else {
            parent_ns
        };
        let element = self.doc.create_element_ns(raw_name, namespace);

        let mut k = name_end;
        let mut self_closing = false;
        loop {
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k >= bytes.len() {
                break;
            }
            match bytes[k] {
                b'>' => {
                    k += 1;
                    break;
                }
                b'/' => {
                    self_closing = true;
                    k += 1;
                    continue;
                }
                _ => {}
            }
            let attr_start = k;
            k = scan_name(bytes, k);
            if k == attr_start {
                // Unknown byte inside a tag; skip it.
                k += 1;
                continue;
            }
            let attr_name = &input[attr_start..k];
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            let mut value = String::new();
            if k < bytes.len() && bytes[k] == b'=' {
                k += 1;
                while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if k < bytes.len() && (bytes[k] == b'"' || bytes[k] == b'\'') {
                    let quote = bytes[k];
                    let start = k + 1;
                    let end = memchr(quote, &bytes[start..]).map_or(bytes.len(), |rel| start + rel);
                    value = decode_entities(&input[start..end]);
                    k = (end + 1).min(bytes.len());
                } else {
                    let start = k;
                    while k < bytes.len() && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                        k += 1;
                    }
                    value = decode_entities(&input[start..k]);
                }
            }
            if self.doc.attribute(element, attr_name).is_none() {
                if let Err(err) = self.doc.set_attribute(element, attr_name, &value) {
                    log::trace!(target: "dom.markup", "dropping attribute {attr_name}: {err}");
                }
            }
        }

        self.insert(element);
        let tag = self.doc.tag_name(element).unwrap_or_default().to_string();
        if self_closing || (namespace == Namespace::Html && is_void_element(&tag)) {
            return k;
        }
        if namespace == Namespace::Html && (tag == "script" || tag == "style") {
            let (body_end, next) = find_raw_text_end(input, k, &tag);
            if body_end > k {
                let text = self.doc.create_text(&input[k..body_end]);
                if let Err(err) = self.doc.append_child(element, text) {
                    log::trace!(target: "dom.markup", "dropping raw text: {err}");
                }
            }
            return next;
        }
        let child_ns = if namespace == Namespace::Svg && tag.eq_ignore_ascii_case("foreignObject") {
            Namespace::Html
        } else {
            namespace
        };
        self.open.push((element, child_ns));
        k
    }

    fn end_tag(&mut self, name: &str) {
        let matches = |doc: &Document, node: NodeRef| {
            doc.tag_name(node)
                .is_some_and(|tag| tag.eq_ignore_ascii_case(name))
        };
        if !self.open.iter().any(|(node, _)| matches(&*self.doc, *node)) {
            log::trace!(target: "dom.markup", "ignoring stray end tag </{name}>");
            return;
        }
        while let Some((node, _)) = self.open.pop() {
            if matches(&*self.doc, node) {
                break;
            }
        }
    }
}

fn scan_name(bytes: &[u8], start: usize) -> usize {
    let mut j = start;
    while j < bytes.len()
        && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'-' || bytes[j] == b'_' || bytes[j] == b':')
    {
        j += 1;
    }
    j
}

fn starts_with_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

/// Returns `(end of raw text, index past the close tag)`.
fn find_raw_text_end(input: &str, from: usize, tag: &str) -> (usize, usize) {
    let bytes = input.as_bytes();
    let mut i = from;
    while let Some(rel) = memchr(b'<', &bytes[i..]) {
        let at = i + rel;
        let name_start = at + 2;
        if bytes.get(at + 1) == Some(&b'/')
            && starts_with_ignore_ascii_case(&bytes[name_start.min(bytes.len())..], tag.as_bytes())
        {
            let after = name_start + tag.len();
            let close = memchr(b'>', &bytes[after..]).map_or(bytes.len(), |r| after + r + 1);
            return (at, close);
        }
        i = at + 1;
    }
    (bytes.len(), bytes.len())
}

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn decode_entities(input: &str) -> String {
    if memchr(b'&', input.as_bytes()).is_none() {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').filter(|semi| *semi <= 10) {
            Some(semi) => match decode_entity(&tail[1..semi]) {
                Some(ch) => {
                    out.push(ch);
                    rest = &tail[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            },
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{A0}'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_child(doc: &Document, node: NodeRef) -> NodeRef {
        let children = doc.children(node);
        assert_eq!(children.len(), 1, "expected one child");
        children[0]
    }

    #[test]
    fn parses_nested_elements_and_text() {
        let doc = parse_document(r#"<div id="a"><span>x</span></div>"#);
        let div = only_child(&doc, doc.root());
        assert_eq!(doc.tag_name(div), Some("div"));
        assert_eq!(doc.attribute(div, "id"), Some("a"));
        let span = only_child(&doc, div);
        assert_eq!(doc.text_content(span), "x");
    }

    #[test]
    fn lone_angle_bracket_merges_into_one_text_node() {
        let doc = parse_document("<p>a < b</p>");
        let p = only_child(&doc, doc.root());
        let text = only_child(&doc, p);
        assert_eq!(doc.text(text), Some("a < b"));
    }

    #[test]
    fn void_and_self_closing_elements_do_not_nest() {
        let doc = parse_document("<p><br>a<img src=x.png/>b</p>");
        let p = only_child(&doc, doc.root());
        let names: Vec<_> = doc
            .children(p)
            .iter()
            .map(|c| doc.tag_name(*c).unwrap_or("#text"))
            .collect();
        assert_eq!(names, vec!["br", "#text", "img", "#text"]);
    }

    #[test]
    fn svg_subtree_keeps_case_and_foreign_object_switches_back() {
        let doc = parse_document("<svg viewBox=\"0 0 1 1\"><linearGradient/><foreignObject><DIV></DIV></foreignObject></svg>");
        let svg = only_child(&doc, doc.root());
        let element = doc.element(svg).unwrap();
        assert_eq!(element.namespace, Namespace::Svg);
        assert_eq!(doc.attribute(svg, "viewBox"), Some("0 0 1 1"));
        let kids = doc.children(svg);
        assert_eq!(doc.tag_name(kids[0]), Some("linearGradient"));
        let div = only_child(&doc, kids[1]);
        assert_eq!(doc.tag_name(div), Some("div"));
        assert_eq!(doc.element(div).unwrap().namespace, Namespace::Html);
    }

    #[test]
    fn script_body_is_raw_text() {
        let doc = parse_document("<script>if (a < b) { x = '</div>'; }</script><p></p>");
        let kids = doc.children(doc.root());
        assert_eq!(kids.len(), 2);
        assert_eq!(doc.text_content(kids[0]), "if (a < b) { x = '</div>'; }");
    }

    #[test]
    fn entities_and_comments() {
        let doc = parse_document("<p>a &amp; b &#x41;&unknown;</p><!-- note -->");
        let kids = doc.children(doc.root());
        assert_eq!(doc.text_content(kids[0]), "a & b A&unknown;");
        assert!(matches!(doc.data(kids[1]), Some(NodeData::Comment(c)) if c == " note "));
    }

    #[test]
    fn fragment_nodes_are_detached() {
        let mut doc = Document::new();
        let nodes = parse_fragment(&mut doc, "<b>1</b><i>2</i>");
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| doc.parent(*n).is_none()));
        assert_eq!(doc.text_content(nodes[1]), "2");
    }
}
