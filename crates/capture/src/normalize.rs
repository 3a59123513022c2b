use crate::config::CaptureConfig;
use core_types::Namespace;
use dom::{Document, ElementData, NodeData, NodeRef};

/// Tag that replaces neutralized script elements.
pub const INERT_TAG: &str = "noscript";

/// ASCII whitespace as the HTML parser sees it.
pub(crate) fn is_blank(text: &str) -> bool {
    text.bytes()
        .all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C'))
}

/// Text that the capture side neither serializes nor tracks.
pub(crate) fn is_ignorable(doc: &Document, node: NodeRef, config: &CaptureConfig) -> bool {
    config.drop_blank_text && matches!(doc.data(node), Some(NodeData::Text(text)) if is_blank(text))
}

pub(crate) fn is_event_handler(name: &str) -> bool {
    name.len() > 2 && name.as_bytes()[..2].eq_ignore_ascii_case(b"on")
}

pub(crate) fn keeps_attribute(config: &CaptureConfig, name: &str) -> bool {
    !(config.strip_event_handlers && is_event_handler(name))
}

/// Serialized tag and inert flag for an element.
pub(crate) fn serialized_tag(element: &ElementData, config: &CaptureConfig) -> (String, bool) {
    if config.neutralize_scripts && element.is_html("script") {
        (INERT_TAG.to_string(), true)
    } else {
        (element.name.to_string(), false)
    }
}

/// SVG content is told apart by namespace alone; an HTML-namespace element
/// placed under `<svg>` stays HTML.
pub(crate) fn is_svg_element(element: &ElementData) -> bool {
    element.namespace == Namespace::Svg
}
