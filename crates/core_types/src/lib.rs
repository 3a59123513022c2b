//! Small shared types used on both ends of the mirror pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Session-scoped identifier for one mirrored node.
///
/// Ids are handed out by the identity registry starting at 1 and are never
/// recycled while the registry lives. `NodeId::INVALID` is never assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Reserved sentinel for "unassigned/invalid" identity.
    pub const INVALID: NodeId = NodeId(0);

    /// First id a fresh registry hands out.
    pub const FIRST: NodeId = NodeId(1);

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element namespace. Only the distinction that changes tag-case and
/// attribute rules is tracked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    #[default]
    Html,
    Svg,
}

impl Namespace {
    /// HTML element names are canonical ASCII-lowercase; SVG names keep their case
    /// (`foreignObject`, `linearGradient`).
    pub fn canonical_name(self, name: &str) -> String {
        match self {
            Namespace::Html => name.to_ascii_lowercase(),
            Namespace::Svg => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_id_is_not_valid() {
        assert!(!NodeId::INVALID.is_valid());
        assert!(NodeId::FIRST.is_valid());
    }

    #[test]
    fn canonical_name_depends_on_namespace() {
        assert_eq!(Namespace::Html.canonical_name("DIV"), "div");
        assert_eq!(
            Namespace::Svg.canonical_name("foreignObject"),
            "foreignObject"
        );
    }
}
