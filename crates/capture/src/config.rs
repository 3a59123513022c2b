use serde::{Deserialize, Serialize};

/// Normalization applied while serializing the live tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Rewrite `<script>` to an inert `<noscript>` and flag it.
    pub neutralize_scripts: bool,
    /// Drop `on*` attributes from snapshots and attribute records.
    pub strip_event_handlers: bool,
    /// Whitespace-only text is never serialized and never gets an id.
    pub drop_blank_text: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            neutralize_scripts: true,
            strip_event_handlers: true,
            drop_blank_text: true,
        }
    }
}
