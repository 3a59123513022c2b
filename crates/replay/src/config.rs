use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Requeue allowance per batch. `None` uses [`crate::retry_budget`] of the
    /// worklist length.
    pub max_requeues: Option<usize>,
    /// Free removed subtrees that are still detached once the batch is applied.
    pub release_removed: bool,
    /// How far past the registry's next id a new node id may land. Capture
    /// leaves gaps for nodes that never shipped; ids beyond the allowance are
    /// treated as identity violations.
    pub max_id_gap: u32,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_requeues: None,
            release_removed: true,
            max_id_gap: 1 << 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: ReplayConfig = serde_json::from_str(r#"{ "max_requeues": 4 }"#).unwrap();
        assert_eq!(config.max_requeues, Some(4));
        assert!(config.release_removed);
        assert_eq!(config.max_id_gap, ReplayConfig::default().max_id_gap);
    }
}
