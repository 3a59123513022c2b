use crate::applier::{Applier, ApplyReport, id_ceiling};
use crate::config::ReplayConfig;
use crate::error::ApplyError;
use crate::target::TreeMutator;
use core_types::NodeId;
use mirror::{DiffBatch, Recording, Registry, SerializedNode, diff_from_empty};

/// Replay side of one mirroring session: a target tree plus the registry
/// that maps wire ids onto it.
pub struct ReplaySession<T: TreeMutator> {
    tree: T,
    registry: Registry<T::Handle>,
    config: ReplayConfig,
    batches: usize,
}

impl<T: TreeMutator> ReplaySession<T> {
    pub fn new(tree: T, config: ReplayConfig) -> Self {
        Self {
            tree,
            registry: Registry::new(),
            config,
            batches: 0,
        }
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn into_tree(self) -> T {
        self.tree
    }

    pub fn registry(&self) -> &Registry<T::Handle> {
        &self.registry
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Batches applied since the last `load`.
    pub fn batches_applied(&self) -> usize {
        self.batches
    }

    /// Start over from a full snapshot: the tree is cleared, the document
    /// record's id is bound to the root and its children are rebuilt.
    pub fn load(&mut self, snapshot: &SerializedNode) -> Result<ApplyReport, ApplyError> {
        let SerializedNode::Document { id, .. } = snapshot else {
            return Err(ApplyError::NotADocument {
                found: snapshot.id(),
            });
        };
        log::debug!(target: "replay.session", "load snapshot {id} with {} nodes", snapshot.node_count());
        self.tree.clear();
        self.registry.reset();
        self.batches = 0;
        if u64::from(id.0) > id_ceiling(&self.registry, &self.config, 0) {
            return Err(ApplyError::IdentityViolation {
                report: ApplyReport::default(),
                violations: vec![*id],
            });
        }
        self.registry.bind(*id, self.tree.root())?;
        Applier::new(&mut self.tree, &mut self.registry, &self.config).apply(&diff_from_empty(snapshot))
    }

    pub fn apply(&mut self, batch: &DiffBatch) -> Result<ApplyReport, ApplyError> {
        self.batches += 1;
        log::trace!(target: "replay.session", "batch {} with {} records", self.batches, batch.len());
        Applier::new(&mut self.tree, &mut self.registry, &self.config).apply(batch)
    }

    /// Load the recording's snapshot and apply its batches in order. Identity
    /// violations are collected across batches and reported at the end.
    pub fn replay(&mut self, recording: &Recording) -> Result<ApplyReport, ApplyError> {
        let mut total = ApplyReport::default();
        let mut violations: Vec<NodeId> = Vec::new();
        let mut absorb = |result: Result<ApplyReport, ApplyError>| -> Result<(), ApplyError> {
            match result {
                Ok(report) => total += report,
                Err(ApplyError::IdentityViolation {
                    report,
                    violations: found,
                }) => {
                    total += report;
                    violations.extend(found);
                }
                Err(err) => return Err(err),
            }
            Ok(())
        };
        absorb(self.load(&recording.snapshot))?;
        for batch in &recording.batches {
            absorb(self.apply(batch))?;
        }
        log::debug!(target: "replay.session", "replayed {} batches: {total:?}", recording.batches.len());
        if violations.is_empty() {
            Ok(total)
        } else {
            Err(ApplyError::IdentityViolation {
                report: total,
                violations,
            })
        }
    }
}
