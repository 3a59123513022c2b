use crate::batcher::MutationBatcher;
use crate::config::CaptureConfig;
use crate::snapshot::Snapshotter;
use dom::{Document, NodeRef};
use mirror::{DiffBatch, Registry, SerializedNode};

/// Capture side of one mirroring session over a live document.
///
/// `start` resets identity and emits the full snapshot; each `flush` drains the
/// document's observer and reduces it to one batch.
pub struct CaptureSession {
    registry: Registry<NodeRef>,
    config: CaptureConfig,
    active: bool,
}

impl CaptureSession {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            registry: Registry::new(),
            config,
            active: false,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry<NodeRef> {
        &self.registry
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Begin observing `doc` and return its full snapshot. Restarting a running
    /// session discards all ids handed out so far.
    pub fn start(&mut self, doc: &mut Document) -> SerializedNode {
        self.registry.reset();
        doc.observe();
        let stale = doc.take_records();
        if !stale.is_empty() {
            log::debug!(target: "capture.snapshot", "discarding {} records queued before start", stale.len());
        }
        self.active = true;
        Snapshotter::new(&mut self.registry, &self.config).snapshot(doc, doc.root())
    }

    /// Reduce everything observed since the last flush. `None` when the session
    /// is not running or nothing changed.
    pub fn flush(&mut self, doc: &mut Document) -> Option<DiffBatch> {
        if !self.active {
            return None;
        }
        let records = doc.take_records();
        if records.is_empty() {
            return None;
        }
        let batch = MutationBatcher::new(&mut self.registry, &self.config).flush(doc, &records);
        (!batch.is_empty()).then_some(batch)
    }

    /// Flush what is left and stop observing.
    pub fn stop(&mut self, doc: &mut Document) -> Option<DiffBatch> {
        let last = self.flush(doc);
        doc.disconnect();
        self.active = false;
        last
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new(CaptureConfig::default())
    }
}
