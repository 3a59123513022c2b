use crate::diff_lines;
use capture::{CaptureConfig, CaptureSession};
use dom::dom_snapshot::{DomSnapshot, DomSnapshotOptions, compare_dom};
use dom::{Document, parse_document};
use mirror::Recording;
use replay::{ApplyError, ApplyReport, ReplayConfig, ReplaySession};

/// A live source document wired to a replayed copy of itself.
///
/// Mutate `source`, then call [`MirrorPair::sync`] to ship one batch across.
/// Everything shipped is also kept in `recording`.
pub struct MirrorPair {
    pub source: Document,
    pub capture: CaptureSession,
    pub replay: ReplaySession<Document>,
    pub recording: Recording,
}

impl MirrorPair {
    pub fn new(markup: &str) -> Self {
        Self::with_config(markup, CaptureConfig::default(), ReplayConfig::default())
    }

    pub fn with_config(markup: &str, capture: CaptureConfig, replay: ReplayConfig) -> Self {
        let mut source = parse_document(markup);
        let mut capture = CaptureSession::new(capture);
        let snapshot = capture.start(&mut source);
        let mut replay = ReplaySession::new(Document::new(), replay);
        replay
            .load(&snapshot)
            .unwrap_or_else(|err| panic!("initial snapshot failed to load: {err}"));
        Self {
            source,
            capture,
            replay,
            recording: Recording {
                snapshot,
                batches: Vec::new(),
            },
        }
    }

    pub fn target(&self) -> &Document {
        self.replay.tree()
    }

    /// Flush the source and apply the batch, if any.
    pub fn try_sync(&mut self) -> Result<Option<ApplyReport>, ApplyError> {
        let Some(batch) = self.capture.flush(&mut self.source) else {
            return Ok(None);
        };
        let report = self.replay.apply(&batch);
        self.recording.batches.push(batch);
        report.map(Some)
    }

    pub fn sync(&mut self) -> ApplyReport {
        match self.try_sync() {
            Ok(report) => report.unwrap_or_default(),
            Err(err) => panic!("batch failed to apply: {err}"),
        }
    }

    pub fn assert_in_sync(&self) {
        assert_mirrors(&self.source, self.target());
    }
}

/// Panics with a line diff when `target` does not mirror `source`.
pub fn assert_mirrors(source: &Document, target: &Document) {
    let options = DomSnapshotOptions::default();
    let expected = source.to_tree();
    let actual = target.to_tree();
    if let Err(mismatch) = compare_dom(&expected, &actual, options) {
        let expected_lines = DomSnapshot::new(&expected, options);
        let actual_lines = DomSnapshot::new(&actual, options);
        panic!(
            "mirror diverged from source: {mismatch}\n{}",
            diff_lines(expected_lines.as_lines(), actual_lines.as_lines())
        );
    }
}
