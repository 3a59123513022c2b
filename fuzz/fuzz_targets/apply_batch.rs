#![no_main]

use dom::{Document, parse_document};
use libfuzzer_sys::fuzz_target;
use mirror::DiffBatch;
use replay::{ReplayConfig, ReplaySession};

const BASE: &str = "<main><ul><li>a</li><li>b</li></ul><p class=x>text <b>bold</b></p></main>";

fuzz_target!(|data: &[u8]| {
    let Ok(batch) = serde_json::from_slice::<DiffBatch>(data) else {
        return;
    };
    let mut source = parse_document(BASE);
    let snapshot = capture::CaptureSession::default().start(&mut source);
    let mut session = ReplaySession::new(Document::new(), ReplayConfig::default());
    if session.load(&snapshot).is_err() {
        return;
    }
    // Arbitrary batches may be rejected, never panic, and leave a well-formed tree.
    let _ = session.apply(&batch);
    let tree = session.tree();
    for node in tree.descendants(tree.root()).skip(1) {
        assert!(tree.parent(node).is_some());
    }
});
