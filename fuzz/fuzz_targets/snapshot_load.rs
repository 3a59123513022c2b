#![no_main]

use dom::{Document, parse_document};
use libfuzzer_sys::fuzz_target;
use replay::{ReplayConfig, ReplaySession};

fuzz_target!(|data: &[u8]| {
    let Ok(markup) = std::str::from_utf8(data) else {
        return;
    };
    let mut source = parse_document(markup);
    let snapshot = capture::CaptureSession::default().start(&mut source);
    let mut session = ReplaySession::new(Document::new(), ReplayConfig::default());
    let report = session.load(&snapshot).expect("captured snapshots always load");
    assert_eq!(report.dropped, 0);
    assert_eq!(session.registry().len(), snapshot.node_count());
});
