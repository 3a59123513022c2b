//! Helpers shared by the mirror integration tests: the markup fixture corpus,
//! a capture/replay pair that can be synced step by step, and tree diffs that
//! read well in a failing assertion.

pub mod corpus;
pub mod pair;

pub use crate::corpus::{CORPUS_FORMAT_V1, Fixture, fixture, load_corpus};
pub use crate::pair::{MirrorPair, assert_mirrors};

pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    use std::fmt::Write;
    let missing = "<missing>";
    let max = expected.len().max(actual.len());
    let mut out = String::new();
    let first = (0..max).find(|&i| expected.get(i) != actual.get(i));
    if let Some(i) = first {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(&mut out, "first mismatch at line {} (showing {}..={}):", i + 1, start + 1, end);
        for line in start..end {
            let left = expected.get(line).map(String::as_str).unwrap_or(missing);
            let right = actual.get(line).map(String::as_str).unwrap_or(missing);
            let marker = if line == i { ">" } else { " " };
            let _ = writeln!(&mut out, "{marker} {:>4}  source: {left}", line + 1);
            let _ = writeln!(&mut out, "{marker} {:>4}  mirror: {right}", line + 1);
        }
    }
    let _ = writeln!(&mut out, "source {} lines, mirror {} lines", expected.len(), actual.len());
    out
}
