use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CORPUS_FORMAT_V1: &str = "mirror-corpus-v1";

/// One named markup document used to seed round-trip tests.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Fixture {
    pub name: String,
    pub markup: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CorpusManifest {
    format: String,
    #[serde(rename = "fixture")]
    fixtures: Vec<Fixture>,
}

pub fn corpus_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join("corpus.toml")
}

pub fn load_corpus() -> Vec<Fixture> {
    let path = corpus_path();
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read fixture corpus {path:?}: {err}"));
    let manifest: CorpusManifest = toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse fixture corpus {path:?}: {err}"));
    assert_eq!(
        manifest.format, CORPUS_FORMAT_V1,
        "unsupported corpus format in {path:?}"
    );
    let mut seen = std::collections::BTreeSet::new();
    for fixture in &manifest.fixtures {
        assert!(
            seen.insert(fixture.name.as_str()),
            "duplicate fixture name in {path:?}: {}",
            fixture.name
        );
    }
    manifest.fixtures
}

pub fn fixture(name: &str) -> Fixture {
    load_corpus()
        .into_iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no fixture named '{name}' in {:?}", corpus_path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_loads_and_names_are_unique() {
        let corpus = load_corpus();
        assert!(corpus.len() >= 5);
        assert!(corpus.iter().all(|f| !f.markup.trim().is_empty()));
        assert_eq!(fixture("article").name, "article");
    }
}
