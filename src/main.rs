use capture::{CaptureConfig, CaptureSession};
use dom::dom_snapshot::{DomSnapshot, DomSnapshotOptions};
use dom::{Document, parse_document};
use mimalloc::MiMalloc;
use mirror::Recording;
use replay::{ApplyError, ReplayConfig, ReplaySession};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const USAGE: &str = "\
usage:
  domreplay snapshot <page.html> [--config <settings.toml>]
  domreplay replay <recording.json> [--config <settings.toml>]";

/// Optional settings file with `[capture]` and `[replay]` tables.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    capture: CaptureConfig,
    replay: ReplayConfig,
}

enum Command {
    Snapshot(PathBuf),
    Replay(PathBuf),
}

#[derive(Debug)]
enum CliError {
    Usage(String),
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
    Settings(toml::de::Error),
    Apply(ApplyError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}\n{USAGE}"),
            CliError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            CliError::Json(err) => write!(f, "invalid recording: {err}"),
            CliError::Settings(err) => write!(f, "invalid settings: {err}"),
            CliError::Apply(err) => write!(f, "replay failed: {err}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Usage(_) => None,
            CliError::Io { source, .. } => Some(source),
            CliError::Json(err) => Some(err),
            CliError::Settings(err) => Some(err),
            CliError::Apply(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Json(err)
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Settings(err)
    }
}

impl From<ApplyError> for CliError {
    fn from(err: ApplyError) -> Self {
        CliError::Apply(err)
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<(Command, Option<PathBuf>), CliError> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut args = args;
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args
                .next()
                .ok_or_else(|| CliError::Usage("--config needs a path".to_string()))?;
            config = Some(PathBuf::from(path));
        } else {
            positional.push(arg);
        }
    }
    let command = match positional.as_slice() {
        [verb, path] if verb == "snapshot" => Command::Snapshot(PathBuf::from(path)),
        [verb, path] if verb == "replay" => Command::Replay(PathBuf::from(path)),
        [] => return Err(CliError::Usage("missing command".to_string())),
        [verb, ..] => return Err(CliError::Usage(format!("unexpected arguments to `{verb}`"))),
    };
    Ok((command, config))
}

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    match path {
        Some(path) => Ok(toml::from_str(&read(path)?)?),
        None => Ok(Settings::default()),
    }
}

fn snapshot(path: &Path, settings: Settings) -> Result<(), CliError> {
    let mut doc = parse_document(&read(path)?);
    let mut session = CaptureSession::new(settings.capture);
    let record = session.start(&mut doc);
    session.stop(&mut doc);
    log::debug!(target: "domreplay", "snapshot of {} holds {} nodes", path.display(), record.node_count());
    let recording = Recording {
        snapshot: record,
        batches: Vec::new(),
    };
    println!("{}", serde_json::to_string_pretty(&recording)?);
    Ok(())
}

fn replay(path: &Path, settings: Settings) -> Result<(), CliError> {
    let recording: Recording = serde_json::from_str(&read(path)?)?;
    let mut session = ReplaySession::new(Document::new(), settings.replay);
    let report = match session.replay(&recording) {
        Ok(report) => report,
        Err(ApplyError::IdentityViolation { report, violations }) => {
            log::warn!(target: "domreplay", "{} identity violation(s) while replaying", violations.len());
            report
        }
        Err(err) => return Err(err.into()),
    };
    log::info!(
        target: "domreplay",
        "replayed {} batches: {} inserted, {} removed, {} dropped",
        session.batches_applied(),
        report.inserted,
        report.removed,
        report.dropped
    );
    let tree = session.tree().to_tree();
    println!("{}", DomSnapshot::new(&tree, DomSnapshotOptions::default()));
    Ok(())
}

fn run() -> Result<(), CliError> {
    let (command, config) = parse_args(std::env::args().skip(1))?;
    let settings = load_settings(config.as_deref())?;
    match command {
        Command::Snapshot(path) => snapshot(&path, settings),
        Command::Replay(path) => replay(&path, settings),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("domreplay: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_commands_and_config_flag() {
        let (command, config) = parse_args(args(&["replay", "run.json", "--config", "s.toml"])).unwrap();
        assert!(matches!(command, Command::Replay(p) if p == Path::new("run.json")));
        assert_eq!(config, Some(PathBuf::from("s.toml")));

        let (command, config) = parse_args(args(&["snapshot", "page.html"])).unwrap();
        assert!(matches!(command, Command::Snapshot(_)));
        assert_eq!(config, None);
    }

    #[test]
    fn rejects_bad_invocations() {
        assert!(matches!(parse_args(args(&[])), Err(CliError::Usage(_))));
        assert!(matches!(parse_args(args(&["render", "x"])), Err(CliError::Usage(_))));
        assert!(matches!(parse_args(args(&["replay"])), Err(CliError::Usage(_))));
        assert!(matches!(parse_args(args(&["replay", "x", "--config"])), Err(CliError::Usage(_))));
    }

    #[test]
    fn settings_tables_are_optional() {
        let settings: Settings = toml::from_str("[replay]\nmax_requeues = 3\n").unwrap();
        assert_eq!(settings.replay.max_requeues, Some(3));
        assert!(settings.replay.release_removed);
        assert!(settings.capture.neutralize_scripts);
    }
}
