//! Snapshot workspace.
//!
//! A workspace is a directory tree that collects every artifact produced by
//! monitoring runs:
//!
//! ```text
//! <root>/snapshots/<timestamp>/<reports|tests>/<combination key>/...
//! ```
//!
//! The workspace is an ordinary value. Callers open it once, pass it by
//! reference to the engine that writes into it, and call [`SnapshotWorkspace::reload`]
//! when they need the run listing to reflect what is on disk.

use crate::stratify::Operation;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SNAPSHOT_DIR: &str = "snapshots";

#[derive(Debug)]
pub struct SnapshotWorkspace {
    root: PathBuf,
    runs: Vec<String>,
}

impl SnapshotWorkspace {
    /// Opens the workspace at `root`, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let mut workspace = Self {
            root: root.into(),
            runs: Vec::new(),
        };
        workspace.reload()?;
        Ok(workspace)
    }

    /// Re-creates the directory layout if it vanished and rescans the runs.
    pub fn reload(&mut self) -> io::Result<()> {
        let snapshots = self.root.join(SNAPSHOT_DIR);
        fs::create_dir_all(&snapshots)?;

        let mut runs = Vec::new();
        for entry in fs::read_dir(&snapshots)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                runs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        runs.sort_by(|a, b| natord::compare(a, b));
        log::debug!(
            "Workspace {} holds {} snapshot runs",
            self.root.display(),
            runs.len()
        );
        self.runs = runs;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run timestamps found at the last reload, in natural order.
    pub fn runs(&self) -> &[String] {
        &self.runs
    }

    /// Directory receiving the artifacts of one combination.
    pub fn snapshot_dir(&self, timestamp: &str, operation: Operation, key: &str) -> PathBuf {
        self.root
            .join(SNAPSHOT_DIR)
            .join(sanitize_component(timestamp))
            .join(operation.folder())
            .join(sanitize_component(key))
    }
}

/// Keys are built from raw categorical values. Path separators are
/// percent-encoded, along with `%` itself, so distinct keys never share a
/// directory.
fn sanitize_component(component: &str) -> String {
    match component {
        "" => return "%".to_string(),
        "." => return "%2E".to_string(),
        ".." => return "%2E%2E".to_string(),
        _ => {}
    }
    let mut encoded = String::with_capacity(component.len());
    for c in component.chars() {
        match c {
            '%' => encoded.push_str("%25"),
            '/' => encoded.push_str("%2F"),
            '\\' => encoded.push_str("%5C"),
            ':' => encoded.push_str("%3A"),
            '\0' => encoded.push_str("%00"),
            other => encoded.push(other),
        }
    }
    encoded
}
