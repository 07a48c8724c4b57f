//! BIDS-style dataset paths.
//!
//! The dataset is addressed by (subject id, task/run id, datatype = eeg) with
//! the usual naming convention:
//!
//! ```text
//! <root>/sub-01/eeg/sub-01_task-run1_eeg.edf
//! <root>/sub-01/eeg/sub-01_task-run1_events.tsv
//! ```
//!
//! The output tree mirrors the input tree under a separate root and adds a
//! flat `figures/` directory for the per-run diagnostic plots.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// One (subject, run) address within a BIDS-style tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidsPath {
    pub root: PathBuf,
    pub subject: String,
    pub task: String,
}

impl BidsPath {
    pub fn new(root: impl Into<PathBuf>, subject: &str, task: &str) -> Self {
        Self { root: root.into(), subject: subject.to_string(), task: task.to_string() }
    }

    /// `<root>/sub-<subject>/eeg`
    pub fn eeg_dir(&self) -> PathBuf {
        self.root.join(format!("sub-{}", self.subject)).join("eeg")
    }

    /// `…/sub-<subject>_task-<task>_eeg.edf`
    pub fn recording(&self) -> PathBuf {
        self.eeg_dir()
            .join(format!("sub-{}_task-{}_eeg.edf", self.subject, self.task))
    }

    /// `…/sub-<subject>_task-<task>_events.tsv`
    pub fn events(&self) -> PathBuf {
        self.eeg_dir()
            .join(format!("sub-{}_task-{}_events.tsv", self.subject, self.task))
    }

    /// Same address under a different root.
    pub fn with_root(&self, root: impl Into<PathBuf>) -> Self {
        Self::new(root, &self.subject, &self.task)
    }

    /// Create the `sub-XX/eeg` directory chain under this path's root.
    pub fn ensure_eeg_dir(&self) -> Result<PathBuf> {
        let dir = self.eeg_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;
        Ok(dir)
    }
}

/// `<output_root>/figures/<subject>_<task>_<kind>.png`
pub fn figure_path(output_root: &Path, subject: &str, task: &str, kind: &str) -> PathBuf {
    output_root
        .join("figures")
        .join(format!("{subject}_{task}_{kind}.png"))
}
