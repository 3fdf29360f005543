use serde::Serialize;
use std::path::{Path, PathBuf};

/// What to do with a selected file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Copy,
    /// Move the source out of the rotation once its copy succeeded.
    Move { to: PathBuf },
}

/// A file chosen this run, not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Index of the producing instruction in the run's instruction list.
    pub instruction: usize,
    pub src: PathBuf,
    /// File name until materialized, absolute path after.
    pub dest: PathBuf,
    pub is_last: bool,
    pub action: Action,
}

impl Candidate {
    pub fn copy(instruction: usize, src: &Path) -> Self {
        Self {
            instruction,
            src: src.to_path_buf(),
            dest: src.file_name().map(PathBuf::from).unwrap_or_default(),
            is_last: false,
            action: Action::Copy,
        }
    }

    pub fn relocate(instruction: usize, src: &Path, to: &Path) -> Self {
        Self {
            instruction,
            src: src.to_path_buf(),
            dest: src.file_name().map(PathBuf::from).unwrap_or_default(),
            is_last: false,
            action: Action::Move { to: to.to_path_buf() },
        }
    }

    pub fn is_copy(&self) -> bool {
        self.action == Action::Copy
    }
}

/// What a strategy picks: one file, or a series delivered together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    files: Vec<PathBuf>,
}

impl Unit {
    pub fn single(file: PathBuf) -> Self {
        Self { files: vec![file] }
    }

    /// `files` must not be empty.
    pub fn series(files: Vec<PathBuf>) -> Self {
        debug_assert!(!files.is_empty());
        Self { files }
    }

    /// The unit's identifier: its first file.
    pub fn id(&self) -> &Path {
        &self.files[0]
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f == path)
    }

    pub fn is_series(&self) -> bool {
        self.files.len() > 1
    }
}

/// Every file its own unit.
pub fn singles(files: &[PathBuf]) -> Vec<Unit> {
    files.iter().cloned().map(Unit::single).collect()
}
