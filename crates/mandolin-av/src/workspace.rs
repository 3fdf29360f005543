//! Scratch space for transport-stream intermediates.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Directory holding the intermediates of one editing run.
///
/// Either a configured directory, which is created if needed and left in
/// place afterwards, or a fresh temporary directory removed on drop.
///
/// # Example
///
/// ```
/// use mandolin_av::Workspace;
///
/// let workspace = Workspace::temporary()?;
/// let ts = workspace.intermediate("intro 1");
/// assert!(ts.starts_with(workspace.path()));
/// assert!(ts.to_string_lossy().ends_with("intro 1.ts"));
/// # Ok::<(), mandolin_av::Error>(())
/// ```
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    _temp: Option<TempDir>,
}

impl Workspace {
    /// A fresh temporary directory.
    pub fn temporary() -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("mandolin-")
            .tempdir()
            .map_err(|e| Error::Workspace(e.to_string()))?;
        Ok(Self {
            root: temp.path().to_path_buf(),
            _temp: Some(temp),
        })
    }

    /// Use `dir`, creating it when missing.
    pub fn at<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::Workspace(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        Ok(Self {
            root: dir.to_path_buf(),
            _temp: None,
        })
    }

    /// Configured directory if given, otherwise a temporary one.
    pub fn new(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Self::at(dir),
            None => Self::temporary(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path of a scratch file with the given name.
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Path of the transport-stream intermediate for `reference`.
    pub fn intermediate(&self, reference: &str) -> PathBuf {
        self.root.join(format!("{}.ts", reference))
    }

    /// Remove leftover intermediates from an earlier run.
    pub fn clear_intermediates(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "ts") {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
