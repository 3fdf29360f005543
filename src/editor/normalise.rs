//! Resolving edit instructions against the configured roots.

use crate::config::{RepeatType, SourceSpec};
use crate::paths::{is_hidden, resolve_under};
use std::path::{Path, PathBuf};

/// Source files of an edit, in order.
///
/// Entries are resolved against `src_root`; directories stand for their
/// non-hidden files, sorted by name. Missing entries are dropped with a
/// warning.
pub fn expand_sources(spec: &SourceSpec, src_root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in spec.entries() {
        let resolved = resolve_under(src_root, entry);
        if resolved.is_dir() {
            match list_dir(&resolved) {
                Ok(mut children) => files.append(&mut children),
                Err(e) => tracing::warn!("Failed to read {:?}: {}", resolved, e),
            }
        } else if resolved.is_file() {
            files.push(resolved);
        } else {
            tracing::warn!("Source does not exist: {:?}", resolved);
        }
    }
    files
}

fn list_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && !is_hidden(&path) {
            children.push(path);
        }
    }
    children.sort();
    Ok(children)
}

/// Duplicate `items` for a join's `repeat` count.
///
/// ```
/// use mandolin::config::RepeatType;
/// use mandolin::editor::normalise::repeat_sources;
///
/// let items = vec!["a", "b"];
/// assert_eq!(repeat_sources(&items, 2, RepeatType::Each), vec!["a", "a", "b", "b"]);
/// assert_eq!(repeat_sources(&items, 2, RepeatType::Whole), vec!["a", "b", "a", "b"]);
/// ```
pub fn repeat_sources<T: Clone>(items: &[T], repeat: usize, kind: RepeatType) -> Vec<T> {
    let repeat = repeat.max(1);
    match kind {
        RepeatType::Each => items
            .iter()
            .flat_map(|item| std::iter::repeat(item.clone()).take(repeat))
            .collect(),
        RepeatType::Whole => {
            let mut out = Vec::with_capacity(items.len() * repeat);
            for _ in 0..repeat {
                out.extend_from_slice(items);
            }
            out
        }
    }
}

/// `name` with `.ext` appended unless it already ends that way.
pub fn with_extension(name: &str, ext: &str) -> String {
    let suffix = format!(".{}", ext.trim_start_matches('.'));
    if name.to_ascii_lowercase().ends_with(&suffix.to_ascii_lowercase()) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

/// Extension of `src`, `mp4` when it has none.
pub fn source_extension(src: &Path) -> String {
    src.extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "mp4".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_directories_expand_sorted() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("clips/sub")).unwrap();
        fs::write(root.join("clips/b.mp4"), b"").unwrap();
        fs::write(root.join("clips/a.mp4"), b"").unwrap();
        fs::write(root.join("clips/.DS_Store"), b"").unwrap();
        fs::write(root.join("single.mkv"), b"").unwrap();

        let spec = SourceSpec::Many(vec![
            PathBuf::from("single.mkv"),
            PathBuf::from("clips"),
            PathBuf::from("missing.mp4"),
        ]);
        assert_eq!(
            expand_sources(&spec, root),
            vec![
                root.join("single.mkv"),
                root.join("clips/a.mp4"),
                root.join("clips/b.mp4"),
            ]
        );
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension("Film # 1", "mp4"), "Film # 1.mp4");
        assert_eq!(with_extension("Film.MP4", "mp4"), "Film.MP4");
        assert_eq!(with_extension("Film", ".mkv"), "Film.mkv");
    }

    #[test]
    fn test_repeat_once_is_identity() {
        assert_eq!(repeat_sources(&[1, 2, 3], 1, RepeatType::Each), vec![1, 2, 3]);
        assert_eq!(repeat_sources(&[1, 2], 0, RepeatType::Whole), vec![1, 2]);
    }
}
