//! Path helpers shared by the collector and the editor.

use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

static INITIAL_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[\s.\-_]+").unwrap());

/// Resolve a configured entry against `root`.
///
/// Absolute entries that exist are used as they are; anything else is
/// treated as relative to the root, with leading separators trimmed.
pub fn resolve_under(root: &Path, entry: &Path) -> PathBuf {
    if entry.is_absolute() && entry.exists() {
        return entry.to_path_buf();
    }
    let relative: PathBuf = entry
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    root.join(relative)
}

/// Resolve a destination: absolute paths win, otherwise relative to `base`.
pub fn resolve_dest(base: &Path, dest: Option<&Path>) -> PathBuf {
    match dest {
        Some(d) if d.is_absolute() => d.to_path_buf(),
        Some(d) => base.join(d),
        None => base.to_path_buf(),
    }
}

/// Whether the final component starts with a dot.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

/// Case-insensitive extension check; `ext` may carry a leading dot.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    let ext = ext.trim_start_matches('.');
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

/// Drop a leading track number such as `"01 - "` or `"3."` from a file name.
///
/// Names made only of digits are left alone.
pub fn strip_initial_digits(name: &str) -> String {
    let path = Path::new(name);
    let stem = stem(path);
    let stripped = INITIAL_DIGITS_RE.replace(&stem, "");
    if stripped.is_empty() || stripped.len() == stem.len() {
        return name.to_string();
    }
    match path.extension() {
        Some(ext) => format!("{}.{}", stripped, ext.to_string_lossy()),
        None => stripped.into_owned(),
    }
}

/// File name as a string, empty when the path has none.
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// File stem as a string, empty when the path has none.
pub fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Stable identifier recorded in instruction history.
pub fn history_id(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
