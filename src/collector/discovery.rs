//! Turning an instruction's `src` into an ordered file list.

use crate::config::Instruction;
use crate::paths::{has_extension, is_hidden, resolve_dest, resolve_under};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Why an instruction produced no files. The instruction is skipped.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no .{extension} files found in {src}")]
    NoMatches { src: String, extension: String },

    #[error("every file in {src} is ignored")]
    AllIgnored { src: String },

    #[error("invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Files for `instruction`, in delivery order.
///
/// Directories are walked deeply in file-name order; hidden entries and
/// files with another extension are left out, as is the
/// `move_to_when_done` folder when it sits inside the source. Explicit file
/// entries are kept as given, whatever their extension.
pub fn discover(
    instruction: &Instruction,
    src_root: &Path,
    global_extension: &str,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let extension = instruction.extension_or(global_extension);
    let ignore = instruction
        .ignore
        .as_deref()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| DiscoveryError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
        })
        .transpose()?;

    let archive = instruction
        .move_to_when_done
        .as_deref()
        .map(|to| resolve_dest(src_root, Some(to)));

    let mut files = Vec::new();
    for entry in instruction.src.entries() {
        let resolved = resolve_under(src_root, entry);
        if resolved.is_dir() {
            walk(&resolved, extension, archive.as_deref(), &mut files)?;
        } else if resolved.is_file() {
            files.push(resolved);
        } else {
            tracing::debug!("Source entry does not exist: {:?}", resolved);
        }
    }

    if files.is_empty() {
        return Err(DiscoveryError::NoMatches {
            src: instruction.label(),
            extension: extension.to_string(),
        });
    }

    if let Some(ignore) = ignore {
        files.retain(|f| !ignore.is_match(&f.to_string_lossy()));
        if files.is_empty() {
            return Err(DiscoveryError::AllIgnored {
                src: instruction.label(),
            });
        }
    }

    if let Some(batch) = instruction.breadth_batch() {
        files = breadth_first(files, batch);
    }

    Ok(files)
}

fn walk(
    dir: &Path,
    extension: &str,
    excluded: Option<&Path>,
    files: &mut Vec<PathBuf>,
) -> Result<(), DiscoveryError> {
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            (e.depth() == 0 || !is_hidden(e.path()))
                && !excluded.is_some_and(|x| e.path().starts_with(x))
        });

    for entry in walker {
        let entry = entry.map_err(|source| DiscoveryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            files.push(entry.into_path());
        }
    }
    Ok(())
}

/// Interleave files folder by folder, `batch` at a time from each.
///
/// Folders take turns in the order they first appear; files keep their
/// order within a folder.
pub fn breadth_first(files: Vec<PathBuf>, batch: usize) -> Vec<PathBuf> {
    let batch = batch.max(1);
    let mut order: Vec<PathBuf> = Vec::new();
    let mut groups: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();

    for file in files {
        let parent = file.parent().map(Path::to_path_buf).unwrap_or_default();
        groups
            .entry(parent.clone())
            .or_insert_with(|| {
                order.push(parent);
                Vec::new()
            })
            .push(file);
    }

    let mut queues: Vec<std::vec::IntoIter<PathBuf>> = order
        .iter()
        .filter_map(|dir| groups.remove(dir))
        .map(Vec::into_iter)
        .collect();

    let mut out = Vec::new();
    while !queues.is_empty() {
        for queue in queues.iter_mut() {
            out.extend(queue.by_ref().take(batch));
        }
        queues.retain(|q| !q.as_slice().is_empty());
    }
    out
}
