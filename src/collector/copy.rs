//! Resolving candidate destinations and carrying out copies and moves.

use super::candidate::{Action, Candidate};
use crate::config::Instruction;
use crate::paths::{basename, resolve_dest, strip_initial_digits};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

/// A candidate that could not be delivered.
#[derive(Debug, Clone, Serialize)]
pub struct CopyFailure {
    pub candidate: Candidate,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyReport {
    pub copied: Vec<Candidate>,
    pub failed: Vec<CopyFailure>,
}

impl CopyReport {
    /// Whether `candidate` was delivered in this batch.
    pub fn delivered(&self, candidate: &Candidate) -> bool {
        self.copied.iter().any(|c| c == candidate)
    }
}

/// Turn file-name destinations into absolute paths.
///
/// Copies land in the instruction's `dest` (relative to `dest_root` unless
/// absolute), moves in their target folder under the original name.
pub fn materialize(
    candidates: &mut [Candidate],
    instruction: &Instruction,
    dest_root: &Path,
    remove_initial_digits: bool,
) {
    let dest_dir = resolve_dest(dest_root, instruction.dest.as_deref());
    let strip = instruction
        .remove_initial_digits
        .unwrap_or(remove_initial_digits);

    for candidate in candidates.iter_mut() {
        let name = basename(&candidate.src);
        candidate.dest = match candidate.action {
            Action::Copy if strip => dest_dir.join(strip_initial_digits(&name)),
            Action::Copy => dest_dir.join(name),
            Action::Move { ref to } => to.join(name),
        };
    }
}

/// Deliver every candidate in order. Failures are logged and collected;
/// the batch always runs to the end.
pub fn execute(candidates: &[Candidate]) -> CopyReport {
    let mut report = CopyReport::default();

    for candidate in candidates {
        let result = match candidate.action {
            Action::Copy => {
                tracing::info!("Copying {:?} to {:?}", candidate.src, candidate.dest);
                copy_file(&candidate.src, &candidate.dest)
            }
            Action::Move { .. } => {
                let copy_failed = report.failed.iter().any(|f| {
                    f.candidate.is_copy()
                        && f.candidate.src == candidate.src
                        && f.candidate.instruction == candidate.instruction
                });
                if copy_failed {
                    tracing::warn!("Not moving {:?}: its copy failed", candidate.src);
                    continue;
                }
                tracing::info!("Moving {:?} to {:?}", candidate.src, candidate.dest);
                move_file(&candidate.src, &candidate.dest)
            }
        };

        match result {
            Ok(()) => report.copied.push(candidate.clone()),
            Err(e) => {
                tracing::error!("Failed to deliver {:?}: {}", candidate.src, e);
                report.failed.push(CopyFailure {
                    candidate: candidate.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    report
}

fn ensure_parent(dest: &Path) -> io::Result<()> {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn copy_file(src: &Path, dest: &Path) -> io::Result<()> {
    if same_file(src, dest) {
        return Ok(());
    }
    ensure_parent(dest)?;
    fs::copy(src, dest)?;
    Ok(())
}

fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    if same_file(src, dest) {
        return Ok(());
    }
    ensure_parent(dest)?;
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems
    fs::copy(src, dest)?;
    fs::remove_file(src)
}
