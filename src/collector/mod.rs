//! File rotation: pick the next files for every instruction and copy them
//! into the destination folder.

pub mod candidate;
pub mod copy;
pub mod discovery;
pub mod one_level_wide;
pub mod state;
pub mod strategies;

pub use candidate::{Action, Candidate, Unit};
pub use copy::{CopyFailure, CopyReport};
pub use discovery::DiscoveryError;
pub use strategies::{Observer, Proposal, Registry, SelectionContext, Strategy};

use crate::config::{Config, Instruction};
use crate::paths::resolve_under;
use anyhow::Result;
use rand::RngCore;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default)]
pub struct CollectOptions {
    /// Select and report, but copy nothing and keep every record as is.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectorOutcome {
    pub selected: Vec<Candidate>,
    pub copied: Vec<Candidate>,
    pub failures: Vec<CopyFailure>,
    pub updated_instructions: Vec<Instruction>,
}

impl CollectorOutcome {
    /// Whether any instruction record differs from what was loaded.
    pub fn changed(&self, before: &[Instruction]) -> bool {
        self.updated_instructions.as_slice() != before
    }
}

/// Run one collection pass over every instruction in `config`.
///
/// # Errors
///
/// Fails only when `src_root` or `dest` is missing. Problems with single
/// instructions or files are logged and reported in the outcome.
pub fn run(
    config: &Config,
    registry: &Registry,
    rng: &mut dyn RngCore,
    options: &CollectOptions,
) -> Result<CollectorOutcome> {
    let roots = config.roots()?;
    let mut proposals: Vec<Option<Proposal>> = Vec::with_capacity(config.instructions.len());

    for (index, instruction) in config.instructions.iter().enumerate() {
        if instruction.disabled {
            tracing::debug!("Skipping disabled instruction '{}'", instruction.label());
            proposals.push(None);
            continue;
        }

        let files = match discovery::discover(instruction, &roots.src_root, &config.extension) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("Skipping '{}': {}", instruction.label(), e);
                proposals.push(None);
                continue;
            }
        };

        let units = if instruction.one_level_wide {
            let bases: Vec<PathBuf> = instruction
                .src
                .entries()
                .iter()
                .map(|e| resolve_under(&roots.src_root, e))
                .filter(|p| p.is_dir())
                .collect();
            one_level_wide::group_units(&files, &bases)
        } else {
            candidate::singles(&files)
        };

        let ctx = SelectionContext {
            index,
            instruction,
            files: &files,
            units: &units,
            src_root: &roots.src_root,
        };

        let mut proposal = registry.select(&ctx, rng);
        if let Some(ref mut proposal) = proposal {
            copy::materialize(
                &mut proposal.candidates,
                &proposal.instruction,
                &roots.dest,
                config.remove_initial_digits,
            );
        }
        proposals.push(proposal);
    }

    let selected: Vec<Candidate> = proposals
        .iter()
        .flatten()
        .flat_map(|p| p.candidates.iter().cloned())
        .collect();
    tracing::info!("Selected {} file(s)", selected.iter().filter(|c| c.is_copy()).count());

    if options.dry_run {
        for candidate in &selected {
            tracing::info!("[dry run] {:?} -> {:?}", candidate.src, candidate.dest);
        }
        return Ok(CollectorOutcome {
            selected,
            copied: Vec::new(),
            failures: Vec::new(),
            updated_instructions: config.instructions.clone(),
        });
    }

    let report = copy::execute(&selected);
    let updated_instructions = state::commit(&config.instructions, &proposals, &report);

    Ok(CollectorOutcome {
        selected,
        copied: report.copied,
        failures: report.failed,
        updated_instructions,
    })
}

/// Append an instruction for `path` unless one with the same source exists.
///
/// Returns whether the list changed.
pub fn add_instruction(instructions: &mut Vec<Instruction>, path: &std::path::Path) -> bool {
    let exists = instructions
        .iter()
        .any(|i| i.src.entries().iter().any(|e| *e == path));
    if exists {
        return false;
    }
    instructions.push(Instruction::new(path));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn config_for(root: &Path, dest: &Path) -> Config {
        Config {
            src_root: Some(root.to_path_buf()),
            dest: Some(dest.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_roots_is_fatal() {
        let config = Config::default();
        let result = run(
            &config,
            &Registry::default(),
            &mut StdRng::seed_from_u64(0),
            &CollectOptions::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rotation_over_three_runs() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        for name in ["a.mp4", "b.mp4", "c.mp4"] {
            fs::create_dir_all(src.path().join("Docs")).unwrap();
            fs::write(src.path().join("Docs").join(name), name).unwrap();
        }

        let mut config = config_for(src.path(), dest.path());
        config.instructions.push(Instruction::new("Docs"));
        let registry = Registry::default();
        let mut rng = StdRng::seed_from_u64(0);

        let mut delivered = Vec::new();
        for _ in 0..4 {
            let outcome = run(&config, &registry, &mut rng, &CollectOptions::default()).unwrap();
            assert!(outcome.failures.is_empty());
            delivered.push(crate::paths::basename(&outcome.copied[0].src));
            config.instructions = outcome.updated_instructions;
        }
        assert_eq!(delivered, vec!["a.mp4", "b.mp4", "c.mp4", "a.mp4"]);
        assert!(dest.path().join("c.mp4").exists());
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        fs::create_dir_all(src.path().join("Docs")).unwrap();
        fs::write(src.path().join("Docs/a.mp4"), b"x").unwrap();

        let mut config = config_for(src.path(), dest.path());
        config.instructions.push(Instruction::new("Docs"));
        let outcome = run(
            &config,
            &Registry::default(),
            &mut StdRng::seed_from_u64(0),
            &CollectOptions { dry_run: true },
        )
        .unwrap();

        assert_eq!(outcome.selected.len(), 1);
        assert_eq!(outcome.selected[0].dest, dest.path().join("a.mp4"));
        assert!(outcome.copied.is_empty());
        assert!(!outcome.changed(&config.instructions));
        assert!(!dest.path().join("a.mp4").exists());
    }

    #[test]
    fn test_bad_instruction_does_not_stop_others() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        fs::create_dir_all(src.path().join("Docs")).unwrap();
        fs::write(src.path().join("Docs/a.mp4"), b"x").unwrap();

        let mut config = config_for(src.path(), dest.path());
        config.instructions.push(Instruction::new("Missing"));
        let mut disabled = Instruction::new("Docs");
        disabled.disabled = true;
        config.instructions.push(disabled);
        config.instructions.push(Instruction::new("Docs"));

        let outcome = run(
            &config,
            &Registry::default(),
            &mut StdRng::seed_from_u64(0),
            &CollectOptions::default(),
        )
        .unwrap();
        assert_eq!(outcome.copied.len(), 1);
        assert_eq!(outcome.copied[0].instruction, 2);
        assert_eq!(outcome.updated_instructions[0], config.instructions[0]);
        assert_eq!(outcome.updated_instructions[1], config.instructions[1]);
        assert!(outcome.updated_instructions[2].last.is_some());
    }

    #[test]
    fn test_add_instruction_is_idempotent() {
        let mut instructions = vec![Instruction::new("Docs")];
        assert!(!add_instruction(&mut instructions, Path::new("Docs")));
        assert!(add_instruction(&mut instructions, Path::new("Films")));
        assert_eq!(instructions.len(), 2);
    }
}
