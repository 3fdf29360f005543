//! Lossless split and join planning, executed through ffmpeg and HandBrake.

pub mod normalise;
pub mod planner;
pub mod sequencer;

pub use sequencer::{CommandQueue, Sequencer};

use crate::config::{expand_path, Config};
use anyhow::{Context, Result};
use mandolin_av::{run_queue, MediaCommand, ProcessRunner, Workspace};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default)]
pub struct EditOptions {
    /// Plan and print the commands without running them.
    pub dry_run: bool,
}

/// Something from one edit instruction that could not be done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditFailure {
    pub instruction: usize,
    pub cmd: &'static str,
    pub label: String,
    pub reason: String,
}

impl EditFailure {
    pub fn new(
        instruction: usize,
        cmd: &'static str,
        label: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            instruction,
            cmd,
            label: label.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EditorOutcome {
    pub planned: Vec<CommandQueue>,
    pub commands_executed: Vec<MediaCommand>,
    pub failures: Vec<EditFailure>,
}

/// Plan every edit in `config`, then run the queues one after the other.
///
/// A fatal command aborts the rest of its own queue only.
///
/// # Errors
///
/// Fails when `src_root` or `dest` is missing, a stderr pattern is invalid,
/// or the intermediates directory cannot be created.
pub fn run<R: ProcessRunner + ?Sized>(
    config: &Config,
    runner: &R,
    options: &EditOptions,
) -> Result<EditorOutcome> {
    let roots = config.roots()?;
    let classifier = config.classifier()?;
    let temp_dir = config.editor.temp_dir.as_deref().map(expand_path);
    let workspace = Workspace::new(temp_dir.as_deref())
        .context("Failed to prepare the intermediates directory")?;
    tracing::debug!("Intermediates go to {:?}", workspace.path());
    if temp_dir.is_some() && !options.dry_run {
        match workspace.clear_intermediates() {
            Ok(0) => {}
            Ok(n) => tracing::info!("Removed {} stale intermediate(s)", n),
            Err(e) => tracing::warn!("Failed to clear old intermediates: {}", e),
        }
    }

    let mut failures = Vec::new();
    let mut planned = Vec::new();
    {
        let mut sequencer = Sequencer::new(config, &roots, &workspace);
        for (index, edit) in config.edits.iter().enumerate() {
            planned.extend(sequencer.plan(index, edit, runner, &mut failures));
        }
        tracing::debug!("Intermediates: {:?}", sequencer.intermediate_names());
    }

    let total: usize = planned.iter().map(|q| q.commands.len()).sum();
    tracing::info!("Planned {} command(s) in {} queue(s)", total, planned.len());

    if options.dry_run {
        for queue in &planned {
            for command in &queue.commands {
                tracing::info!("[dry run] {}", command);
            }
        }
        return Ok(EditorOutcome {
            planned,
            commands_executed: Vec::new(),
            failures,
        });
    }

    let mut commands_executed = Vec::new();
    for queue in &planned {
        let dirs = queue
            .commands
            .iter()
            .filter_map(|c| c.args().last())
            .filter_map(|dest| std::path::Path::new(dest).parent());
        for dir in dirs {
            if let Err(e) = std::fs::create_dir_all(dir) {
                tracing::warn!("Failed to create {:?}: {}", dir, e);
            }
        }

        let report = run_queue(runner, &classifier, &queue.commands);
        if report.is_success() {
            tracing::debug!("{} done", queue.label);
        }
        commands_executed.extend(report.executed);
        if let Some((command, reason)) = report.fatal {
            tracing::error!("{} aborted after {}: {}", queue.label, command.tool_name(), reason);
            failures.push(EditFailure::new(
                queue.instruction,
                config
                    .edits
                    .get(queue.instruction)
                    .map(|e| e.name())
                    .unwrap_or("unknown"),
                queue.label.clone(),
                format!("{} ({} command(s) skipped)", reason, report.skipped.len()),
            ));
        }
    }

    Ok(EditorOutcome {
        planned,
        commands_executed,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use mandolin_av::ProcessOutput;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    /// Fails every command whose output path contains `poison`.
    struct Recorder {
        poison: &'static str,
        seen: RefCell<Vec<MediaCommand>>,
    }

    impl ProcessRunner for Recorder {
        fn run(&self, command: &MediaCommand) -> mandolin_av::Result<ProcessOutput> {
            self.seen.borrow_mut().push(command.clone());
            let poisoned = command.args().iter().any(|a| a.contains(self.poison));
            Ok(ProcessOutput {
                code: Some(if poisoned { 1 } else { 0 }),
                stdout: String::new(),
                stderr: if poisoned {
                    "Conversion failed!".to_string()
                } else {
                    "frame= 100 fps=50".to_string()
                },
            })
        }
    }

    fn config(extra: &str) -> (tempfile::TempDir, tempfile::TempDir, Config) {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        fs::write(src.path().join("a.mp4"), b"x").unwrap();
        fs::write(src.path().join("b.mp4"), b"x").unwrap();
        let text = format!(
            "src_root = {:?}\ndest = {:?}\n{}",
            src.path().display().to_string(),
            dest.path().display().to_string(),
            extra
        );
        let config = parse_config(&text).unwrap();
        (src, dest, config)
    }

    #[test]
    fn test_fatal_command_aborts_only_its_queue() {
        let (_src, _dest, config) = config(
            "[[edits]]\ncmd = \"convert\"\nsrc = [\"a.mp4\", \"b.mp4\"]\n\n[[edits]]\ncmd = \"mp3\"\nsrc = \"b.mp4\"\n",
        );
        let runner = Recorder {
            poison: "a.mp4",
            seen: RefCell::new(Vec::new()),
        };

        let outcome = run(&config, &runner, &EditOptions::default()).unwrap();
        assert_eq!(outcome.planned.len(), 3);
        assert_eq!(outcome.commands_executed.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].cmd, "convert");
        assert!(outcome.failures[0].reason.contains("Conversion failed!"));
        assert_eq!(runner.seen.borrow().len(), 3);
    }

    #[test]
    fn test_dry_run_executes_nothing() {
        let (_src, _dest, config) = config("[[edits]]\ncmd = \"mp3\"\nsrc = \"a.mp4\"\n");
        let runner = Recorder {
            poison: "never",
            seen: RefCell::new(Vec::new()),
        };

        let outcome = run(&config, &runner, &EditOptions { dry_run: true }).unwrap();
        assert_eq!(outcome.planned.len(), 1);
        assert!(outcome.commands_executed.is_empty());
        assert!(runner.seen.borrow().is_empty());
    }

    #[test]
    fn test_missing_roots_is_fatal() {
        let config = parse_config("[[edits]]\ncmd = \"mp3\"\nsrc = \"a.mp4\"\n").unwrap();
        let runner = Recorder {
            poison: "never",
            seen: RefCell::new(Vec::new()),
        };
        assert!(run(&config, &runner, &EditOptions::default()).is_err());
    }
}
