//! Turning edit instructions into queues of external commands.

use super::normalise::{expand_sources, repeat_sources, source_extension, with_extension};
use super::planner::{generate_cuts, name_segments, section_cuts, Segment};
use super::EditFailure;
use crate::config::{Config, EditInstruction, JoinEdit, MediaEdit, Roots, SplitEdit};
use crate::paths::{resolve_dest, resolve_under, stem};
use mandolin_av::{probe_duration, MediaCommand, ProcessRunner, Toolbox, Workspace};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Commands that succeed or fail together, run strictly in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandQueue {
    /// Index of the edit instruction that produced the queue.
    pub instruction: usize,
    pub label: String,
    pub commands: Vec<MediaCommand>,
}

/// Plans every edit of a run, tracking the intermediates earlier splits
/// register so later joins can refer to them.
pub struct Sequencer<'a> {
    config: &'a Config,
    roots: &'a Roots,
    tools: Toolbox,
    workspace: &'a Workspace,
    intermediates: Vec<(String, PathBuf)>,
    shared_converted: HashSet<String>,
    produced: HashSet<PathBuf>,
}

impl<'a> Sequencer<'a> {
    pub fn new(config: &'a Config, roots: &'a Roots, workspace: &'a Workspace) -> Self {
        Self {
            config,
            roots,
            tools: config.toolbox(),
            workspace,
            intermediates: Vec::new(),
            shared_converted: HashSet::new(),
            produced: HashSet::new(),
        }
    }

    /// Names of the intermediates registered so far, in order.
    pub fn intermediate_names(&self) -> Vec<&str> {
        self.intermediates.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Queues for one edit. Problems abandon only the affected source or
    /// instruction and are pushed onto `failures`.
    pub fn plan<R: ProcessRunner + ?Sized>(
        &mut self,
        index: usize,
        edit: &EditInstruction,
        runner: &R,
        failures: &mut Vec<EditFailure>,
    ) -> Vec<CommandQueue> {
        match edit {
            EditInstruction::Split(split) => self.plan_split(index, split, runner, failures),
            EditInstruction::Join(join) => match self.plan_join(index, join) {
                Ok(queue) => vec![queue],
                Err(reason) => {
                    failures.push(EditFailure::new(index, edit.name(), "join", reason));
                    Vec::new()
                }
            },
            EditInstruction::Convert(media) => {
                self.plan_each(index, edit.name(), media, "mp4", |tools, src, dest| {
                    tools.mp4(src, dest)
                })
            }
            EditInstruction::Extract(media) => {
                let ext = self.config.editor.audio_extension.clone();
                self.plan_each(index, edit.name(), media, &ext, |tools, src, dest| {
                    tools.extract_audio(src, dest)
                })
            }
            EditInstruction::Mp3(media) => {
                self.plan_each(index, edit.name(), media, "mp3", |tools, src, dest| {
                    tools.mp3(src, dest)
                })
            }
            EditInstruction::Unknown => {
                tracing::warn!("Skipping edit {}: unknown cmd", index + 1);
                Vec::new()
            }
        }
    }

    fn plan_split<R: ProcessRunner + ?Sized>(
        &mut self,
        index: usize,
        split: &SplitEdit,
        runner: &R,
        failures: &mut Vec<EditFailure>,
    ) -> Vec<CommandQueue> {
        let sources = expand_sources(&split.src, &self.roots.src_root);
        if sources.is_empty() {
            failures.push(EditFailure::new(index, "split", "split", "no source files found"));
            return Vec::new();
        }

        let backtrack: Duration = split.backtrack.unwrap_or(self.config.backtrack).into();
        let dest_dir = resolve_dest(&self.roots.dest, split.dest.as_deref());
        let mut queues = Vec::new();

        for src in sources {
            let cuts = if split.sections.is_empty() {
                match probe_duration(runner, &self.tools, &src) {
                    Ok(total) => {
                        tracing::info!(
                            "{:?} runs for {}",
                            src,
                            mandolin_av::format_timecode(total)
                        );
                        generate_cuts(total, split.duration.map(Into::into), split.segments, backtrack)
                    }
                    Err(e) => {
                        failures.push(EditFailure::new(
                            index,
                            "split",
                            src.display().to_string(),
                            format!("could not read duration: {}", e),
                        ));
                        continue;
                    }
                }
            } else {
                section_cuts(&split.sections, backtrack)
            };

            let segments = name_segments(split, &src, &cuts, self.config.prepend_with_digits);
            let commands = segments
                .iter()
                .flat_map(|segment| self.segment_commands(&src, &dest_dir, segment))
                .collect();
            queues.push(CommandQueue {
                instruction: index,
                label: format!("split {}", src.display()),
                commands,
            });
        }
        queues
    }

    fn segment_commands(&mut self, src: &Path, dest_dir: &Path, segment: &Segment) -> Vec<MediaCommand> {
        let split_dest = match (&segment.filename, &segment.reference) {
            (Some(name), _) => dest_dir.join(name),
            (None, Some(reference)) => {
                let ext = source_extension(src);
                self.workspace.file(&with_extension(reference, &ext))
            }
            (None, None) => dest_dir.join(format!("{}.{}", stem(src), segment.index)),
        };
        if segment.filename.is_some() {
            self.produced.insert(split_dest.clone());
        }

        let mut commands = vec![self
            .tools
            .split(src, segment.start, segment.duration, &split_dest)];

        if let Some(ref reference) = segment.reference {
            let ts = self.workspace.intermediate(reference);
            commands.push(self.tools.intermediate(&split_dest, &ts));
            self.register(reference, ts);
        }
        commands
    }

    fn register(&mut self, name: &str, path: PathBuf) {
        self.intermediates.retain(|(n, _)| n != name);
        self.intermediates.push((name.to_string(), path));
    }

    fn plan_join(&mut self, index: usize, join: &JoinEdit) -> Result<CommandQueue, String> {
        let mut commands = Vec::new();
        let mut inputs: Vec<(String, PathBuf)> = Vec::new();

        if join.src.is_empty() {
            if self.intermediates.is_empty() {
                return Err("nothing to join: no intermediates were produced".to_string());
            }
            inputs = self.intermediates.clone();
        }

        for (k, name) in join.src.iter().enumerate() {
            if let Some((_, path)) = self.intermediates.iter().find(|(n, _)| n == name) {
                inputs.push((name.clone(), path.clone()));
                continue;
            }

            if let Some(shared) = self.config.shared.get(name) {
                let ts = self.workspace.intermediate(&format!("shared {}", name));
                if self.shared_converted.insert(name.clone()) {
                    let src = resolve_under(&self.roots.src_root, shared);
                    commands.push(self.tools.intermediate(&src, &ts));
                }
                inputs.push((name.clone(), ts));
                continue;
            }

            let path = resolve_under(&self.roots.src_root, Path::new(name));
            if path.is_file() || self.produced.contains(&path) {
                let ts = self
                    .workspace
                    .intermediate(&format!("join {} {} {}", index + 1, k + 1, stem(&path)));
                commands.push(self.tools.intermediate(&path, &ts));
                inputs.push((stem(&path), ts));
                continue;
            }

            return Err(format!("unknown join source '{}'", name));
        }

        let repeat_type = join.repeat_type.unwrap_or(self.config.editor.repeat_type);
        let ordered = repeat_sources(&inputs, join.repeat.unwrap_or(1), repeat_type);

        let filename = match join.filename {
            Some(ref name) => with_extension(name, "mp4"),
            None => {
                let (last, _) = ordered.last().ok_or("nothing to join")?;
                with_extension(last, "mp4")
            }
        };
        let dest = resolve_dest(&self.roots.dest, join.dest.as_deref()).join(filename);
        let paths: Vec<PathBuf> = ordered.into_iter().map(|(_, p)| p).collect();
        commands.push(self.tools.join(&paths, &dest));
        self.produced.insert(dest.clone());

        Ok(CommandQueue {
            instruction: index,
            label: format!("join {}", dest.display()),
            commands,
        })
    }

    fn plan_each<F>(
        &mut self,
        index: usize,
        cmd: &'static str,
        media: &MediaEdit,
        ext: &str,
        build: F,
    ) -> Vec<CommandQueue>
    where
        F: Fn(&Toolbox, &Path, &Path) -> MediaCommand,
    {
        let dest_dir = resolve_dest(&self.roots.dest, media.dest.as_deref());
        expand_sources(&media.src, &self.roots.src_root)
            .into_iter()
            .map(|src| {
                let dest = dest_dir.join(format!("{}.{}", stem(&src), ext));
                self.produced.insert(dest.clone());
                CommandQueue {
                    instruction: index,
                    label: format!("{} {}", cmd, src.display()),
                    commands: vec![build(&self.tools, &src, &dest)],
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, Section};
    use mandolin_av::{ProcessOutput, Timecode};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    /// Answers every probe with a fixed duration.
    struct FixedDuration(&'static str);

    impl ProcessRunner for FixedDuration {
        fn run(&self, _command: &MediaCommand) -> mandolin_av::Result<ProcessOutput> {
            Ok(ProcessOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: format!("  Duration: {}, start: 0.000000", self.0),
            })
        }
    }

    struct Fixture {
        _src: TempDir,
        _dest: TempDir,
        config: Config,
        roots: Roots,
        workspace: Workspace,
    }

    fn fixture(extra: &str) -> Fixture {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        fs::write(src.path().join("talk.mp4"), b"x").unwrap();
        fs::write(src.path().join("intro.mp4"), b"x").unwrap();
        let text = format!(
            "src_root = {:?}\ndest = {:?}\n{}",
            src.path().display().to_string(),
            dest.path().display().to_string(),
            extra
        );
        let config = parse_config(&text).unwrap();
        let roots = config.roots().unwrap();
        Fixture {
            _src: src,
            _dest: dest,
            config,
            roots,
            workspace: Workspace::temporary().unwrap(),
        }
    }

    fn plan_all(f: &Fixture, runner: &dyn ProcessRunner) -> (Vec<CommandQueue>, Vec<EditFailure>) {
        let mut sequencer = Sequencer::new(&f.config, &f.roots, &f.workspace);
        let mut failures = Vec::new();
        let mut queues = Vec::new();
        for (i, edit) in f.config.edits.iter().enumerate() {
            queues.extend(sequencer.plan(i, edit, runner, &mut failures));
        }
        (queues, failures)
    }

    #[test]
    fn test_generated_split_commands() {
        let f = fixture("[[edits]]\ncmd = \"split\"\nsrc = \"talk.mp4\"\nduration = \"00:00:40\"\n");
        let (queues, failures) = plan_all(&f, &FixedDuration("00:01:40.00"));
        assert!(failures.is_empty());
        assert_eq!(queues.len(), 1);

        let commands = &queues[0].commands;
        assert_eq!(commands.len(), 3);
        let last = commands[2].args();
        assert!(!last.contains(&"-t".to_string()));
        assert_eq!(last[2], "00:01:06.667");
        assert_eq!(
            PathBuf::from(last.last().unwrap()),
            f.roots.dest.join("talk # 3.mp4")
        );
    }

    #[test]
    fn test_split_refs_feed_a_join() {
        let f = fixture(
            r#"
[shared]
intro = "intro.mp4"

[[edits]]
cmd = "split"
src = "talk.mp4"
segments = 2
ref = "talk"

[[edits]]
cmd = "join"
src = ["intro", "talk 2", "intro"]
filename = "highlights"
"#,
        );
        let (queues, failures) = plan_all(&f, &FixedDuration("00:00:10.00"));
        assert!(failures.is_empty(), "{:?}", failures);
        assert_eq!(queues.len(), 2);

        // split to a scratch file, then to a transport stream
        assert_eq!(queues[0].commands.len(), 4);
        assert!(queues[0].commands[1].args().contains(&"mpegts".to_string()));

        let join = &queues[1].commands;
        // shared intro converted once, then the concat
        assert_eq!(join.len(), 2);
        let concat = join[1].args().iter().find(|a| a.starts_with("concat:")).unwrap();
        assert_eq!(concat.matches("shared intro.ts").count(), 2);
        assert!(concat.contains("talk 2.ts"));
        assert_eq!(
            PathBuf::from(join[1].args().last().unwrap()),
            f.roots.dest.join("highlights.mp4")
        );
    }

    #[test]
    fn test_empty_join_takes_every_intermediate() {
        let f = fixture(
            "[[edits]]\ncmd = \"split\"\nsrc = \"talk.mp4\"\nsegments = 3\nref = \"t\"\n\n[[edits]]\ncmd = \"join\"\nrepeat = 2\nrepeat_type = \"whole\"\n",
        );
        let (queues, failures) = plan_all(&f, &FixedDuration("00:00:30.00"));
        assert!(failures.is_empty());
        let concat = queues[1].commands[0]
            .args()
            .iter()
            .find(|a| a.starts_with("concat:"))
            .unwrap()
            .clone();
        assert_eq!(concat.split('|').count(), 6);
        assert!(queues[1].label.ends_with("t 3.mp4"));
    }

    #[test]
    fn test_missing_join_reference_fails_only_that_edit() {
        let f = fixture(
            "[[edits]]\ncmd = \"join\"\nsrc = [\"nope\"]\n\n[[edits]]\ncmd = \"mp3\"\nsrc = \"talk.mp4\"\n",
        );
        let (queues, failures) = plan_all(&f, &FixedDuration("00:00:30.00"));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].instruction, 0);
        assert!(failures[0].reason.contains("nope"));
        assert_eq!(queues.len(), 1);
        assert_eq!(
            PathBuf::from(queues[0].commands[0].args().last().unwrap()),
            f.roots.dest.join("talk.mp3")
        );
    }

    #[test]
    fn test_unreadable_duration_abandons_source() {
        struct Silent;
        impl ProcessRunner for Silent {
            fn run(&self, _c: &MediaCommand) -> mandolin_av::Result<ProcessOutput> {
                Ok(ProcessOutput::default())
            }
        }
        let f = fixture("[[edits]]\ncmd = \"split\"\nsrc = \"talk.mp4\"\nsegments = 2\n");
        let (queues, failures) = plan_all(&f, &Silent);
        assert!(queues.is_empty());
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn test_sections_need_no_probe() {
        let mut f = fixture("");
        f.config.edits.push(EditInstruction::Split(SplitEdit {
            src: "talk.mp4".into(),
            sections: vec![
                Section {
                    start: Some(Timecode::from_millis(1_000)),
                    duration: Some(Timecode::from_millis(2_000)),
                    filename: Some("opening".to_string()),
                    ..Default::default()
                },
                Section::default(),
            ],
            ..Default::default()
        }));

        struct Unreachable;
        impl ProcessRunner for Unreachable {
            fn run(&self, c: &MediaCommand) -> mandolin_av::Result<ProcessOutput> {
                panic!("unexpected command {}", c);
            }
        }
        let (queues, failures) = plan_all(&f, &Unreachable);
        assert!(failures.is_empty());
        let commands = &queues[0].commands;
        assert_eq!(
            PathBuf::from(commands[0].args().last().unwrap()),
            f.roots.dest.join("opening.mp4")
        );
        assert_eq!(commands[1].args()[2], "00:00:03.000");
    }

    #[test]
    fn test_convert_and_extract_names() {
        let f = fixture(
            "[[edits]]\ncmd = \"convert\"\nsrc = \"talk.mp4\"\ndest = \"encoded\"\n\n[[edits]]\ncmd = \"extract\"\nsrc = \"talk.mp4\"\n",
        );
        let (queues, _) = plan_all(&f, &FixedDuration("00:00:30.00"));
        assert_eq!(queues[0].commands[0].tool_name(), "HandBrakeCLI");
        assert_eq!(
            PathBuf::from(queues[0].commands[0].args().last().unwrap()),
            f.roots.dest.join("encoded/talk.mp4")
        );
        assert_eq!(
            PathBuf::from(queues[1].commands[0].args().last().unwrap()),
            f.roots.dest.join("talk.m4a")
        );
    }
}
