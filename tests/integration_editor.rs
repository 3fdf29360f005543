//! Editor integration tests
//!
//! Plans and runs edits against a scripted process runner.

use mandolin::config::{parse_config, Config};
use mandolin::editor::{self, EditOptions};
use mandolin_av::{MediaCommand, ProcessOutput, ProcessRunner};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Reports a fixed duration for probes and succeeds on everything else.
struct ScriptedRunner {
    duration: &'static str,
    fail_on: Option<&'static str>,
    calls: RefCell<Vec<MediaCommand>>,
}

impl ScriptedRunner {
    fn new(duration: &'static str) -> Self {
        Self {
            duration,
            fail_on: None,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, command: &MediaCommand) -> mandolin_av::Result<ProcessOutput> {
        self.calls.borrow_mut().push(command.clone());
        let args = command.args();

        if args.len() == 2 && args[0] == "-i" {
            return Ok(ProcessOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: format!(
                    "Input #0, mov,mp4\n  Duration: {}, start: 0.000000, bitrate: 900 kb/s\nAt least one output file must be specified",
                    self.duration
                ),
            });
        }

        let failing = self
            .fail_on
            .is_some_and(|needle| args.iter().any(|a| a.contains(needle)));
        Ok(ProcessOutput {
            code: Some(0),
            stdout: String::new(),
            stderr: if failing {
                "Error opening output file: Permission denied".to_string()
            } else {
                "size=    1024kB time=00:05:00.00 bitrate= 900kbits/s speed=80x".to_string()
            },
        })
    }
}

struct Fixture {
    root: TempDir,
}

impl Fixture {
    fn new(files: &[&str]) -> Self {
        let root = tempdir().unwrap();
        for dir in ["src", "dest", "scratch"] {
            fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        for file in files {
            fs::write(root.path().join("src").join(file), b"media").unwrap();
        }
        Self { root }
    }

    fn config(&self, edits: &str) -> Config {
        let text = format!(
            "src_root = {:?}\ndest = {:?}\n\n[editor]\ntemp_dir = {:?}\n\n{}",
            self.path("src").display().to_string(),
            self.path("dest").display().to_string(),
            self.path("scratch").display().to_string(),
            edits
        );
        parse_config(&text).unwrap()
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }
}

fn output_of(command: &MediaCommand) -> &str {
    command.args().last().map(String::as_str).unwrap_or("")
}

fn p(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn test_split_into_references_then_join_swapped() {
    let fixture = Fixture::new(&["talk.mp4"]);
    let config = fixture.config(
        r#"
[[edits]]
cmd = "split"
src = "talk.mp4"
segments = 2
ref = "part"

[[edits]]
cmd = "join"
src = ["part 2", "part 1"]
filename = "swapped"
"#,
    );
    let runner = ScriptedRunner::new("00:10:00.00");

    let outcome = editor::run(&config, &runner, &EditOptions::default()).unwrap();
    assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
    assert_eq!(outcome.planned.len(), 2);

    let scratch = fixture.path("scratch");
    let split = &outcome.planned[0].commands;
    assert_eq!(split.len(), 4);
    assert_eq!(output_of(&split[0]), p(&scratch.join("part 1.mp4")));
    assert_eq!(output_of(&split[1]), p(&scratch.join("part 1.ts")));
    assert_eq!(output_of(&split[3]), p(&scratch.join("part 2.ts")));
    assert!(split[0].args().contains(&"00:05:00.000".to_string()));
    assert!(!split[2].args().contains(&"-t".to_string()));

    let join = &outcome.planned[1].commands;
    assert_eq!(join.len(), 1);
    assert_eq!(
        join[0].args()[2],
        format!(
            "concat:{}|{}",
            p(&scratch.join("part 2.ts")),
            p(&scratch.join("part 1.ts"))
        )
    );
    assert_eq!(output_of(&join[0]), p(&fixture.path("dest").join("swapped.mp4")));

    assert_eq!(outcome.commands_executed.len(), 5);
    // one probe plus the five planned commands
    assert_eq!(runner.calls.borrow().len(), 6);
}

#[test]
fn test_named_sections_land_in_dest() {
    let fixture = Fixture::new(&["lecture.mkv"]);
    let config = fixture.config(
        r#"
[[edits]]
cmd = "split"
src = "lecture.mkv"
dest = "Clips"

[[edits.sections]]
start = "00:01:00"
end = "00:02:30"
filename = "intro"

[[edits.sections]]
duration = "00:00:45"
"#,
    );
    let runner = ScriptedRunner::new("01:00:00.00");

    let outcome = editor::run(&config, &runner, &EditOptions::default()).unwrap();
    assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);

    let commands = &outcome.planned[0].commands;
    assert_eq!(commands.len(), 2);
    let clips = fixture.path("dest").join("Clips");
    assert_eq!(output_of(&commands[0]), p(&clips.join("intro.mkv")));
    assert_eq!(output_of(&commands[1]), p(&clips.join("lecture # 2.mkv")));
    assert!(clips.is_dir());
    // sections never need a probe
    assert_eq!(runner.calls.borrow().len(), 2);
}

#[test]
fn test_shared_source_is_converted_once() {
    let fixture = Fixture::new(&["a.mp4", "b.mp4", "bumper.mp4"]);
    let mut config = fixture.config(
        r#"
[[edits]]
cmd = "join"
src = ["bumper", "a.mp4"]
filename = "first"

[[edits]]
cmd = "join"
src = ["bumper", "b.mp4"]
filename = "second"
"#,
    );
    config
        .shared
        .insert("bumper".to_string(), PathBuf::from("bumper.mp4"));
    let runner = ScriptedRunner::new("00:00:10.00");

    let outcome = editor::run(&config, &runner, &EditOptions { dry_run: true }).unwrap();
    assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
    let shared_ts = p(&fixture.path("scratch").join("shared bumper.ts"));

    let conversions: Vec<&MediaCommand> = outcome
        .planned
        .iter()
        .flat_map(|q| q.commands.iter())
        .filter(|c| output_of(c) == shared_ts)
        .collect();
    assert_eq!(conversions.len(), 1);
    assert_eq!(outcome.planned[0].commands.len(), 3);
    assert_eq!(outcome.planned[1].commands.len(), 2);
    assert!(runner.calls.borrow().is_empty());
}

#[test]
fn test_unknown_join_source_fails_only_that_edit() {
    let fixture = Fixture::new(&["a.mp4"]);
    let config = fixture.config(
        r#"
[[edits]]
cmd = "join"
src = ["nowhere"]

[[edits]]
cmd = "extract"
src = "a.mp4"
"#,
    );
    let runner = ScriptedRunner::new("00:00:10.00");

    let outcome = editor::run(&config, &runner, &EditOptions::default()).unwrap();
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].instruction, 0);
    assert!(outcome.failures[0].reason.contains("nowhere"));
    assert_eq!(outcome.commands_executed.len(), 1);
    assert_eq!(
        output_of(&outcome.commands_executed[0]),
        p(&fixture.path("dest").join("a.m4a"))
    );
}

#[test]
fn test_fatal_stderr_stops_the_queue() {
    let fixture = Fixture::new(&["talk.mp4"]);
    let config = fixture.config(
        r#"
[[edits]]
cmd = "split"
src = "talk.mp4"
segments = 3
"#,
    );
    let runner = ScriptedRunner {
        fail_on: Some("talk # 2"),
        ..ScriptedRunner::new("00:03:00.00")
    };

    let outcome = editor::run(&config, &runner, &EditOptions::default()).unwrap();
    assert_eq!(outcome.commands_executed.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].reason.contains("Permission denied"));
    assert!(outcome.failures[0].reason.contains("1 command(s) skipped"));
}

#[test]
fn test_stale_intermediates_are_cleared() {
    let fixture = Fixture::new(&["a.mp4"]);
    let stale = fixture.path("scratch").join("old.ts");
    fs::write(&stale, b"x").unwrap();
    let config = fixture.config("[[edits]]\ncmd = \"mp3\"\nsrc = \"a.mp4\"\n");

    editor::run(&config, &ScriptedRunner::new("00:00:01.00"), &EditOptions::default()).unwrap();
    assert!(!stale.exists());
}
