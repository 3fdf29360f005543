//! Sequential execution of external commands.
//!
//! Commands run strictly one at a time: a child is spawned, waited on, and
//! only then is the next command started. Whether a command failed is
//! decided from its exit status and from what it wrote to stderr, since
//! encoders write plenty of harmless progress noise there as well.

use crate::{Error, MediaCommand, Result};
use regex::RegexSet;
use serde::Serialize;
use std::process::{Command, Stdio};
use std::sync::LazyLock;

/// Captured result of one finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Something that can run a [`MediaCommand`] to completion.
pub trait ProcessRunner {
    /// Run the command and wait for it to exit.
    ///
    /// Only failures to start or wait on the process are errors; a non-zero
    /// exit is reported through [`ProcessOutput::code`].
    fn run(&self, command: &MediaCommand) -> Result<ProcessOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &MediaCommand) -> Result<ProcessOutput> {
        let output = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found(command.tool_name())
                } else {
                    Error::Io(e)
                }
            })?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Lines that encoders print during normal operation.
pub const DEFAULT_NOISE_PATTERNS: &[&str] = &[
    r"^Encoding: task \d+ of \d+",
    r"^\s*frame=\s*\d+",
    r"^\s*size=\s*\S+\s+time=",
    r"(?i)past duration .* too large",
    r"(?i)non-monotonous dts",
    r"(?i)deprecated pixel format",
];

/// Lines that mean the output is missing or broken.
pub const DEFAULT_FATAL_PATTERNS: &[&str] = &[
    r"(?i)conversion failed",
    r"(?i)no such file or directory",
    r"(?i)invalid data found when processing input",
    r"(?i)error opening (input|output)",
    r"(?i)unknown encoder",
    r"(?i)permission denied",
    r"(?i)could not write header",
    r"(?i)invalid argument",
];

/// What a single stderr line turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Noise,
    Fatal,
    Other,
}

/// Sorts stderr lines into harmless noise and fatal failure markers.
///
/// Noise wins over fatal: a progress line that happens to contain a fatal
/// word is still only progress.
#[derive(Debug, Clone)]
pub struct StderrClassifier {
    noise: RegexSet,
    fatal: RegexSet,
}

static DEFAULT_NOISE: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(DEFAULT_NOISE_PATTERNS).unwrap());
static DEFAULT_FATAL: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(DEFAULT_FATAL_PATTERNS).unwrap());

impl Default for StderrClassifier {
    fn default() -> Self {
        Self {
            noise: DEFAULT_NOISE.clone(),
            fatal: DEFAULT_FATAL.clone(),
        }
    }
}

impl StderrClassifier {
    /// Build a classifier from custom pattern lists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pattern`] if any pattern is not a valid regex.
    pub fn new<N, F>(noise: N, fatal: F) -> Result<Self>
    where
        N: IntoIterator,
        N::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        Ok(Self {
            noise: RegexSet::new(noise)?,
            fatal: RegexSet::new(fatal)?,
        })
    }

    pub fn classify_line(&self, line: &str) -> LineKind {
        if self.noise.is_match(line) {
            LineKind::Noise
        } else if self.fatal.is_match(line) {
            LineKind::Fatal
        } else {
            LineKind::Other
        }
    }

    /// First fatal line in `stderr`, if any. Carriage returns split lines
    /// too, since progress output rewrites a single terminal line.
    pub fn first_fatal<'a>(&self, stderr: &'a str) -> Option<&'a str> {
        stderr
            .split(['\n', '\r'])
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .find(|l| self.classify_line(l) == LineKind::Fatal)
    }
}

/// Why a command was considered fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FatalReason {
    /// The process could not be started.
    Spawn { message: String },
    /// stderr contained a fatal marker.
    Stderr { line: String },
    /// Exited unsuccessfully with no recognised marker.
    ExitStatus { code: Option<i32> },
}

impl std::fmt::Display for FatalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FatalReason::Spawn { message } => write!(f, "could not start: {}", message),
            FatalReason::Stderr { line } => write!(f, "{}", line),
            FatalReason::ExitStatus { code: Some(code) } => write!(f, "exited with status {}", code),
            FatalReason::ExitStatus { code: None } => write!(f, "terminated by signal"),
        }
    }
}

/// Decide whether a finished command failed.
pub fn verdict(classifier: &StderrClassifier, output: &ProcessOutput) -> Option<FatalReason> {
    if let Some(line) = classifier.first_fatal(&output.stderr) {
        return Some(FatalReason::Stderr {
            line: line.to_string(),
        });
    }
    if !output.success() {
        return Some(FatalReason::ExitStatus { code: output.code });
    }
    None
}

/// Result of running one queue of commands.
#[derive(Debug, Clone, Default)]
pub struct QueueReport {
    /// Commands that ran to completion without a fatal verdict.
    pub executed: Vec<MediaCommand>,
    /// The command that aborted the queue, and why.
    pub fatal: Option<(MediaCommand, FatalReason)>,
    /// Commands never started because of the fatal one.
    pub skipped: Vec<MediaCommand>,
}

impl QueueReport {
    pub fn is_success(&self) -> bool {
        self.fatal.is_none()
    }
}

/// Execute `commands` one after the other, stopping at the first fatal one.
pub fn run_queue<R: ProcessRunner + ?Sized>(
    runner: &R,
    classifier: &StderrClassifier,
    commands: &[MediaCommand],
) -> QueueReport {
    let mut report = QueueReport::default();

    for (i, command) in commands.iter().enumerate() {
        #[cfg(feature = "tracing")]
        tracing::info!("Running {}", command);

        let reason = match runner.run(command) {
            Ok(output) => {
                log_stdout(command, &output);
                verdict(classifier, &output)
            }
            Err(e) => Some(FatalReason::Spawn {
                message: e.to_string(),
            }),
        };

        match reason {
            None => report.executed.push(command.clone()),
            Some(reason) => {
                #[cfg(feature = "tracing")]
                tracing::error!("{} failed: {}", command.tool_name(), reason);
                report.fatal = Some((command.clone(), reason));
                report.skipped = commands[i + 1..].to_vec();
                break;
            }
        }
    }

    report
}

#[cfg(feature = "tracing")]
fn log_stdout(command: &MediaCommand, output: &ProcessOutput) {
    let stdout = output.stdout.trim();
    if !stdout.is_empty() {
        tracing::debug!("stdout from {}: {}", command.tool_name(), stdout);
    }
}

#[cfg(not(feature = "tracing"))]
fn log_stdout(_command: &MediaCommand, _output: &ProcessOutput) {}
