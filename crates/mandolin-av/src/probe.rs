//! Total duration of a media file, read from ffmpeg's diagnostic output.

use crate::runner::ProcessRunner;
use crate::timecode::parse_fraction;
use crate::{Error, Result, Toolbox};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Duration: (\d+):(\d{2}):(\d{2})\.(\d{1,3})").unwrap());

/// Extract the `Duration: HH:MM:SS.mmm` header from ffmpeg output.
///
/// The fraction is decimal, so ffmpeg's usual two digits are centiseconds.
///
/// ```
/// use mandolin_av::probe::parse_duration;
/// use std::time::Duration;
///
/// let stderr = "  Duration: 00:01:40.04, start: 0.000000, bitrate: 1205 kb/s";
/// assert_eq!(parse_duration(stderr), Some(Duration::from_millis(100_040)));
/// assert_eq!(parse_duration("Duration: N/A"), None);
/// ```
pub fn parse_duration(output: &str) -> Option<Duration> {
    let caps = DURATION_RE.captures(output)?;
    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: u64 = caps[3].parse().ok()?;
    let nanos = parse_fraction(&caps[4])?;
    Some(Duration::new(hours * 3600 + minutes * 60 + seconds, nanos))
}

/// Probe the total duration of `src` by running `ffmpeg -i`.
///
/// # Errors
///
/// Returns [`Error::FileNotFound`] if `src` does not exist, the runner's
/// error if ffmpeg cannot be started, and [`Error::ParseError`] when the
/// output carries no duration.
pub fn probe_duration<R: ProcessRunner + ?Sized>(
    runner: &R,
    tools: &Toolbox,
    src: &Path,
) -> Result<Duration> {
    if !src.exists() {
        return Err(Error::file_not_found(src));
    }

    let command = tools.duration(src);
    let output = runner.run(&command)?;

    // ffmpeg reports on stderr, but accept stdout for wrappers that redirect
    parse_duration(&output.stderr)
        .or_else(|| parse_duration(&output.stdout))
        .ok_or_else(|| {
            Error::parse_error(
                command.tool_name(),
                format!("no duration found for {}", src.display()),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ProcessOutput;
    use crate::MediaCommand;
    use tempfile::NamedTempFile;

    struct Canned(&'static str);

    impl ProcessRunner for Canned {
        fn run(&self, _command: &MediaCommand) -> Result<ProcessOutput> {
            Ok(ProcessOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: self.0.to_string(),
            })
        }
    }

    #[test]
    fn test_parse_duration_variants() {
        assert_eq!(
            parse_duration("Duration: 01:02:03.5"),
            Some(Duration::from_millis(3_723_500))
        );
        assert_eq!(
            parse_duration("Duration: 00:00:01.250,"),
            Some(Duration::from_millis(1_250))
        );
        assert_eq!(parse_duration("no header here"), None);
    }

    #[test]
    fn test_probe_reads_stderr_despite_exit_code() {
        let file = NamedTempFile::new().unwrap();
        let runner = Canned(
            "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'a.mp4':\n  Duration: 00:00:01.00, start: 0.000000\nAt least one output file must be specified\n",
        );
        let d = probe_duration(&runner, &Toolbox::default(), file.path()).unwrap();
        assert_eq!(d, Duration::from_secs(1));
    }

    #[test]
    fn test_probe_unparsable_output() {
        let file = NamedTempFile::new().unwrap();
        let runner = Canned("Invalid data found when processing input");
        let result = probe_duration(&runner, &Toolbox::default(), file.path());
        assert!(matches!(result, Err(Error::ParseError { .. })));
    }

    #[test]
    fn test_probe_missing_file() {
        let result = probe_duration(&Canned(""), &Toolbox::default(), Path::new("/no/such/file.mp4"));
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }
}
