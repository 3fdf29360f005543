//! External command descriptors and the builders for every media operation.

use crate::timecode::format_timecode;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An external process invocation.
///
/// Built once by a [`Toolbox`] and never rewritten afterwards; the runner
/// executes it exactly as described.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaCommand {
    program: String,
    args: Vec<String>,
}

impl MediaCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Short name of the program, used in error messages.
    pub fn tool_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.clone())
    }
}

impl fmt::Display for MediaCommand {
    /// Renders a copy-pasteable shell command line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

fn path_arg(p: &Path) -> String {
    p.to_string_lossy().to_string()
}

/// Default HandBrake preset used when re-encoding to mp4.
pub const DEFAULT_HANDBRAKE_PRESET: &str = "Fast 1080p30";

/// Default mp3 bitrate.
pub const DEFAULT_MP3_BITRATE: &str = "320k";

/// Builds [`MediaCommand`]s for the configured tool executables.
///
/// # Example
///
/// ```
/// use mandolin_av::Toolbox;
/// use std::path::Path;
/// use std::time::Duration;
///
/// let tools = Toolbox::default();
/// let cmd = tools.split(
///     Path::new("/in/movie.mp4"),
///     Duration::from_secs(60),
///     Some(Duration::from_secs(30)),
///     Path::new("/out/part.mp4"),
/// );
/// assert_eq!(
///     cmd.to_string(),
///     "ffmpeg -y -ss 00:01:00.000 -i /in/movie.mp4 -vcodec copy -acodec copy -sn -t 00:00:30.000 /out/part.mp4"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Toolbox {
    ffmpeg: PathBuf,
    handbrake: PathBuf,
    handbrake_preset: String,
    mp3_bitrate: String,
}

impl Default for Toolbox {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            handbrake: PathBuf::from("HandBrakeCLI"),
            handbrake_preset: DEFAULT_HANDBRAKE_PRESET.to_string(),
            mp3_bitrate: DEFAULT_MP3_BITRATE.to_string(),
        }
    }
}

impl Toolbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ffmpeg(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg = path.into();
        self
    }

    pub fn with_handbrake(mut self, path: impl Into<PathBuf>) -> Self {
        self.handbrake = path.into();
        self
    }

    pub fn with_handbrake_preset(mut self, preset: impl Into<String>) -> Self {
        self.handbrake_preset = preset.into();
        self
    }

    pub fn with_mp3_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.mp3_bitrate = bitrate.into();
        self
    }

    fn ffmpeg(&self, args: Vec<String>) -> MediaCommand {
        MediaCommand::new(path_arg(&self.ffmpeg), args)
    }

    /// Lossless cut of `[start, start + duration)`, or to the end of the
    /// source when `duration` is `None`. Subtitles are dropped.
    pub fn split(
        &self,
        src: &Path,
        start: Duration,
        duration: Option<Duration>,
        dest: &Path,
    ) -> MediaCommand {
        let mut args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            format_timecode(start),
            "-i".to_string(),
            path_arg(src),
            "-vcodec".to_string(),
            "copy".to_string(),
            "-acodec".to_string(),
            "copy".to_string(),
            "-sn".to_string(),
        ];
        if let Some(d) = duration {
            args.push("-t".to_string());
            args.push(format_timecode(d));
        }
        args.push(path_arg(dest));
        self.ffmpeg(args)
    }

    /// Remux into an MPEG transport stream that can later be concatenated
    /// without re-encoding.
    pub fn intermediate(&self, src: &Path, dest: &Path) -> MediaCommand {
        self.ffmpeg(vec![
            "-y".to_string(),
            "-i".to_string(),
            path_arg(src),
            "-c".to_string(),
            "copy".to_string(),
            "-bsf:v".to_string(),
            "h264_mp4toannexb".to_string(),
            "-f".to_string(),
            "mpegts".to_string(),
            path_arg(dest),
        ])
    }

    /// Concatenate transport-stream intermediates in order.
    pub fn join(&self, sources: &[PathBuf], dest: &Path) -> MediaCommand {
        let concat = sources
            .iter()
            .map(|p| path_arg(p))
            .collect::<Vec<_>>()
            .join("|");
        self.ffmpeg(vec![
            "-y".to_string(),
            "-i".to_string(),
            format!("concat:{}", concat),
            "-c".to_string(),
            "copy".to_string(),
            "-bsf:a".to_string(),
            "aac_adtstoasc".to_string(),
            path_arg(dest),
        ])
    }

    /// Re-encode to mp4 with HandBrake.
    pub fn mp4(&self, src: &Path, dest: &Path) -> MediaCommand {
        MediaCommand::new(
            path_arg(&self.handbrake),
            vec![
                "-Z".to_string(),
                self.handbrake_preset.clone(),
                "-i".to_string(),
                path_arg(src),
                "-o".to_string(),
                path_arg(dest),
            ],
        )
    }

    /// Transcode the audio to mp3.
    pub fn mp3(&self, src: &Path, dest: &Path) -> MediaCommand {
        self.ffmpeg(vec![
            "-i".to_string(),
            path_arg(src),
            "-y".to_string(),
            "-c:a".to_string(),
            "libmp3lame".to_string(),
            "-b:a".to_string(),
            self.mp3_bitrate.clone(),
            path_arg(dest),
        ])
    }

    /// Copy the audio stream out without re-encoding.
    pub fn extract_audio(&self, src: &Path, dest: &Path) -> MediaCommand {
        self.ffmpeg(vec![
            "-y".to_string(),
            "-i".to_string(),
            path_arg(src),
            "-vn".to_string(),
            "-acodec".to_string(),
            "copy".to_string(),
            path_arg(dest),
        ])
    }

    /// `ffmpeg -i <src>` with no output: ffmpeg prints the container
    /// header, including `Duration:`, to stderr and exits non-zero.
    pub fn duration(&self, src: &Path) -> MediaCommand {
        self.ffmpeg(vec!["-i".to_string(), path_arg(src)])
    }
}
