use mandolin_av::{Timecode, DEFAULT_HANDBRAKE_PRESET, DEFAULT_MP3_BITRATE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Root every relative source is resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_root: Option<PathBuf>,

    /// Default destination folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<PathBuf>,

    #[serde(default = "default_extension")]
    pub extension: String,

    /// Overlap subtracted from every chained split start.
    #[serde(default)]
    pub backtrack: Timecode,

    #[serde(default)]
    pub remove_initial_digits: bool,

    #[serde(default)]
    pub prepend_with_digits: bool,

    #[serde(default)]
    pub instructions: Vec<Instruction>,

    #[serde(default)]
    pub edits: Vec<EditInstruction>,

    /// Named sources that joins can refer to; converted once per run.
    #[serde(default)]
    pub shared: BTreeMap<String, PathBuf>,

    #[serde(default)]
    pub editor: EditorConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_extension() -> String {
    "mp4".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_root: None,
            dest: None,
            extension: default_extension(),
            backtrack: Timecode::ZERO,
            remove_initial_digits: false,
            prepend_with_digits: false,
            instructions: Vec::new(),
            edits: Vec::new(),
            shared: BTreeMap::new(),
            editor: EditorConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// One or more source paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SourceSpec {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl Default for SourceSpec {
    fn default() -> Self {
        SourceSpec::Many(Vec::new())
    }
}

impl SourceSpec {
    pub fn entries(&self) -> Vec<&Path> {
        match self {
            SourceSpec::One(p) => vec![p.as_path()],
            SourceSpec::Many(ps) => ps.iter().map(PathBuf::as_path).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SourceSpec::One(p) => p.as_os_str().is_empty(),
            SourceSpec::Many(ps) => ps.is_empty(),
        }
    }
}

impl From<&str> for SourceSpec {
    fn from(s: &str) -> Self {
        SourceSpec::One(PathBuf::from(s))
    }
}

/// `breadth = true` or `breadth = <batch size>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Breadth {
    Flag(bool),
    Batch(usize),
}

impl Breadth {
    /// Files taken from each folder per round, `None` when disabled.
    pub fn batch_size(self) -> Option<usize> {
        match self {
            Breadth::Flag(true) => Some(1),
            Breadth::Flag(false) | Breadth::Batch(0) => None,
            Breadth::Batch(n) => Some(n),
        }
    }
}

/// A rotation rule for one source directory or file list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Instruction {
    pub src: SourceSpec,

    /// Relative to the global `dest` unless absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// Regex; matching absolute paths are left out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub random: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub reverse: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadth: Option<Breadth>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub one_level_wide: bool,

    /// Delimiter ending the shared prefix of sibling files ("Part 1", "Part 2").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_up_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_to_when_done: Option<PathBuf>,

    #[serde(default = "default_how_many", skip_serializing_if = "is_one")]
    pub how_many: usize,

    /// Spread picks evenly over the units; overrides `how_many`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_initial_digits: Option<bool>,

    /// Most recently delivered file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<PathBuf>,

    /// One-shot override for the file after `last`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<String>,

    /// `0` keeps no history at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_history_length: Option<usize>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
}

fn default_how_many() -> usize {
    1
}

fn is_one(n: &usize) -> bool {
    *n == 1
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Default for Instruction {
    fn default() -> Self {
        Self {
            src: SourceSpec::default(),
            dest: None,
            extension: None,
            ignore: None,
            random: false,
            reverse: false,
            breadth: None,
            one_level_wide: false,
            match_up_to: None,
            move_to_when_done: None,
            how_many: default_how_many(),
            spread: None,
            remove_initial_digits: None,
            last: None,
            next: None,
            history: Vec::new(),
            max_history_length: None,
            disabled: false,
        }
    }
}

impl Instruction {
    pub fn new(src: impl Into<PathBuf>) -> Self {
        Self {
            src: SourceSpec::One(src.into()),
            ..Default::default()
        }
    }

    /// Number of units to pick per run.
    pub fn count(&self) -> usize {
        self.spread.unwrap_or(self.how_many)
    }

    pub fn extension_or<'a>(&'a self, global: &'a str) -> &'a str {
        self.extension.as_deref().unwrap_or(global)
    }

    pub fn breadth_batch(&self) -> Option<usize> {
        self.breadth.and_then(Breadth::batch_size)
    }

    /// Short human label for logs.
    pub fn label(&self) -> String {
        self.src
            .entries()
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// How a join's `repeat` count duplicates its sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatType {
    /// `a a b b`
    #[default]
    Each,
    /// `a b a b`
    Whole,
}

/// One editing step, tagged by `cmd`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum EditInstruction {
    Split(SplitEdit),
    Join(JoinEdit),
    Convert(MediaEdit),
    Extract(MediaEdit),
    Mp3(MediaEdit),
    #[serde(other)]
    Unknown,
}

impl EditInstruction {
    pub fn name(&self) -> &'static str {
        match self {
            EditInstruction::Split(_) => "split",
            EditInstruction::Join(_) => "join",
            EditInstruction::Convert(_) => "convert",
            EditInstruction::Extract(_) => "extract",
            EditInstruction::Mp3(_) => "mp3",
            EditInstruction::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SplitEdit {
    pub src: SourceSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<PathBuf>,

    /// Explicit cut list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,

    /// Generator: maximum segment length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Timecode>,

    /// Generator: number of segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtrack: Option<Timecode>,

    /// Name template for generated segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Register the segments as intermediates named `"<ref> <i>"`.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl SplitEdit {
    pub fn is_generator(&self) -> bool {
        self.duration.is_some() || self.segments.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Timecode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Timecode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Timecode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Register this section as an intermediate under exactly this name.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct JoinEdit {
    /// Intermediate refs, `shared` keys or paths. Empty joins every
    /// intermediate produced so far.
    #[serde(default)]
    pub src: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<usize>,

    /// Overrides `[editor] repeat_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_type: Option<RepeatType>,
}

/// `convert`, `extract` and `mp3` only need sources and a destination.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MediaEdit {
    pub src: SourceSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditorConfig {
    /// Where intermediates go; a temporary directory when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    #[serde(default)]
    pub repeat_type: RepeatType,

    #[serde(default = "default_handbrake_preset")]
    pub handbrake_preset: String,

    #[serde(default = "default_mp3_bitrate")]
    pub mp3_bitrate: String,

    #[serde(default = "default_audio_extension")]
    pub audio_extension: String,

    /// Replaces the built-in fatal stderr patterns.
    #[serde(default)]
    pub fatal_patterns: Option<Vec<String>>,

    /// Replaces the built-in noise stderr patterns.
    #[serde(default)]
    pub noise_patterns: Option<Vec<String>>,
}

fn default_handbrake_preset() -> String {
    DEFAULT_HANDBRAKE_PRESET.to_string()
}

fn default_mp3_bitrate() -> String {
    DEFAULT_MP3_BITRATE.to_string()
}

fn default_audio_extension() -> String {
    "m4a".to_string()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            repeat_type: RepeatType::default(),
            handbrake_preset: default_handbrake_preset(),
            mp3_bitrate: default_mp3_bitrate(),
            audio_extension: default_audio_extension(),
            fatal_patterns: None,
            noise_patterns: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub handbrake_path: Option<PathBuf>,
}
