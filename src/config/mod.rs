pub mod persist;
mod types;

pub use types::*;

use anyhow::{Context, Result};
use mandolin_av::{StderrClassifier, Toolbox};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Locations tried, in order, when no config path is given.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "./mandolin.toml",
    "./config.toml",
    "~/.config/mandolin/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = parse_config(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Parse and validate configuration text
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// First default location that exists
pub fn find_default_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_PATHS.iter().find_map(|path_str| {
        let path = PathBuf::from(shellexpand::tilde(path_str).as_ref());
        path.exists().then_some(path)
    })
}

/// Resolve the config file a run reads and later writes back
pub fn resolve_config_path(custom_path: Option<&Path>) -> Option<PathBuf> {
    custom_path.map(Path::to_path_buf).or_else(find_default_config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    match find_default_config() {
        Some(path) => load_config(&path),
        None => Ok(Config::default()),
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.extension.is_empty() {
        anyhow::bail!("extension cannot be empty");
    }

    for (i, instruction) in config.instructions.iter().enumerate() {
        if instruction.src.is_empty() {
            anyhow::bail!("Instruction {} has no src", i + 1);
        }
        if instruction.how_many == 0 {
            anyhow::bail!("Instruction '{}' has how_many = 0", instruction.label());
        }
        if instruction.spread == Some(0) {
            anyhow::bail!("Instruction '{}' has spread = 0", instruction.label());
        }
        if let Some(ref pattern) = instruction.ignore {
            Regex::new(pattern).with_context(|| {
                format!("Instruction '{}' has an invalid ignore pattern", instruction.label())
            })?;
        }
        if matches!(instruction.match_up_to.as_deref(), Some("")) {
            anyhow::bail!("Instruction '{}' has an empty match_up_to", instruction.label());
        }
    }

    for (i, edit) in config.edits.iter().enumerate() {
        match edit {
            EditInstruction::Split(split) => {
                if split.src.is_empty() {
                    anyhow::bail!("Split edit {} has no src", i + 1);
                }
                if split.sections.is_empty() && !split.is_generator() {
                    anyhow::bail!(
                        "Split edit {} needs either sections or a duration/segments generator",
                        i + 1
                    );
                }
                if split.segments == Some(0) {
                    anyhow::bail!("Split edit {} has segments = 0", i + 1);
                }
                if split.segments.is_none() && split.duration.is_some_and(|d| d.as_millis() == 0)
                {
                    anyhow::bail!("Split edit {} has a zero segment duration", i + 1);
                }
            }
            EditInstruction::Join(join) => {
                if join.repeat == Some(0) {
                    anyhow::bail!("Join edit {} has repeat = 0", i + 1);
                }
            }
            EditInstruction::Convert(media)
            | EditInstruction::Extract(media)
            | EditInstruction::Mp3(media) => {
                if media.src.is_empty() {
                    anyhow::bail!("{} edit {} has no src", edit.name(), i + 1);
                }
            }
            EditInstruction::Unknown => {
                tracing::warn!("Edit {} has an unknown cmd and will be skipped", i + 1);
            }
        }
    }

    // Compile now so a bad pattern fails at load rather than mid-run
    config.classifier()?;

    if let Some(ref root) = config.src_root {
        if !root.exists() {
            tracing::warn!("src_root does not exist: {:?}", root);
        }
    }

    Ok(())
}

/// Paths every run needs before doing any work.
#[derive(Debug, Clone)]
pub struct Roots {
    pub src_root: PathBuf,
    pub dest: PathBuf,
}

impl Config {
    /// `src_root` and `dest`, tilde-expanded; missing either is fatal.
    pub fn roots(&self) -> Result<Roots> {
        let src_root = self
            .src_root
            .as_deref()
            .context("src_root is not set in the config")?;
        let dest = self.dest.as_deref().context("dest is not set in the config")?;
        Ok(Roots {
            src_root: expand_path(src_root),
            dest: expand_path(dest),
        })
    }

    /// Command builder for the configured executables and encoder settings.
    pub fn toolbox(&self) -> Toolbox {
        let mut tools = Toolbox::new()
            .with_handbrake_preset(self.editor.handbrake_preset.clone())
            .with_mp3_bitrate(self.editor.mp3_bitrate.clone());
        if let Some(ref ffmpeg) = self.tools.ffmpeg_path {
            tools = tools.with_ffmpeg(expand_path(ffmpeg));
        }
        if let Some(ref handbrake) = self.tools.handbrake_path {
            tools = tools.with_handbrake(expand_path(handbrake));
        }
        tools
    }

    /// Stderr classifier, with the built-in patterns unless overridden.
    pub fn classifier(&self) -> Result<StderrClassifier> {
        let editor = &self.editor;
        if editor.noise_patterns.is_none() && editor.fatal_patterns.is_none() {
            return Ok(StderrClassifier::default());
        }

        let noise: Vec<String> = match editor.noise_patterns {
            Some(ref patterns) => patterns.clone(),
            None => to_owned(mandolin_av::runner::DEFAULT_NOISE_PATTERNS),
        };
        let fatal: Vec<String> = match editor.fatal_patterns {
            Some(ref patterns) => patterns.clone(),
            None => to_owned(mandolin_av::runner::DEFAULT_FATAL_PATTERNS),
        };

        StderrClassifier::new(noise, fatal).context("Invalid stderr pattern in [editor]")
    }
}

fn to_owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

/// Expand a leading `~` in a configured path.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}
