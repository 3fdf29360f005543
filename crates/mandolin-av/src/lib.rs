//! # mandolin-av
//!
//! Media command building and execution for mandolin.
//!
//! This crate provides functionality for:
//! - Building ffmpeg and HandBrakeCLI invocations for lossless cuts,
//!   transport-stream intermediates, concatenation and audio work
//! - Running command queues sequentially and classifying stderr output
//! - Probing a file's total duration
//! - Naming generated files from `{basename}` style templates
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use mandolin_av::{probe_duration, SystemRunner, Toolbox};
//! use std::path::Path;
//!
//! let tools = Toolbox::default();
//! let total = probe_duration(&SystemRunner, &tools, Path::new("/films/long.mp4"))?;
//! println!("{}", mandolin_av::format_timecode(total));
//! # Ok::<(), mandolin_av::Error>(())
//! ```

mod command;
mod error;
pub mod probe;
pub mod runner;
pub mod template;
pub mod timecode;
pub mod tools;
pub mod workspace;

// Re-exports
pub use command::{MediaCommand, Toolbox, DEFAULT_HANDBRAKE_PRESET, DEFAULT_MP3_BITRATE};
pub use error::{Error, Result};
pub use probe::probe_duration;
pub use runner::{
    run_queue, FatalReason, ProcessOutput, ProcessRunner, QueueReport, StderrClassifier,
    SystemRunner,
};
pub use template::TemplateVars;
pub use timecode::{format_timecode, Timecode};
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, ToolInfo};
pub use workspace::Workspace;
