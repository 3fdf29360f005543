//! Mandolin - media rotation and lossless editing
//!
//! The collector copies the next files of every instruction into a
//! destination folder and remembers where each rotation stopped. The editor
//! turns split, join and conversion instructions into ffmpeg and HandBrake
//! command queues.

pub mod collector;
pub mod config;
pub mod editor;
pub mod paths;
